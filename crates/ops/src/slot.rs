//! Single-flight guard for orchestrated operations

use archfix_errors::{Error, OpsError};
use archfix_events::{AppEvent, EngineEvent, EventEmitter, EventSender};
use archfix_types::{OperationKind, OperationState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct FlightState {
    current: OperationState,
    cancel: Option<CancellationToken>,
}

/// Process-wide operation state. At most one slot is held at a time.
#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    state: Mutex<FlightState>,
    tx: Option<EventSender>,
}

impl EventEmitter for SingleFlight {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl SingleFlight {
    pub(crate) fn new(tx: Option<EventSender>) -> Self {
        Self {
            state: Mutex::default(),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, state: &mut FlightState, to: OperationState) {
        let from = state.current;
        if from == to {
            return;
        }
        state.current = to;
        tracing::debug!(%from, %to, "operation state changed");
        self.emit(AppEvent::Engine(EngineEvent::StateChanged { from, to }));
    }

    pub(crate) fn current(&self) -> OperationState {
        self.lock().current
    }

    /// Claim the slot for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `OpsError::AlreadyRunning` if another operation holds it.
    pub(crate) fn acquire(self: &Arc<Self>, kind: OperationKind) -> Result<RunSlot, Error> {
        let mut state = self.lock();
        if let OperationState::Running(running) = state.current {
            return Err(OpsError::AlreadyRunning {
                operation: running.to_string(),
            }
            .into());
        }
        let token = CancellationToken::new();
        state.cancel = Some(token.clone());
        self.transition(&mut state, OperationState::Running(kind));
        Ok(RunSlot {
            flight: Arc::clone(self),
            token,
            released: false,
        })
    }

    /// Signal cancellation of the running operation, if any
    pub(crate) fn stop(&self) -> Option<OperationKind> {
        let state = self.lock();
        match (state.current, &state.cancel) {
            (OperationState::Running(kind), Some(token)) => {
                token.cancel();
                Some(kind)
            }
            _ => None,
        }
    }

    fn release(&self, outcome: OperationState) {
        let mut state = self.lock();
        state.cancel = None;
        self.transition(&mut state, outcome);
        if outcome == OperationState::Stopped {
            self.transition(&mut state, OperationState::Idle);
        }
    }
}

/// Held by the running operation; releasing (or dropping) frees the slot
pub(crate) struct RunSlot {
    flight: Arc<SingleFlight>,
    token: CancellationToken,
    released: bool,
}

impl RunSlot {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Record how the operation ended. `Stopped` settles to `Idle`.
    pub(crate) fn release(mut self, outcome: OperationState) {
        self.released = true;
        self.flight.release(outcome);
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        if !self.released {
            self.flight.release(OperationState::Idle);
        }
    }
}
