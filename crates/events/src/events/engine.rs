//! Compatibility engine events

use archfix_types::{CompatibilityVerdict, OperationKind, OperationState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    StateChanged {
        from: OperationState,
        to: OperationState,
    },

    StepStarted {
        operation: OperationKind,
        step: String,
    },

    VerdictComputed {
        bundle: String,
        verdict: CompatibilityVerdict,
    },

    /// Cancellation was signalled; the running step finishes first
    StopRequested { operation: OperationKind },
}
