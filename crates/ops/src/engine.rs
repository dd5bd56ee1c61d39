//! Compatibility engine: orchestrates probe and repository under the
//! single-flight discipline

use archfix_errors::{Error, OpsError, UserFacingError};
use archfix_events::{AppEvent, EngineEvent, EventEmitter, EventSender, FailureContext};
use archfix_oplog::{EntryId, LogNode, OperationLog};
use archfix_repository::{BinaryRepository, BundleLocation};
use archfix_types::{
    Architecture, CompatibilityVerdict, LogStatus, OperationKind, OperationState,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::slot::SingleFlight;
use crate::types::{
    BackupStatus, BundleSelection, CompatibilityReport, ProcessStatus, RepairReport, StopResponse,
};

struct Inner {
    repository: BinaryRepository,
    log: OperationLog,
    flight: Arc<SingleFlight>,
    tx: Option<EventSender>,
}

impl EventEmitter for Inner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

/// Detects and repairs transcoder architecture mismatches.
///
/// Cloning yields another handle to the same engine; every handle shares the
/// one operation slot, so `stop` can be called from a different task than the
/// one awaiting an operation.
#[derive(Clone)]
pub struct CompatibilityEngine {
    inner: Arc<Inner>,
}

/// Per-operation handle given to the operation body
struct Run {
    inner: Arc<Inner>,
    kind: OperationKind,
    entry: EntryId,
    token: CancellationToken,
}

impl Run {
    fn repository(&self) -> &BinaryRepository {
        &self.inner.repository
    }

    /// Engine events carry the log entry id as their correlation id
    fn emit(&self, event: AppEvent) {
        self.inner.emit_correlated(event, self.entry.to_string());
    }

    /// Run one logged step. Nothing starts once a stop was requested.
    async fn step<T, Fut>(&self, label: &str, fut: Fut) -> Result<T, Error>
    where
        Fut: Future<Output = Result<T, Error>>,
    {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tracing::debug!(operation = %self.kind, step = label, "step started");
        self.emit(AppEvent::Engine(EngineEvent::StepStarted {
            operation: self.kind,
            step: label.to_string(),
        }));

        let result = fut.await;
        match &result {
            Ok(_) => {
                self.inner.log.child(self.entry, label, LogStatus::Complete);
            }
            Err(err) if err.is_cancelled() => {}
            Err(err) => {
                let label = format!("{label}: {}", err.user_message());
                self.inner.log.child(self.entry, &label, LogStatus::Error);
            }
        }
        result
    }

    fn note(&self, label: &str) {
        self.inner.log.child(self.entry, label, LogStatus::Complete);
    }

    /// Record a precondition failure under the operation entry
    fn fail(&self, err: Error) -> Error {
        self.inner
            .log
            .child(self.entry, &err.user_message(), LogStatus::Error);
        err
    }

    async fn locate(&self, path: &Path) -> Result<BundleLocation, Error> {
        self.step("Validating bundle path", self.repository().locate(path))
            .await
    }

    async fn host(&self) -> Result<Architecture, Error> {
        self.step("Detecting host architecture", async {
            let repository = self.repository();
            let ctx = repository.context();
            Ok(repository.platform().probe().host_architecture(ctx).await)
        })
        .await
    }

    /// Probe the transcoder and compare it with `host`
    async fn verdict(
        &self,
        bundle: &BundleLocation,
        host: Architecture,
    ) -> Result<CompatibilityReport, Error> {
        let binary = self
            .step(
                "Inspecting transcoder architecture",
                self.repository().current_architecture(bundle),
            )
            .await?;
        let verdict = CompatibilityVerdict::evaluate(host, binary);
        self.emit(AppEvent::Engine(EngineEvent::VerdictComputed {
            bundle: bundle.root.display().to_string(),
            verdict: verdict.clone(),
        }));

        let label = if verdict.is_compatible {
            format!("Compatible: transcoder {} runs on {host}", verdict.binary_architecture)
        } else {
            format!("Incompatible: transcoder {} on {host} host", verdict.binary_architecture)
        };
        self.note(&label);
        Ok(CompatibilityReport::new(bundle.root.clone(), verdict))
    }
}

async fn check_body(run: Run, path: PathBuf) -> Result<CompatibilityReport, Error> {
    let bundle = run.locate(&path).await?;
    let host = run.host().await?;
    run.verdict(&bundle, host).await
}

async fn fix_body(run: Run, path: PathBuf) -> Result<RepairReport, Error> {
    let bundle = run.locate(&path).await?;
    let host = run.host().await?;
    if !host.is_known() {
        return Err(run.fail(OpsError::UnknownHostArchitecture.into()));
    }

    let before = run.verdict(&bundle, host).await?;
    if before.is_compatible {
        return Err(run.fail(
            OpsError::AlreadyCompatible {
                host: host.to_string(),
            }
            .into(),
        ));
    }

    let backup = run
        .step(
            "Backing up original binaries",
            run.repository().backup(&bundle, &run.token),
        )
        .await?;
    if !backup.created {
        run.note("Existing backup kept");
    }

    let label = format!("Installing {host} binaries");
    let swap = run
        .step(&label, run.repository().replace(&bundle, host, &run.token))
        .await?;

    let after = run.verdict(&bundle, host).await?;
    Ok(RepairReport {
        message: format!(
            "Replaced {} file(s) with {host} binaries; transcoder is now {}",
            swap.files.len(),
            after.binary_architecture
        ),
        files: swap.files,
        backup_created: Some(backup.created),
        verdict: after,
    })
}

async fn restore_body(run: Run, path: PathBuf) -> Result<RepairReport, Error> {
    let bundle = run.locate(&path).await?;
    let swap = run
        .step(
            "Restoring original binaries",
            run.repository().restore(&bundle, &run.token),
        )
        .await?;
    let host = run.host().await?;
    let after = run.verdict(&bundle, host).await?;
    Ok(RepairReport {
        message: format!(
            "Restored {} file(s) from backup; transcoder is {}",
            swap.files.len(),
            after.binary_architecture
        ),
        files: swap.files,
        backup_created: None,
        verdict: after,
    })
}

async fn force_body(
    run: Run,
    path: PathBuf,
    arch: Option<Architecture>,
) -> Result<RepairReport, Error> {
    let bundle = run.locate(&path).await?;
    let host = run.host().await?;
    let target = match arch.or_else(|| host.opposite()) {
        Some(target) => target,
        None => return Err(run.fail(OpsError::UnknownHostArchitecture.into())),
    };

    let label = format!("Forcing {target} binaries (test)");
    let swap = run
        .step(
            &label,
            run.repository()
                .force_architecture(&bundle, target, &run.token),
        )
        .await?;
    let after = run.verdict(&bundle, host).await?;
    Ok(RepairReport {
        message: format!(
            "Forced {target} binaries into {} (test only); compatible: {}",
            bundle.root.display(),
            after.is_compatible
        ),
        files: swap.files,
        backup_created: None,
        verdict: after,
    })
}

impl CompatibilityEngine {
    /// Create an engine over `repository`, recording steps into `log`
    #[must_use]
    pub fn new(repository: BinaryRepository, log: OperationLog, tx: Option<EventSender>) -> Self {
        let repository = match &tx {
            Some(sender) => repository.with_event_sender(sender.clone()),
            None => repository,
        };
        Self {
            inner: Arc::new(Inner {
                repository,
                log,
                flight: Arc::new(SingleFlight::new(tx.clone())),
                tx,
            }),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &BinaryRepository {
        &self.inner.repository
    }

    #[must_use]
    pub fn log(&self) -> &OperationLog {
        &self.inner.log
    }

    /// Claim the slot, then drive `body` on a worker task.
    ///
    /// The slot, the log entry and the final state are all settled inside
    /// the task, so dropping the returned future never leaves the engine
    /// stuck in `Running`.
    async fn run<T, F, Fut>(&self, kind: OperationKind, body: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(Run) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let slot = match inner.flight.acquire(kind) {
            Ok(slot) => slot,
            Err(err) => {
                tracing::warn!(operation = %kind, error = %err, "operation rejected");
                let entry = inner.log.begin(kind.label());
                inner.log.child(entry, &err.user_message(), LogStatus::Error);
                inner.log.complete(entry, LogStatus::Error);
                inner.emit_error(format!("{kind} rejected: {}", err.user_message()));
                return Err(err);
            }
        };

        let handle = tokio::spawn(async move {
            let entry = inner.log.begin(kind.label());
            tracing::info!(operation = %kind, "operation started");
            inner.emit_operation_started(kind.to_string());

            let run = Run {
                inner: Arc::clone(&inner),
                kind,
                entry,
                token: slot.token().clone(),
            };
            let result = body(run).await;

            match &result {
                Ok(_) => {
                    inner.log.complete(entry, LogStatus::Complete);
                    slot.release(OperationState::Idle);
                    tracing::info!(operation = %kind, "operation completed");
                    inner.emit_operation_completed(kind.to_string(), true);
                }
                Err(err) if err.is_cancelled() => {
                    inner.log.child(entry, "stopped by user", LogStatus::Complete);
                    inner.log.complete(entry, LogStatus::Complete);
                    slot.release(OperationState::Stopped);
                    tracing::warn!(operation = %kind, "operation stopped");
                    inner.emit_operation_completed(kind.to_string(), false);
                }
                Err(err) => {
                    inner.log.complete(entry, LogStatus::Error);
                    slot.release(OperationState::Failed);
                    tracing::error!(operation = %kind, error = %err, "operation failed");
                    inner.emit_operation_failed(kind.to_string(), FailureContext::from_error(err));
                }
            }
            result
        });

        handle
            .await
            .map_err(|e| Error::internal(format!("{kind} task failed: {e}")))?
    }

    /// Compare the host with the bundle's transcoder.
    ///
    /// An incompatible verdict is data, not an error.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning`, `InvalidPath`, `InvalidBundle` or
    /// `FileNotFound`.
    pub async fn check(&self, path: &Path) -> Result<CompatibilityReport, Error> {
        let path = path.to_path_buf();
        self.run(OperationKind::Check, move |run| check_body(run, path))
            .await
    }

    /// Back up the binaries and install the host-matching variant.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompatible` when there is nothing to fix, `Cancelled`
    /// if stopped, and the repository errors of backup and replace. After a
    /// replace failure the backup is kept and the bundle may be partially
    /// replaced.
    pub async fn fix(&self, path: &Path) -> Result<RepairReport, Error> {
        let path = path.to_path_buf();
        self.run(OperationKind::Fix, move |run| fix_body(run, path))
            .await
    }

    /// Copy the backed-up originals back and re-check.
    ///
    /// # Errors
    ///
    /// Returns `NoBackupAvailable` (bundle untouched), `RestoreFailed`, or
    /// `Cancelled`.
    pub async fn restore(&self, path: &Path) -> Result<RepairReport, Error> {
        let path = path.to_path_buf();
        self.run(OperationKind::Restore, move |run| restore_body(run, path))
            .await
    }

    /// Test path: install the `arch` variant (or the one opposite to the
    /// host) regardless of compatibility. Backs up first if needed.
    ///
    /// # Errors
    ///
    /// Same as `fix`, except that compatibility is not a precondition.
    pub async fn force_test(
        &self,
        path: &Path,
        arch: Option<Architecture>,
    ) -> Result<RepairReport, Error> {
        let path = path.to_path_buf();
        self.run(OperationKind::ForceTest, move |run| {
            force_body(run, path, arch)
        })
        .await
    }

    /// Signal the running operation to stop before its next step
    #[must_use]
    pub fn stop(&self) -> StopResponse {
        match self.inner.flight.stop() {
            Some(operation) => {
                tracing::warn!(%operation, "stop requested");
                self.inner
                    .emit(AppEvent::Engine(EngineEvent::StopRequested { operation }));
                StopResponse { stopped: true }
            }
            None => StopResponse { stopped: false },
        }
    }

    #[must_use]
    pub fn process_state(&self) -> ProcessStatus {
        let state = self.inner.flight.current();
        ProcessStatus {
            is_processing: state.is_running(),
            state,
        }
    }

    /// Whether the bundle has a backup to restore from
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` or `InvalidBundle`.
    pub async fn check_backup(&self, path: &Path) -> Result<BackupStatus, Error> {
        let repository = &self.inner.repository;
        let bundle = repository.locate(path).await?;
        Ok(BackupStatus {
            has_backup: repository.has_backup(&bundle).await,
            backup_dir: repository.backup_dir(&bundle),
        })
    }

    /// Validate a path and describe the layout derived from it
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` or `InvalidBundle`.
    pub async fn select_bundle(&self, path: &Path) -> Result<BundleSelection, Error> {
        let repository = &self.inner.repository;
        let location = repository.locate(path).await?;
        let binaries = repository.locate_binary_set(&location).await?;
        let has_backup = repository.has_backup(&location).await;
        Ok(BundleSelection {
            location,
            binaries,
            has_backup,
            variant_store: repository.resources_dir().to_path_buf(),
        })
    }

    /// Log entries, newest operation first
    #[must_use]
    pub fn get_log(&self) -> Vec<LogNode> {
        self.inner.log.tree()
    }

    #[must_use]
    pub fn get_log_text(&self) -> String {
        self.inner.log.render_text()
    }
}
