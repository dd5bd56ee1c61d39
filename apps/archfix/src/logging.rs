//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so the
//! debug log file carries the same information the terminal shows.

use archfix_events::{AppEvent, BundleEvent, EngineEvent, EventMessage, GeneralEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    let level = meta.tracing_level();
    match event {
        AppEvent::Bundle(bundle_event) => match bundle_event {
            BundleEvent::BackupCompleted {
                bundle,
                backup_dir,
                files,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    bundle = %bundle,
                    backup_dir = %backup_dir,
                    files = files,
                    "Backup completed"
                );
            }
            BundleEvent::ReplaceCompleted {
                bundle,
                target,
                files,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    bundle = %bundle,
                    target = %target,
                    files = files,
                    "Binaries replaced"
                );
            }
            BundleEvent::RestoreCompleted { bundle, files } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    bundle = %bundle,
                    files = files,
                    "Binaries restored"
                );
            }
            BundleEvent::BackupFailed { bundle, failure }
            | BundleEvent::ReplaceFailed {
                bundle, failure, ..
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    bundle = %bundle,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Bundle operation failed"
                );
            }
            BundleEvent::RestoreFailed {
                bundle,
                restored,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    bundle = %bundle,
                    restored = restored,
                    code = ?failure.code,
                    message = %failure.message,
                    "Restore failed part way"
                );
            }
            _ => log_at(level, message),
        },

        AppEvent::Engine(engine_event) => match engine_event {
            EngineEvent::StateChanged { from, to } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    from = %from,
                    to = %to,
                    "Operation state changed"
                );
            }
            EngineEvent::VerdictComputed { bundle, verdict } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    bundle = %bundle,
                    host = %verdict.host_architecture,
                    binary = %verdict.binary_architecture,
                    compatible = verdict.is_compatible,
                    "Compatibility verdict"
                );
            }
            EngineEvent::StopRequested { operation } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    "Stop requested"
                );
            }
            EngineEvent::StepStarted { .. } => log_at(level, message),
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::OperationFailed { operation, failure } => {
                if failure.retryable {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        operation = %operation,
                        retryable = failure.retryable,
                        code = ?failure.code,
                        message = %failure.message,
                        hint = ?failure.hint,
                        "Operation failed"
                    );
                } else {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        operation = %operation,
                        retryable = failure.retryable,
                        code = ?failure.code,
                        message = %failure.message,
                        hint = ?failure.hint,
                        "Operation failed"
                    );
                }
            }
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    message = %message,
                    context = ?context,
                    "Warning"
                );
            }
            _ => log_at(level, message),
        },

        AppEvent::Platform(_) => log_at(level, message),
    }
}

/// Fallback: the whole event at its metadata level
fn log_at(level: tracing::Level, message: &EventMessage) {
    let meta = &message.meta;
    let event = &message.event;
    match level {
        tracing::Level::ERROR => {
            error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event")
        }
        tracing::Level::WARN => {
            warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event")
        }
        tracing::Level::INFO => {
            info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event")
        }
        tracing::Level::DEBUG => {
            debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event")
        }
        tracing::Level::TRACE => {
            trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event")
        }
    }
}
