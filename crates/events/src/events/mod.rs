use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use archfix_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod bundle;
pub mod engine;
pub mod general;
pub mod platform;

pub use bundle::*;
pub use engine::*;
pub use general::*;
pub use platform::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Architecture probing and filesystem events
    Platform(PlatformEvent),

    /// Backup, replace and restore of the bundle's binaries
    Bundle(BundleEvent),

    /// Compatibility engine state machine events
    Engine(EngineEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Platform(_) => EventSource::PLATFORM,
            Self::Bundle(_) => EventSource::BUNDLE,
            Self::Engine(_) => EventSource::ENGINE,
        }
    }

    /// Default severity for this event.
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::General(event) => match event {
                GeneralEvent::Warning { .. } => EventLevel::Warn,
                GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. } => {
                    EventLevel::Error
                }
                GeneralEvent::OperationCompleted { success: false, .. } => EventLevel::Warn,
                GeneralEvent::OperationStarted { .. }
                | GeneralEvent::OperationCompleted { .. } => EventLevel::Info,
            },
            Self::Platform(event) => match event {
                PlatformEvent::FilesystemOperationFailed { .. } => EventLevel::Warn,
                PlatformEvent::HostDetected { .. } | PlatformEvent::BinaryProbed { .. } => {
                    EventLevel::Debug
                }
                PlatformEvent::FilesystemOperationCompleted { .. } => EventLevel::Trace,
            },
            Self::Bundle(event) => match event {
                BundleEvent::BackupFailed { .. }
                | BundleEvent::ReplaceFailed { .. }
                | BundleEvent::RestoreFailed { .. } => EventLevel::Error,
                BundleEvent::FileCopied { .. } => EventLevel::Debug,
                _ => EventLevel::Info,
            },
            Self::Engine(event) => match event {
                EngineEvent::StopRequested { .. } => EventLevel::Warn,
                EngineEvent::StepStarted { .. } | EngineEvent::StateChanged { .. } => {
                    EventLevel::Debug
                }
                EngineEvent::VerdictComputed { .. } => EventLevel::Info,
            },
        }
    }
}
