//! Operation orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum OpsError {
    #[error("transcoder already matches host architecture {host}")]
    AlreadyCompatible { host: String },

    #[error("another operation is already running: {operation}")]
    AlreadyRunning { operation: String },

    #[error("host architecture could not be determined")]
    UnknownHostArchitecture,

    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl UserFacingError for OpsError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyCompatible { .. } => Some("Nothing to fix."),
            Self::AlreadyRunning { .. } => {
                Some("Wait for the running operation to finish or stop it first.")
            }
            Self::UnknownHostArchitecture => {
                Some("Use force with an explicit architecture instead.")
            }
            Self::SerializationError { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AlreadyCompatible { .. } => "ops.already_compatible",
            Self::AlreadyRunning { .. } => "ops.already_running",
            Self::UnknownHostArchitecture => "ops.unknown_host_architecture",
            Self::SerializationError { .. } => "ops.serialization",
        };
        Some(code)
    }
}
