//! Platform-specific operation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur during probe and filesystem operations
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PlatformError {
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("unsupported architecture: {value} (expected x86_64 or arm64)")]
    UnsupportedArchitecture { value: String },

    #[error("filesystem operation failed: {operation} on {path} - {message}")]
    FilesystemOperationFailed {
        operation: String,
        path: String,
        message: String,
    },

    #[error("permission denied: {operation} on {path}")]
    PermissionDenied { operation: String, path: String },
}

impl PlatformError {
    /// Classify an `io::Error` raised by `operation` on `path`
    #[must_use]
    pub fn from_io(operation: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation: operation.to_string(),
                path: path.display().to_string(),
            },
            _ => Self::FilesystemOperationFailed {
                operation: operation.to_string(),
                path: path.display().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedArchitecture { .. } => Some("Use `x86_64` or `arm64`."),
            Self::PermissionDenied { .. } => {
                Some("Quit the media server and retry with permission to modify the application.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::FilesystemOperationFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::FileNotFound { .. } => "platform.file_not_found",
            Self::UnsupportedArchitecture { .. } => "platform.unsupported_architecture",
            Self::FilesystemOperationFailed { .. } => "platform.filesystem",
            Self::PermissionDenied { .. } => "platform.permission_denied",
        };
        Some(code)
    }
}
