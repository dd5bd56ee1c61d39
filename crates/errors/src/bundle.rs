//! Bundle validation and binary repository error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised at the binary repository boundary.
///
/// Every variant names the offending path so callers never see an
/// uncategorized I/O failure.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BundleError {
    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("not a recognized application bundle: {path} ({reason})")]
    InvalidBundle { path: String, reason: String },

    #[error("no backup available in {path}")]
    NoBackupAvailable { path: String },

    #[error("backup failed for {path}: {message}")]
    BackupFailed { path: String, message: String },

    #[error("replace failed for {path}: {message}")]
    ReplaceFailed { path: String, message: String },

    #[error("restore failed for {path} after {restored} file(s): {message}")]
    RestoreFailed {
        path: String,
        restored: usize,
        message: String,
    },
}

impl BundleError {
    /// Path the error refers to
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::InvalidPath { path }
            | Self::InvalidBundle { path, .. }
            | Self::NoBackupAvailable { path }
            | Self::BackupFailed { path, .. }
            | Self::ReplaceFailed { path, .. }
            | Self::RestoreFailed { path, .. } => path,
        }
    }
}

impl UserFacingError for BundleError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPath { .. } => Some("Select the installed media server application."),
            Self::InvalidBundle { .. } => {
                Some("The selected folder does not contain the bundled ffmpeg binaries.")
            }
            Self::NoBackupAvailable { .. } => {
                Some("Run a fix first; the original binaries are backed up on the first fix.")
            }
            Self::ReplaceFailed { .. } => Some(
                "The transcoder may be partially replaced. Run restore to put the originals back.",
            ),
            Self::RestoreFailed { .. } => {
                Some("Some files were restored. Fix the reported problem and run restore again.")
            }
            Self::BackupFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackupFailed { .. } | Self::ReplaceFailed { .. } | Self::RestoreFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidPath { .. } => "bundle.invalid_path",
            Self::InvalidBundle { .. } => "bundle.invalid_bundle",
            Self::NoBackupAvailable { .. } => "bundle.no_backup",
            Self::BackupFailed { .. } => "bundle.backup_failed",
            Self::ReplaceFailed { .. } => "bundle.replace_failed",
            Self::RestoreFailed { .. } => "bundle.restore_failed",
        };
        Some(code)
    }
}
