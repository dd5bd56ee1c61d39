//! Binary repository events (backup, replace, restore)

use archfix_types::Architecture;
use serde::{Deserialize, Serialize};

use super::FailureContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BundleEvent {
    BackupStarted {
        bundle: String,
        files: usize,
    },

    /// An existing backup was kept instead of being overwritten
    BackupExists {
        bundle: String,
        backup_dir: String,
    },

    BackupCompleted {
        bundle: String,
        backup_dir: String,
        files: usize,
    },

    BackupFailed {
        bundle: String,
        failure: FailureContext,
    },

    /// One whole file landed at its destination
    FileCopied {
        source: String,
        destination: String,
    },

    ReplaceStarted {
        bundle: String,
        target: Architecture,
        files: usize,
    },

    ReplaceCompleted {
        bundle: String,
        target: Architecture,
        files: usize,
    },

    ReplaceFailed {
        bundle: String,
        target: Architecture,
        failure: FailureContext,
    },

    RestoreStarted {
        bundle: String,
        files: usize,
    },

    RestoreCompleted {
        bundle: String,
        files: usize,
    },

    /// Restore stopped part way; `restored` files are already back in place
    RestoreFailed {
        bundle: String,
        restored: usize,
        failure: FailureContext,
    },
}
