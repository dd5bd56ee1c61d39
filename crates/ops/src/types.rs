//! Request results returned to callers

use archfix_repository::{BinarySet, BundleLocation};
use archfix_types::{Architecture, ArchitectureSet, CompatibilityVerdict, OperationState};
use serde::Serialize;
use std::path::PathBuf;

/// Result of a compatibility check
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub bundle: PathBuf,
    pub host_architecture: Architecture,
    pub binary_architecture: ArchitectureSet,
    pub is_compatible: bool,
}

impl CompatibilityReport {
    #[must_use]
    pub fn new(bundle: PathBuf, verdict: CompatibilityVerdict) -> Self {
        Self {
            bundle,
            host_architecture: verdict.host_architecture,
            binary_architecture: verdict.binary_architecture,
            is_compatible: verdict.is_compatible,
        }
    }
}

/// Result of fix, restore and force operations
#[derive(Clone, Debug, Serialize)]
pub struct RepairReport {
    pub message: String,
    /// Files written into the executable directory
    pub files: Vec<String>,
    /// Whether this operation created the backup (`None` for restore)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_created: Option<bool>,
    /// Compatibility after the operation
    pub verdict: CompatibilityReport,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackupStatus {
    pub has_backup: bool,
    pub backup_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub is_processing: bool,
    pub state: OperationState,
}

/// A validated bundle path and everything derived from it
#[derive(Clone, Debug, Serialize)]
pub struct BundleSelection {
    #[serde(flatten)]
    pub location: BundleLocation,
    pub binaries: BinarySet,
    pub has_backup: bool,
    pub variant_store: PathBuf,
}
