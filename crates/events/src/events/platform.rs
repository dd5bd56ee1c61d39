//! Architecture probe and filesystem operation events

use archfix_types::{Architecture, ArchitectureSet};
use serde::{Deserialize, Serialize};

use super::FailureContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Host architecture resolved
    HostDetected {
        /// Raw machine identifier reported by the kernel
        machine: String,
        architecture: Architecture,
        /// Process runs under binary translation (Rosetta)
        translated: bool,
    },

    /// Executable header decoded
    BinaryProbed {
        path: String,
        architectures: ArchitectureSet,
    },

    /// Filesystem operation completed successfully
    FilesystemOperationCompleted {
        operation: String,
        source_path: Option<String>,
        target_path: String,
        duration_ms: u64,
    },

    /// Filesystem operation failed
    FilesystemOperationFailed {
        operation: String,
        target_path: String,
        failure: FailureContext,
    },
}
