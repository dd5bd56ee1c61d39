//! Operation lifecycle types shared by the engine and the operation log

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level orchestrated operations. At most one runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Check,
    Fix,
    Restore,
    ForceTest,
}

impl OperationKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Check => "Check compatibility",
            Self::Fix => "Fix transcoder architecture",
            Self::Restore => "Restore original binaries",
            Self::ForceTest => "Force architecture (test)",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Check => "check",
            Self::Fix => "fix",
            Self::Restore => "restore",
            Self::ForceTest => "force_test",
        })
    }
}

/// Process-wide operation state owned by the compatibility engine.
///
/// `Stopped` and `Failed` record how the last operation ended; neither blocks
/// a new operation. Only `Running` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "operation", rename_all = "snake_case")]
pub enum OperationState {
    #[default]
    Idle,
    Running(OperationKind),
    Stopped,
    Failed,
}

impl OperationState {
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running(_))
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running(kind) => write!(f, "running ({kind})"),
            Self::Stopped => f.write_str("stopped"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Status of one operation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Active,
    Complete,
    Error,
}

impl LogStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Error => "error",
        })
    }
}
