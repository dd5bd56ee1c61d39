use archfix_types::LogStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a log entry, unique within one log
pub type EntryId = u64;

/// One step of an orchestrated operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntryId>,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub status: LogStatus,
}

impl LogEntry {
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A top-level entry with its sub-steps, as handed to viewers
#[derive(Debug, Clone, Serialize)]
pub struct LogNode {
    #[serde(flatten)]
    pub entry: LogEntry,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LogEntry>,
}
