#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Append-only record of orchestration steps
//!
//! Every engine operation opens one top-level entry and nests its sub-steps
//! under it. Past entries are never rewritten except for status transitions
//! of the entry's own id. The log optionally mirrors itself to a JSON-lines
//! journal so viewers can read it after the process exits.

mod entry;
mod journal;

pub use entry::{EntryId, LogEntry, LogNode};

use archfix_errors::Error;
use archfix_types::LogStatus;
use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::journal::Journal;

#[derive(Debug)]
struct Inner {
    entries: Vec<LogEntry>,
    next_id: EntryId,
    /// First id issued by this process; older entries came from the journal
    first_live_id: EntryId,
    max_entries: usize,
    journal: Option<Journal>,
}

impl Inner {
    fn find_mut(&mut self, id: EntryId) -> Option<&mut LogEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    fn persist(&mut self, entry: &LogEntry) {
        if let Some(journal) = &mut self.journal {
            if let Err(err) = journal.record(entry) {
                tracing::warn!(journal = %journal.path().display(), error = %err, "failed to write operation journal");
            }
        }
    }

    /// An operation of this process that has not finished yet
    fn is_in_flight(&self, entry: &LogEntry) -> bool {
        entry.status == LogStatus::Active && entry.id >= self.first_live_id
    }

    /// Drop the oldest top-level entries (and their children) beyond the
    /// limit. In-flight operations are never evicted.
    fn evict(&mut self) -> bool {
        let top_level = self.entries.iter().filter(|e| e.is_top_level()).count();
        if top_level <= self.max_entries {
            return false;
        }
        let excess = top_level - self.max_entries;
        let evicted: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|e| e.is_top_level() && !self.is_in_flight(e))
            .take(excess)
            .map(|e| e.id)
            .collect();
        if evicted.is_empty() {
            return false;
        }
        self.entries.retain(|e| {
            !evicted.contains(&e.id) && !e.parent_id.is_some_and(|p| evicted.contains(&p))
        });
        true
    }
}

/// Shared handle to the operation log
#[derive(Debug, Clone)]
pub struct OperationLog {
    inner: Arc<Mutex<Inner>>,
}

impl OperationLog {
    /// In-memory log keeping at most `max_entries` top-level entries
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: Vec::new(),
                next_id: 1,
                first_live_id: 1,
                max_entries: max_entries.max(1),
                journal: None,
            })),
        }
    }

    /// Log backed by a JSON-lines journal.
    ///
    /// Existing history is replayed, trimmed to `max_entries`, and the
    /// journal rewritten to match.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal exists but cannot be read, or the
    /// compacted journal cannot be written.
    pub fn open(journal_path: PathBuf, max_entries: usize) -> Result<Self, Error> {
        let mut journal = Journal::new(journal_path);
        let entries = journal.replay()?;
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;

        let mut inner = Inner {
            entries,
            next_id,
            first_live_id: next_id,
            max_entries: max_entries.max(1),
            journal: None,
        };
        inner.evict();
        journal.compact(&inner.entries)?;
        tracing::debug!(
            journal = %journal.path().display(),
            entries = inner.entries.len(),
            "operation journal opened"
        );
        inner.journal = Some(journal);

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves entries consistent; keep going
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn append(&self, parent_id: Option<EntryId>, label: &str, status: LogStatus) -> Option<EntryId> {
        let mut inner = self.lock();
        if let Some(parent) = parent_id {
            if !inner.entries.iter().any(|e| e.id == parent) {
                return None;
            }
        }
        let entry = LogEntry {
            id: inner.next_id,
            parent_id,
            timestamp: Utc::now(),
            label: label.to_string(),
            status,
        };
        inner.next_id += 1;
        inner.persist(&entry);
        let id = entry.id;
        inner.entries.push(entry);
        if inner.evict() {
            let Inner {
                entries, journal, ..
            } = &mut *inner;
            if let Some(journal) = journal {
                if let Err(err) = journal.compact(entries) {
                    tracing::warn!(error = %err, "failed to compact operation journal");
                }
            }
        }
        Some(id)
    }

    /// Append a top-level `active` entry
    pub fn begin(&self, label: &str) -> EntryId {
        // Top-level appends have no parent to miss
        self.append(None, label, LogStatus::Active).unwrap_or_default()
    }

    /// Append a sub-step under `parent_id`.
    ///
    /// Returns `None` and records nothing if the parent no longer exists.
    pub fn child(&self, parent_id: EntryId, label: &str, status: LogStatus) -> Option<EntryId> {
        self.append(Some(parent_id), label, status)
    }

    /// Set the status of an entry. Unknown ids are ignored.
    pub fn complete(&self, id: EntryId, status: LogStatus) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.find_mut(id) else {
            return false;
        };
        entry.status = status;
        let snapshot = entry.clone();
        inner.persist(&snapshot);
        true
    }

    /// Snapshot of all entries in append order
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<LogEntry> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Top-level entries newest first, each with its children in order
    #[must_use]
    pub fn tree(&self) -> Vec<LogNode> {
        let entries = self.entries();
        entries
            .iter()
            .rev()
            .filter(|e| e.is_top_level())
            .map(|top| LogNode {
                entry: top.clone(),
                children: entries
                    .iter()
                    .filter(|e| e.parent_id == Some(top.id))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Human-readable log, newest operation first
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for node in self.tree() {
            let _ = writeln!(
                out,
                "{} [{}] {}",
                node.entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                node.entry.status,
                node.entry.label
            );
            for child in &node.children {
                let _ = writeln!(
                    out,
                    "    {} [{}] {}",
                    child.timestamp.format("%H:%M:%S"),
                    child.status,
                    child.label
                );
            }
        }
        out
    }

    /// Journal file backing this log, if any
    #[must_use]
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.lock()
            .journal
            .as_ref()
            .map(|journal| journal.path().to_path_buf())
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Open the journal at `path` if given, otherwise an in-memory log
///
/// # Errors
///
/// See [`OperationLog::open`].
pub fn open_or_memory(path: Option<&Path>, max_entries: usize) -> Result<OperationLog, Error> {
    match path {
        Some(path) => OperationLog::open(path.to_path_buf(), max_entries),
        None => Ok(OperationLog::new(max_entries)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_of_missing_parent_is_noop() {
        let log = OperationLog::new(10);
        assert!(log.child(42, "orphan", LogStatus::Complete).is_none());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_eviction_drops_children() {
        let log = OperationLog::new(2);
        let first = log.begin("first");
        log.child(first, "first step", LogStatus::Complete);
        log.complete(first, LogStatus::Complete);
        let second = log.begin("second");
        let third = log.begin("third");

        let ids: Vec<EntryId> = log.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second, third]);
        assert!(log.child(first, "late step", LogStatus::Complete).is_none());
        assert!(!log.complete(first, LogStatus::Complete));
    }

    #[test]
    fn test_eviction_keeps_in_flight_operation() {
        let log = OperationLog::new(2);
        let running = log.begin("fix");
        for _ in 0..5 {
            let rejected = log.begin("check");
            log.complete(rejected, LogStatus::Error);
        }

        let top_level: Vec<LogEntry> = log.entries().into_iter().filter(|e| e.is_top_level()).collect();
        assert_eq!(top_level.len(), 2);
        assert_eq!(top_level[0].id, running);

        assert!(log.child(running, "Installing arm64 binaries", LogStatus::Complete).is_some());
        assert!(log.complete(running, LogStatus::Complete));
        assert_eq!(log.get(running).unwrap().status, LogStatus::Complete);

        // Once finished it is the oldest entry and goes first
        log.begin("restore");
        assert!(log.get(running).is_none());
    }
}
