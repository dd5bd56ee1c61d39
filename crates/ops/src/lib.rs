#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Compatibility orchestration for archfix
//!
//! This crate sits between the CLI and the specialized crates. It owns the
//! single-flight operation slot, drives check, fix, restore and force runs
//! step by step, and records every step in the operation log.

mod context;
mod engine;
mod slot;
mod types;

pub use context::EngineBuilder;
pub use engine::CompatibilityEngine;
pub use types::{
    BackupStatus, BundleSelection, CompatibilityReport, ProcessStatus, RepairReport, StopResponse,
};

use archfix_errors::Error;
use archfix_oplog::LogNode;

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// Compatibility verdict
    Compatibility(CompatibilityReport),
    /// Fix, restore or force outcome
    Repair(RepairReport),
    /// Backup presence
    Backup(BackupStatus),
    /// Stop request acknowledgement
    Stop(StopResponse),
    /// Current operation state
    Process(ProcessStatus),
    /// Operation log, newest first
    Log(Vec<LogNode>),
    /// Selected bundle layout
    Bundle(BundleSelection),
    /// Generic success message
    Success(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns `OpsError::SerializationError` if the result cannot be encoded.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| {
            archfix_errors::OpsError::SerializationError {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Whether the result reports a healthy outcome.
    ///
    /// An incompatible verdict is a successful check but not a healthy
    /// bundle, so it reports false.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::Compatibility(report) => report.is_compatible,
            OperationResult::Stop(response) => response.stopped,
            OperationResult::Repair(_)
            | OperationResult::Backup(_)
            | OperationResult::Process(_)
            | OperationResult::Log(_)
            | OperationResult::Bundle(_)
            | OperationResult::Success(_) => true,
        }
    }
}
