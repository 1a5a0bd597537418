//! Batch Lifecycle Callbacks
//!
//! Handlers observe a batch invocation from the outside: start, completion,
//! suspension and failure. All methods default to no-ops so handlers only
//! implement what they need.

use plan_cascade_core::InterruptSignal;
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

use super::types::COMPONENT_BATCH;

/// Identifies the batch invocation a callback belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    /// Node name
    pub name: String,
    /// Component type, always `"Batch"`
    pub component: String,
    /// Unique id of this invocation
    pub run_id: String,
}

impl RunInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: COMPONENT_BATCH.to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Reported when an invocation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStartInfo {
    /// Inputs supplied by the caller (empty on resume).
    pub input_count: usize,
    pub max_concurrency: usize,
    /// ISO 8601 timestamp
    pub started_at: String,
}

/// Reported when an invocation completes with outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEndInfo {
    pub output_count: usize,
    pub duration_ms: u64,
}

/// Observer of batch invocations.
pub trait BatchHandler: Send + Sync {
    fn on_start(&self, _info: &RunInfo, _start: &BatchStartInfo) {}

    fn on_end(&self, _info: &RunInfo, _end: &BatchEndInfo) {}

    fn on_interrupt(&self, _info: &RunInfo, _signal: &InterruptSignal) {}

    fn on_error(&self, _info: &RunInfo, _error: &AppError) {}
}
