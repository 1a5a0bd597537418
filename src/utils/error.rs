//! Error Handling
//!
//! Batch-level error types. Uses thiserror for ergonomic error definitions.
//!
//! A batch invocation ends in exactly one of three ways: completed outputs,
//! a composite interrupt (both returned as `Ok(BatchOutcome)`), or one of the
//! errors below.

use plan_cascade_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcomes dropped because another item failed first.
///
/// The fail-fast policy never returns partial outputs; these indices are
/// kept on the error so callers can tell what else happened in the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardedOutcomes {
    /// Items that produced an output in this run.
    pub succeeded: Vec<usize>,
    /// Items that suspended in this run.
    pub interrupted: Vec<usize>,
    /// Items that failed after the reported one, with their messages.
    pub failed: Vec<(usize, String)>,
}

impl DiscardedOutcomes {
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.interrupted.is_empty() && self.failed.is_empty()
    }
}

/// Batch-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The inner task unit failed to compile; no item ran
    #[error("Compile error: {0}")]
    Compile(String),

    /// An item failed with an ordinary error (first one observed wins)
    #[error("Task {index} failed: {source}")]
    TaskFailed {
        index: usize,
        source: CoreError,
        discarded: DiscardedOutcomes,
    },

    /// The run was cancelled while items were still failing or pending
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The interrupt state handed back on resume is malformed or mistyped
    #[error("Resume state error: {0}")]
    ResumeState(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for batch errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a compile error
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a resume state error
    pub fn resume_state(msg: impl Into<String>) -> Self {
        Self::ResumeState(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Index of the failing item, for `TaskFailed` errors.
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            Self::TaskFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Fold a batch error into the core error type, for batches nested as task units.
impl From<AppError> for CoreError {
    fn from(err: AppError) -> CoreError {
        match err {
            AppError::Cancelled(_) => CoreError::Cancelled,
            AppError::TaskFailed { source, .. } if source.is_cancelled() => CoreError::Cancelled,
            AppError::Compile(msg) => CoreError::config(msg),
            AppError::ResumeState(msg) => CoreError::parse(msg),
            other => CoreError::task(other.to_string()),
        }
    }
}

/// Convert AppError to a string
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
