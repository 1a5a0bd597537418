//! Core Error Types
//!
//! Defines the error type returned by every task-unit invocation in the
//! Plan Cascade workspace. These error types only depend on thiserror,
//! serde_json and std to keep the core crate lightweight.
//!
//! Two variants are control signals rather than failures:
//! - `Interrupted` carries a suspend-for-input signal raised by a task unit
//! - `Cancelled` reports that the run context's cancellation token fired
//!
//! The batch crate classifies these before deciding how a run ended.

use thiserror::Error;

use crate::interrupt::InterruptSignal;

/// Core error type for the Plan Cascade workspace.
///
/// The batch crate defines its own `AppError` for batch-level outcomes
/// (compile failures, per-item failures, malformed resume state).
#[derive(Error, Debug)]
pub enum CoreError {
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

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Checkpoint storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A task unit failed while processing its input
    #[error("Task error: {0}")]
    Task(String),

    /// A task unit suspended and is waiting for external input
    #[error("Interrupted: {0}")]
    Interrupted(Box<InterruptSignal>),

    /// The run context was cancelled before the task unit finished
    #[error("Cancelled")]
    Cancelled,

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a task error
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap an interrupt signal
    pub fn interrupted(signal: InterruptSignal) -> Self {
        Self::Interrupted(Box::new(signal))
    }

    /// Whether this error is a suspend-for-input signal.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// Whether this error reports a cancelled run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
