//! Batch Types
//!
//! Shared data types for batch execution: the per-item handle, the resume
//! state attached to a composite interrupt, the invocation outcome and the
//! per-call options.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use plan_cascade_core::{CoreError, CoreResult, InterruptSignal, InvokeOptions};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

use super::bridge_store::make_batch_checkpoint_id;
use super::callbacks::BatchHandler;

/// Component type reported to callbacks.
pub const COMPONENT_BATCH: &str = "Batch";

/// Address segment kind appended for each item, e.g. `batch_process:0`.
pub const ADDRESS_SEGMENT_BATCH_PROCESS: &str = "batch_process";

/// Name used when a node is configured without one.
pub const DEFAULT_NODE_NAME: &str = "Node";

// ============================================================================
// SubTaskHandle
// ============================================================================

/// One dispatched item: its stable index, its input and its checkpoint key.
#[derive(Debug, Clone, PartialEq)]
pub struct SubTaskHandle<I> {
    /// Position in the original input sequence.
    pub index: usize,
    pub input: I,
    /// Checkpoint key in the batch bridge store, derived from `index`.
    pub checkpoint_id: String,
}

impl<I> SubTaskHandle<I> {
    pub fn new(index: usize, input: I) -> Self {
        Self {
            index,
            input,
            checkpoint_id: make_batch_checkpoint_id(index),
        }
    }
}

// ============================================================================
// BatchInterruptState
// ============================================================================

/// State a batch attaches to its composite interrupt.
///
/// Handed back verbatim on resume; the resumed run re-executes exactly
/// `interrupted_indices` and restores `completed_results` without running them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInterruptState<I, O> {
    /// Every input of the batch; the resume call supplies none.
    pub original_inputs: Vec<I>,
    /// Index -> output for every item that completed.
    pub completed_results: BTreeMap<usize, O>,
    /// Items that suspended, in ascending order.
    pub interrupted_indices: Vec<usize>,
    pub total_count: usize,
}

impl<I, O> BatchInterruptState<I, O> {
    /// Check that the state describes a consistent partition of `0..total_count`.
    pub fn validate(&self) -> AppResult<()> {
        if self.original_inputs.len() != self.total_count {
            return Err(AppError::resume_state(format!(
                "State holds {} inputs but a total count of {}",
                self.original_inputs.len(),
                self.total_count
            )));
        }

        let mut interrupted = BTreeSet::new();
        for &index in &self.interrupted_indices {
            if index >= self.total_count {
                return Err(AppError::resume_state(format!(
                    "Interrupted index {} is out of range (total {})",
                    index, self.total_count
                )));
            }
            if !interrupted.insert(index) {
                return Err(AppError::resume_state(format!(
                    "Interrupted index {} is listed twice",
                    index
                )));
            }
        }

        for &index in self.completed_results.keys() {
            if index >= self.total_count {
                return Err(AppError::resume_state(format!(
                    "Completed index {} is out of range (total {})",
                    index, self.total_count
                )));
            }
            if interrupted.contains(&index) {
                return Err(AppError::resume_state(format!(
                    "Index {} is both completed and interrupted",
                    index
                )));
            }
        }

        let accounted = interrupted.len() + self.completed_results.len();
        if accounted != self.total_count {
            return Err(AppError::resume_state(format!(
                "State accounts for {} of {} items",
                accounted, self.total_count
            )));
        }

        Ok(())
    }
}

impl<I, O> BatchInterruptState<I, O>
where
    I: DeserializeOwned,
    O: DeserializeOwned,
{
    /// Decode the state carried by a batch's composite interrupt.
    pub fn from_signal(signal: &InterruptSignal) -> AppResult<Self> {
        let state = signal.state.clone().ok_or_else(|| {
            AppError::resume_state(format!("Interrupt '{}' carries no batch state", signal.id()))
        })?;
        serde_json::from_value(state).map_err(|e| {
            AppError::resume_state(format!("Interrupt '{}' carries mistyped batch state: {}", signal.id(), e))
        })
    }
}

// ============================================================================
// BatchOutcome
// ============================================================================

/// Successful end of a batch invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<O> {
    /// Every item produced an output, in input order.
    Completed(Vec<O>),
    /// At least one item suspended and none failed; resume with this signal.
    Interrupted(InterruptSignal),
}

impl<O> BatchOutcome<O> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    pub fn outputs(&self) -> Option<&[O]> {
        match self {
            Self::Completed(outputs) => Some(outputs),
            Self::Interrupted(_) => None,
        }
    }

    pub fn interrupt(&self) -> Option<&InterruptSignal> {
        match self {
            Self::Completed(_) => None,
            Self::Interrupted(signal) => Some(signal),
        }
    }

    /// Fold into the task-unit result shape, the interrupt becoming an error.
    pub fn into_result(self) -> CoreResult<Vec<O>> {
        match self {
            Self::Completed(outputs) => Ok(outputs),
            Self::Interrupted(signal) => Err(CoreError::interrupted(signal)),
        }
    }
}

// ============================================================================
// BatchOptions
// ============================================================================

/// Per-call options for a batch invocation.
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Forwarded to every sub-task invocation.
    pub inner_options: InvokeOptions,
    /// Lifecycle callbacks for this invocation.
    pub handlers: Vec<Arc<dyn BatchHandler>>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: options passed to each sub-task invocation.
    pub fn with_inner_options(mut self, options: InvokeOptions) -> Self {
        self.inner_options = options;
        self
    }

    /// Builder: add a lifecycle callback handler.
    pub fn with_handler(mut self, handler: Arc<dyn BatchHandler>) -> Self {
        self.handlers.push(handler);
        self
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("inner_options", &self.inner_options)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
