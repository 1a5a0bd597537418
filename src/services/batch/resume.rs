//! Resume Planning
//!
//! Works out which items an invocation has to run. A first run processes
//! every input. A resumed run ignores the inputs it was given, restores the
//! original inputs and completed outputs from the batch's interrupt state and
//! re-runs only the items that suspended.

use plan_cascade_core::RunContext;
use serde::de::DeserializeOwned;

use crate::utils::error::{AppError, AppResult};

use super::types::{BatchInterruptState, SubTaskHandle};

/// Items to run and outputs already known for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePlan<I, O> {
    /// Every input of the batch, in order.
    pub inputs: Vec<I>,
    /// Indices to dispatch in this invocation, ascending.
    pub to_process: Vec<usize>,
    /// One slot per input; filled for items completed in an earlier run.
    pub outputs: Vec<Option<O>>,
    /// Whether the plan was restored from interrupt state.
    pub resumed: bool,
}

impl<I, O> ResumePlan<I, O>
where
    I: Clone,
{
    /// Plan a first run over `inputs`.
    pub fn fresh(inputs: Vec<I>) -> Self {
        let total = inputs.len();
        Self {
            inputs,
            to_process: (0..total).collect(),
            outputs: (0..total).map(|_| None).collect(),
            resumed: false,
        }
    }

    /// Plan a resumed run from a batch's interrupt state.
    pub fn from_state(state: BatchInterruptState<I, O>) -> AppResult<Self> {
        state.validate()?;

        let BatchInterruptState {
            original_inputs,
            completed_results,
            mut interrupted_indices,
            total_count,
        } = state;

        let mut outputs: Vec<Option<O>> = (0..total_count).map(|_| None).collect();
        for (index, output) in completed_results {
            outputs[index] = Some(output);
        }
        interrupted_indices.sort_unstable();

        Ok(Self {
            inputs: original_inputs,
            to_process: interrupted_indices,
            outputs,
            resumed: true,
        })
    }

    /// Handles for the items to dispatch.
    pub fn handles(&self) -> Vec<SubTaskHandle<I>> {
        self.to_process
            .iter()
            .map(|&index| SubTaskHandle::new(index, self.inputs[index].clone()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_process.is_empty()
    }

    /// Outputs restored so far, in input order. `None` if any item is outstanding.
    pub fn completed_outputs(&self) -> Option<Vec<O>>
    where
        O: Clone,
    {
        self.outputs.iter().cloned().collect()
    }
}

impl<I, O> ResumePlan<I, O>
where
    I: Clone + DeserializeOwned,
    O: DeserializeOwned,
{
    /// Plan the invocation at `ctx`'s address.
    ///
    /// Uses the interrupt state recorded for this address when the context
    /// resumes a run in which this batch suspended; plans a first run otherwise.
    pub fn assemble(ctx: &RunContext, inputs: Vec<I>) -> AppResult<Self> {
        if !ctx.was_interrupted() {
            return Ok(Self::fresh(inputs));
        }

        let state = ctx
            .interrupt_state::<BatchInterruptState<I, O>>()
            .map_err(|e| {
                AppError::resume_state(format!(
                    "Cannot restore batch at '{}': {}",
                    ctx.address(),
                    e
                ))
            })?;

        match state {
            None => {
                tracing::debug!(address = %ctx.address(), "Interrupted without batch state, running fresh");
                Ok(Self::fresh(inputs))
            }
            Some(state) => {
                if !inputs.is_empty() {
                    tracing::warn!(
                        address = %ctx.address(),
                        supplied = inputs.len(),
                        "Ignoring inputs supplied on resume; using the original inputs"
                    );
                }
                Self::from_state(state)
            }
        }
    }
}
