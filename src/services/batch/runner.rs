//! Sub-Task Runner
//!
//! Compiles the inner task unit once per batch invocation, wired to the
//! invocation's bridge store, and runs it once per item. Each item gets its
//! own structural address (`batch_process:<index>`) and checkpoint key
//! (`batch_<index>`).
//!
//! The runner returns the raw invocation result; classifying it is the
//! collector's job.

use std::sync::Arc;

use plan_cascade_core::{Compilable, CompileOptions, CoreError, InvokeOptions, RunContext, Runnable};

use crate::utils::error::{AppError, AppResult};

use super::bridge_store::BatchBridgeStore;
use super::collector::TaskReport;
use super::types::{SubTaskHandle, ADDRESS_SEGMENT_BATCH_PROCESS};

/// Runs the compiled inner task unit for individual items.
pub struct SubTaskRunner<I, O> {
    runnable: Arc<dyn Runnable<I, O>>,
    ctx: RunContext,
    inner_options: InvokeOptions,
}

impl<I, O> SubTaskRunner<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Compile `task` against `bridge` and capture the per-call options.
    ///
    /// The bridge store always replaces any store set in `compile_options`.
    pub async fn compile(
        task: &dyn Compilable<I, O>,
        ctx: &RunContext,
        bridge: Arc<BatchBridgeStore>,
        compile_options: &CompileOptions,
        inner_options: InvokeOptions,
    ) -> AppResult<Self> {
        let options = compile_options.clone().with_checkpoint_store(bridge);
        let runnable = task.compile(ctx, options).await.map_err(|e| {
            tracing::warn!(address = %ctx.address(), "Failed to compile inner task: {}", e);
            AppError::compile(format!("failed to compile inner task: {}", e))
        })?;

        Ok(Self {
            runnable,
            ctx: ctx.clone(),
            inner_options,
        })
    }

    /// Context for one item: the batch context extended by `batch_process:<index>`.
    pub fn item_context(&self, index: usize) -> RunContext {
        self.ctx
            .append_address_segment(ADDRESS_SEGMENT_BATCH_PROCESS, index.to_string())
    }

    /// Run one item to completion, suspension, failure or cancellation.
    pub async fn run(&self, handle: SubTaskHandle<I>) -> TaskReport<O> {
        let SubTaskHandle {
            index,
            input,
            checkpoint_id,
        } = handle;

        let ctx = self.item_context(index);
        let token = ctx.cancellation_token().clone();
        let options = self.inner_options.clone().with_checkpoint_id(checkpoint_id);

        tracing::debug!(index, address = %ctx.address(), "Starting sub-task");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(CoreError::Cancelled),
            result = self.runnable.invoke(ctx, input, options) => result,
        };

        TaskReport { index, result }
    }
}
