//! Batch Node
//!
//! Runs one inner task unit over a sequence of inputs and returns the outputs
//! in input order. Per invocation the node:
//!
//! 1. plans the run (first run, or resume from its own interrupt state)
//! 2. compiles the inner task unit once against a fresh bridge store
//! 3. dispatches the items under the concurrency bound
//! 4. folds the reports into completed outputs, a composite interrupt or the
//!    first failure
//!
//! A batch node is itself a task unit, so batches nest.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use plan_cascade_core::{
    composite_interrupt, Compilable, CompileOptions, CoreResult, InvokeOptions, RunContext,
    Runnable,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::utils::error::{AppError, AppResult};

use super::bridge_store::BatchBridgeStore;
use super::callbacks::{BatchEndInfo, BatchStartInfo, RunInfo};
use super::collector::{Collected, OutcomeCollector};
use super::config::BatchNodeConfig;
use super::controller::ConcurrencyController;
use super::resume::ResumePlan;
use super::runner::SubTaskRunner;
use super::types::{BatchInterruptState, BatchOptions, BatchOutcome, COMPONENT_BATCH};

/// Runs an inner task unit once per input item.
pub struct BatchNode<I, O> {
    config: BatchNodeConfig,
    inner_task: Arc<dyn Compilable<I, O>>,
    compile_options: CompileOptions,
}

impl<I, O> Clone for BatchNode<I, O> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner_task: self.inner_task.clone(),
            compile_options: self.compile_options.clone(),
        }
    }
}

impl<I, O> BatchNode<I, O>
where
    I: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    O: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a batch node over `inner_task`.
    pub fn new(config: BatchNodeConfig, inner_task: Arc<dyn Compilable<I, O>>) -> Self {
        let mut config = config;
        if config.name.is_empty() {
            config.name = BatchNodeConfig::default().name;
        }
        Self {
            config,
            inner_task,
            compile_options: CompileOptions::default(),
        }
    }

    /// Builder: options applied when the inner task unit is compiled.
    ///
    /// Any checkpoint store set here is replaced by the batch bridge store.
    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.compile_options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Component type reported to callbacks.
    pub fn component(&self) -> &'static str {
        COMPONENT_BATCH
    }

    pub fn config(&self) -> &BatchNodeConfig {
        &self.config
    }

    /// Process `inputs` and return the outputs in input order.
    ///
    /// When `ctx` resumes a run in which this node suspended, `inputs` is
    /// ignored and only the suspended items run again.
    pub async fn invoke(
        &self,
        ctx: &RunContext,
        inputs: Vec<I>,
        options: BatchOptions,
    ) -> AppResult<BatchOutcome<O>> {
        let run_info = RunInfo::new(self.name());
        let started = Instant::now();
        let start = BatchStartInfo {
            input_count: inputs.len(),
            max_concurrency: self.config.max_concurrency,
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        for handler in &options.handlers {
            handler.on_start(&run_info, &start);
        }

        tracing::info!(
            batch = %self.name(),
            run_id = %run_info.run_id,
            inputs = start.input_count,
            max_concurrency = self.config.max_concurrency,
            "Batch invocation started"
        );

        let result = self.run(ctx, inputs, options.inner_options).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(BatchOutcome::Completed(outputs)) => {
                let end = BatchEndInfo {
                    output_count: outputs.len(),
                    duration_ms,
                };
                for handler in &options.handlers {
                    handler.on_end(&run_info, &end);
                }
                tracing::info!(
                    batch = %self.name(),
                    run_id = %run_info.run_id,
                    outputs = outputs.len(),
                    duration_ms,
                    "Batch invocation completed"
                );
            }
            Ok(BatchOutcome::Interrupted(signal)) => {
                for handler in &options.handlers {
                    handler.on_interrupt(&run_info, signal);
                }
                tracing::info!(
                    batch = %self.name(),
                    run_id = %run_info.run_id,
                    interrupted = signal.children.len(),
                    duration_ms,
                    "Batch invocation suspended"
                );
            }
            Err(err) => {
                for handler in &options.handlers {
                    handler.on_error(&run_info, err);
                }
                tracing::warn!(
                    batch = %self.name(),
                    run_id = %run_info.run_id,
                    duration_ms,
                    "Batch invocation failed: {}",
                    err
                );
            }
        }

        result
    }

    async fn run(
        &self,
        ctx: &RunContext,
        inputs: Vec<I>,
        inner_options: InvokeOptions,
    ) -> AppResult<BatchOutcome<O>> {
        self.config.validate()?;

        let plan = ResumePlan::<I, O>::assemble(ctx, inputs)?;
        if plan.resumed {
            tracing::info!(
                batch = %self.name(),
                total = plan.total(),
                rerun = plan.to_process.len(),
                "Resuming batch from interrupt state"
            );
        }

        if plan.is_empty() {
            return plan
                .completed_outputs()
                .map(BatchOutcome::Completed)
                .ok_or_else(|| AppError::internal("Batch has outstanding items but nothing to run"));
        }

        let run_ctx = if self.config.cancel_on_failure {
            ctx.with_child_cancellation()
        } else {
            ctx.clone()
        };

        let bridge = Arc::new(BatchBridgeStore::new());
        let runner = SubTaskRunner::compile(
            self.inner_task.as_ref(),
            &run_ctx,
            bridge,
            &self.compile_options,
            inner_options,
        )
        .await?;

        let handles = plan.handles();
        let total = plan.total();
        let ResumePlan {
            inputs,
            to_process,
            outputs,
            ..
        } = plan;

        let mut collector = OutcomeCollector::new(to_process, outputs);
        if self.config.cancel_on_failure {
            collector = collector.with_failure_token(run_ctx.cancellation_token().clone());
        }

        let (tx, rx) = mpsc::channel(handles.len());
        let controller = ConcurrencyController::new(self.config.max_concurrency);
        let ((), collected) = tokio::join!(
            controller.dispatch(Arc::new(runner), handles, tx),
            collector.collect(rx)
        );

        let collected = match collected {
            Ok(collected) => collected,
            Err(err @ AppError::TaskFailed { .. }) if ctx.is_cancelled() => {
                tracing::debug!(batch = %self.name(), "Failure after cancellation: {}", err);
                return Err(AppError::cancelled(format!(
                    "Batch '{}' was cancelled",
                    self.name()
                )));
            }
            Err(err) => return Err(err),
        };

        match collected {
            Collected::Completed(outputs) => Ok(BatchOutcome::Completed(outputs)),
            Collected::Suspended {
                completed,
                interrupted,
            } => {
                let (interrupted_indices, children): (Vec<usize>, Vec<_>) =
                    interrupted.into_iter().unzip();
                let info = json!({
                    "batch": self.name(),
                    "interrupted": interrupted_indices.len(),
                    "total": total,
                });
                let state = BatchInterruptState {
                    original_inputs: inputs,
                    completed_results: completed,
                    interrupted_indices,
                    total_count: total,
                };
                let state = serde_json::to_value(&state)?;
                Ok(BatchOutcome::Interrupted(composite_interrupt(
                    ctx,
                    Some(info),
                    state,
                    children,
                )))
            }
        }
    }
}

#[async_trait]
impl<I, O> Runnable<Vec<I>, Vec<O>> for BatchNode<I, O>
where
    I: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    O: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn invoke(
        &self,
        ctx: RunContext,
        input: Vec<I>,
        options: InvokeOptions,
    ) -> CoreResult<Vec<O>> {
        let options = BatchOptions::new().with_inner_options(options);
        let outcome = BatchNode::<I, O>::invoke(self, &ctx, input, options).await?;
        outcome.into_result()
    }
}

#[async_trait]
impl<I, O> Compilable<Vec<I>, Vec<O>> for BatchNode<I, O>
where
    I: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    O: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn compile(
        &self,
        _ctx: &RunContext,
        _options: CompileOptions,
    ) -> CoreResult<Arc<dyn Runnable<Vec<I>, Vec<O>>>> {
        Ok(Arc::new(self.clone()))
    }
}
