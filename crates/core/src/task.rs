//! Task Units
//!
//! A task unit is anything that can be compiled once and then invoked many
//! times: a linear pipeline, a dependency graph, a parallel-branch workflow.
//! Orchestrators only see the two traits defined here.
//!
//! - `Compilable` - compile-time step, receives `CompileOptions` (name, checkpoint store)
//! - `Runnable` - invoke-time step, receives `InvokeOptions` (checkpoint id, limits, metadata)
//! - `Lambda` - a closure-backed task unit implementing both

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::checkpoint::CheckpointStore;
use crate::context::RunContext;
use crate::error::{CoreError, CoreResult};

// ============================================================================
// Options
// ============================================================================

/// Options applied when a task unit is compiled.
#[derive(Clone, Default)]
pub struct CompileOptions {
    /// Name used for diagnostics and tracing.
    pub graph_name: Option<String>,
    /// Store the compiled task unit persists its internal checkpoints in.
    pub checkpoint_store: Option<Arc<dyn CheckpointStore>>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the graph name.
    pub fn with_graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = Some(name.into());
        self
    }

    /// Builder: set the checkpoint store.
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("graph_name", &self.graph_name)
            .field("checkpoint_store", &self.checkpoint_store.is_some())
            .finish()
    }
}

/// Options applied to a single invocation of a compiled task unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeOptions {
    /// Key under which the invocation reads and writes its checkpoint.
    pub checkpoint_id: Option<String>,
    /// Upper bound on internal steps, enforced by the task unit.
    pub max_run_steps: Option<usize>,
    /// Free-form values passed through to the task unit.
    pub metadata: HashMap<String, Value>,
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the checkpoint id.
    pub fn with_checkpoint_id(mut self, id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(id.into());
        self
    }

    /// Builder: set the step limit.
    pub fn with_max_run_steps(mut self, steps: usize) -> Self {
        self.max_run_steps = Some(steps);
        self
    }

    /// Builder: add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A compiled task unit that can be invoked once per input.
#[async_trait]
pub trait Runnable<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Run the task unit on one input.
    ///
    /// Returns `CoreError::Interrupted` when the task unit needs external input.
    async fn invoke(&self, ctx: RunContext, input: I, options: InvokeOptions) -> CoreResult<O>;
}

/// A task unit definition that must be compiled before it can run.
#[async_trait]
pub trait Compilable<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn compile(
        &self,
        ctx: &RunContext,
        options: CompileOptions,
    ) -> CoreResult<Arc<dyn Runnable<I, O>>>;
}

// ============================================================================
// Lambda
// ============================================================================

type LambdaFn<I, O> =
    dyn Fn(RunContext, I, InvokeOptions) -> BoxFuture<'static, CoreResult<O>> + Send + Sync;

/// A task unit backed by an async closure.
///
/// Compiling a `Lambda` is free; the compiled runnable shares the closure.
pub struct Lambda<I, O> {
    func: Arc<LambdaFn<I, O>>,
}

impl<I, O> Clone for Lambda<I, O> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
        }
    }
}

impl<I, O> Lambda<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Wrap a closure that only needs the context and the input.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(RunContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<O>> + Send + 'static,
    {
        Self {
            func: Arc::new(
                move |ctx: RunContext, input: I, _options: InvokeOptions| -> BoxFuture<'static, CoreResult<O>> {
                    Box::pin(func(ctx, input))
                },
            ),
        }
    }

    /// Wrap a closure that also inspects the invoke options.
    pub fn with_options<F, Fut>(func: F) -> Self
    where
        F: Fn(RunContext, I, InvokeOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<O>> + Send + 'static,
    {
        Self {
            func: Arc::new(
                move |ctx: RunContext, input: I, options: InvokeOptions| -> BoxFuture<'static, CoreResult<O>> {
                    Box::pin(func(ctx, input, options))
                },
            ),
        }
    }
}

#[async_trait]
impl<I, O> Runnable<I, O> for Lambda<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn invoke(&self, ctx: RunContext, input: I, options: InvokeOptions) -> CoreResult<O> {
        if ctx.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        (self.func)(ctx, input, options).await
    }
}

#[async_trait]
impl<I, O> Compilable<I, O> for Lambda<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn compile(
        &self,
        _ctx: &RunContext,
        _options: CompileOptions,
    ) -> CoreResult<Arc<dyn Runnable<I, O>>> {
        Ok(Arc::new(self.clone()))
    }
}
