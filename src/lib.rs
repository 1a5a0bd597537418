//! Plan Cascade Batch
//!
//! Batch orchestration for compilable task units. A `BatchNode` runs one
//! inner task unit over a sequence of inputs and returns the outputs in input
//! order. It provides:
//! - Sequential or bounded-concurrent dispatch
//! - Per-item checkpoint isolation through a bridge store
//! - Fail-fast error handling (first failure wins)
//! - Composite suspension when items wait for external input, and resume
//!   that re-runs only the suspended items
//! - A SQLite checkpoint store for persisting suspensions across restarts

pub mod services;
pub mod utils;

pub use services::batch::{
    BatchEndInfo, BatchHandler, BatchInterruptState, BatchNode, BatchNodeConfig, BatchOptions,
    BatchOutcome, BatchStartInfo, RunInfo,
};
pub use services::checkpoint::SqliteCheckpointStore;
pub use utils::error::{AppError, AppResult, DiscardedOutcomes};

// Task-unit model re-exported for callers that only depend on this crate.
pub use plan_cascade_core::{
    composite_interrupt, extract_interrupt_info, interrupt, load_interrupt, save_interrupt,
    stateful_interrupt, Address, CheckpointStore, Compilable, CompileOptions, CoreError,
    CoreResult, InMemoryCheckpointStore, InterruptContext, InterruptInfo, InterruptSignal,
    InvokeOptions, Lambda, RunContext, Runnable,
};
