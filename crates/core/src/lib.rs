//! Plan Cascade Core
//!
//! Foundational traits, error types, run context and interrupt model for the
//! Plan Cascade batch orchestration workspace. This crate has no dependency
//! on orchestration code; orchestrators build on the seams defined here.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `context` - Run context with structural address, cancellation and resume scope
//! - `interrupt` - Suspend-for-input signals and their classification
//! - `checkpoint` - Checkpoint store trait and in-memory implementation
//! - `task` - Compilable / runnable task-unit traits and the `Lambda` task unit
//!
//! ## Design Principles
//!
//! 1. **Few external dependencies** - serde, async-trait, thiserror and tokio primitives
//! 2. **Trait-based abstractions** - task units and stores are mockable in tests
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod interrupt;
pub mod task;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Run Context ────────────────────────────────────────────────────────
pub use context::{Address, AddressSegment, RunContext};

// ── Interrupt Model ────────────────────────────────────────────────────
pub use interrupt::{
    composite_interrupt, extract_interrupt_info, interrupt, into_interrupt_signal,
    stateful_interrupt, InterruptContext, InterruptInfo, InterruptSignal,
};

// ── Checkpoint Stores ──────────────────────────────────────────────────
pub use checkpoint::{load_interrupt, save_interrupt, CheckpointStore, InMemoryCheckpointStore};

// ── Task Units ─────────────────────────────────────────────────────────
pub use task::{Compilable, CompileOptions, InvokeOptions, Lambda, Runnable};
