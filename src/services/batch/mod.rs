//! Batch Orchestration
//!
//! Runs one compilable task unit over many inputs with bounded concurrency,
//! per-item checkpoint isolation and composite suspend/resume.
//!
//! ## Components
//!
//! - `node` - `BatchNode`, the public entry point
//! - `config` - `BatchNodeConfig` (serde, TOML loading)
//! - `controller` - `ConcurrencyController`, sequential or semaphore-bounded dispatch
//! - `runner` - `SubTaskRunner`, one compiled inner task per invocation
//! - `bridge_store` - `BatchBridgeStore`, per-item checkpoint keys (`batch_<index>`)
//! - `collector` - `OutcomeCollector`, success / failure / suspension folding
//! - `resume` - `ResumePlan`, first-run and resumed-run planning
//! - `callbacks` - `BatchHandler` lifecycle observers
//! - `types` - shared handle, state, outcome and option types

pub mod bridge_store;
pub mod callbacks;
pub mod collector;
pub mod config;
pub mod controller;
pub mod node;
pub mod resume;
pub mod runner;
pub mod types;

pub use bridge_store::{make_batch_checkpoint_id, parse_batch_index, BatchBridgeStore};
pub use callbacks::{BatchEndInfo, BatchHandler, BatchStartInfo, RunInfo};
pub use collector::{Collected, Outcome, OutcomeCollector, TaskReport};
pub use config::BatchNodeConfig;
pub use controller::ConcurrencyController;
pub use node::BatchNode;
pub use resume::ResumePlan;
pub use runner::SubTaskRunner;
pub use types::{
    BatchInterruptState, BatchOptions, BatchOutcome, SubTaskHandle, ADDRESS_SEGMENT_BATCH_PROCESS,
    COMPONENT_BATCH, DEFAULT_NODE_NAME,
};
