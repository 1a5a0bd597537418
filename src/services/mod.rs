//! Services
//!
//! Batch orchestration and checkpoint persistence.

pub mod batch;
pub mod checkpoint;

pub use batch::{BatchNode, BatchNodeConfig, BatchOptions, BatchOutcome};
pub use checkpoint::SqliteCheckpointStore;
