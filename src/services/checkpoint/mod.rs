//! Checkpoint Persistence
//!
//! Durable `CheckpointStore` implementations. The in-memory store lives in
//! `plan_cascade_core`.

pub mod sqlite_store;

pub use sqlite_store::{DbPool, SqliteCheckpointStore};
