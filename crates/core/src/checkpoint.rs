//! Checkpoint Store
//!
//! Key-value persistence used by task units to save their internal state
//! between a suspending run and the resuming run.
//!
//! ## Implementations
//! - `InMemoryCheckpointStore` - for development and testing
//! - `BatchBridgeStore` - per-item isolation inside a batch run (batch crate)
//! - `SqliteCheckpointStore` - survives process restarts (batch crate)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::interrupt::InterruptSignal;

/// Trait for persisting opaque checkpoint blobs by key.
///
/// Implementations must be thread-safe (Send + Sync); sub-tasks of a batch
/// call into the same store concurrently.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint stored under `key`, if any.
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>>;

    /// Store `data` under `key`, replacing any previous value.
    async fn set(&self, key: &str, data: Vec<u8>) -> CoreResult<()>;
}

/// In-memory implementation of `CheckpointStore`.
///
/// Stores blobs in a `HashMap` protected by a `RwLock`.
/// Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryCheckpointStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored checkpoints.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        let store = self.store.read().await;
        Ok(store.get(key).cloned())
    }

    async fn set(&self, key: &str, data: Vec<u8>) -> CoreResult<()> {
        let mut store = self.store.write().await;
        store.insert(key.to_string(), data);
        Ok(())
    }
}

/// Persist an interrupt signal so a later process can resume from it.
pub async fn save_interrupt(
    store: &dyn CheckpointStore,
    key: &str,
    signal: &InterruptSignal,
) -> CoreResult<()> {
    store.set(key, signal.to_bytes()?).await
}

/// Load an interrupt signal saved with `save_interrupt`.
pub async fn load_interrupt(
    store: &dyn CheckpointStore,
    key: &str,
) -> CoreResult<Option<InterruptSignal>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(InterruptSignal::from_bytes(&bytes)?)),
        None => Ok(None),
    }
}
