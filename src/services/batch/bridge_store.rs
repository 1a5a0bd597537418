//! Batch Bridge Store
//!
//! The checkpoint store handed to the inner task unit when a batch compiles
//! it. Every item checkpoints under its own key (`batch_<index>`), so the
//! persisted state of one item never collides with a sibling's.
//!
//! The store lives for one batch invocation. Resumed invocations start from
//! an empty store because checkpoint bytes belong to one compiled instance;
//! the batch's own resume state travels on the composite interrupt instead.

use std::collections::HashMap;

use async_trait::async_trait;
use plan_cascade_core::{CheckpointStore, CoreError, CoreResult};
use tokio::sync::RwLock;

const CHECKPOINT_ID_PREFIX: &str = "batch_";

/// Checkpoint key for a batch item, e.g. `batch_0`.
pub fn make_batch_checkpoint_id(index: usize) -> String {
    format!("{}{}", CHECKPOINT_ID_PREFIX, index)
}

/// Recover the item index from a checkpoint key.
pub fn parse_batch_index(checkpoint_id: &str) -> CoreResult<usize> {
    checkpoint_id
        .strip_prefix(CHECKPOINT_ID_PREFIX)
        .and_then(|index| index.parse::<usize>().ok())
        .ok_or_else(|| {
            CoreError::validation(format!("Invalid batch checkpoint ID: {}", checkpoint_id))
        })
}

/// Per-invocation store mapping item index to checkpoint bytes.
#[derive(Debug, Default)]
pub struct BatchBridgeStore {
    data: RwLock<HashMap<usize, Vec<u8>>>,
}

impl BatchBridgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices that have written a checkpoint, ascending.
    pub async fn indices(&self) -> Vec<usize> {
        let data = self.data.read().await;
        let mut indices: Vec<usize> = data.keys().copied().collect();
        indices.sort_unstable();
        indices
    }
}

#[async_trait]
impl CheckpointStore for BatchBridgeStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        let index = parse_batch_index(key)?;
        let data = self.data.read().await;
        Ok(data.get(&index).cloned())
    }

    async fn set(&self, key: &str, checkpoint: Vec<u8>) -> CoreResult<()> {
        let index = parse_batch_index(key)?;
        let mut data = self.data.write().await;
        data.insert(index, checkpoint);
        Ok(())
    }
}
