//! SQLite Checkpoint Store
//!
//! Persistent implementation of `CheckpointStore` backed by SQLite, so a
//! suspended batch can be resumed after the process restarts.
//!
//! Uses r2d2 connection pooling; every query runs on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use plan_cascade_core::{CheckpointStore, CoreError, CoreResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::utils::error::{AppError, AppResult};

/// Connection pool type shared with callers that already own a database.
pub type DbPool = Pool<SqliteConnectionManager>;

/// SQLite-backed checkpoint storage.
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: Arc<DbPool>,
}

impl SqliteCheckpointStore {
    /// Create a store on an existing pool.
    ///
    /// Creates the checkpoints table if it does not exist.
    pub fn new(pool: Arc<DbPool>) -> AppResult<Self> {
        let conn = pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                id TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self { pool })
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        Self::new(Arc::new(pool))
    }

    /// In-memory store, mainly for tests.
    pub fn in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        Self::new(Arc::new(pool))
    }

    /// Remove a checkpoint. Returns whether one existed.
    pub async fn delete(&self, key: &str) -> CoreResult<bool> {
        let pool = self.pool.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| CoreError::storage(format!("Failed to get connection: {}", e)))?;

            let deleted = conn
                .execute("DELETE FROM checkpoints WHERE id = ?1", rusqlite::params![key])
                .map_err(|e| CoreError::storage(format!("Failed to delete checkpoint: {}", e)))?;

            Ok(deleted > 0)
        })
        .await
        .map_err(|e| CoreError::storage(format!("Task join error: {}", e)))?
    }

    /// All checkpoint keys, sorted.
    pub async fn list_keys(&self) -> CoreResult<Vec<String>> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| CoreError::storage(format!("Failed to get connection: {}", e)))?;

            let mut stmt = conn
                .prepare("SELECT id FROM checkpoints ORDER BY id")
                .map_err(|e| CoreError::storage(format!("Failed to prepare statement: {}", e)))?;

            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| CoreError::storage(format!("Failed to query checkpoints: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CoreError::storage(format!("Failed to read checkpoint row: {}", e)))?;

            Ok(keys)
        })
        .await
        .map_err(|e| CoreError::storage(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        let pool = self.pool.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| CoreError::storage(format!("Failed to get connection: {}", e)))?;

            let result = conn.query_row(
                "SELECT data FROM checkpoints WHERE id = ?1",
                rusqlite::params![key],
                |row| row.get::<_, Vec<u8>>(0),
            );

            match result {
                Ok(data) => Ok(Some(data)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(CoreError::storage(format!("Failed to load checkpoint: {}", e))),
            }
        })
        .await
        .map_err(|e| CoreError::storage(format!("Task join error: {}", e)))?
    }

    async fn set(&self, key: &str, data: Vec<u8>) -> CoreResult<()> {
        let pool = self.pool.clone();
        let key = key.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| CoreError::storage(format!("Failed to get connection: {}", e)))?;

            conn.execute(
                "INSERT OR REPLACE INTO checkpoints (id, data, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, data, updated_at],
            )
            .map_err(|e| CoreError::storage(format!("Failed to save checkpoint: {}", e)))?;

            tracing::debug!(key = %key, bytes = data.len(), "Checkpoint saved");
            Ok(())
        })
        .await
        .map_err(|e| CoreError::storage(format!("Task join error: {}", e)))?
    }
}
