//! Checkpoint Store Integration Tests
//!
//! Persists a composite suspension in a SQLite-backed store, reloads it from
//! a fresh store instance (as a restarted process would) and resumes the batch.

use std::sync::Arc;

use serde_json::json;

use plan_cascade_batch::{
    interrupt, load_interrupt, save_interrupt, BatchNode, BatchNodeConfig, BatchOptions,
    BatchOutcome, CheckpointStore, Compilable, InMemoryCheckpointStore, Lambda, RunContext,
    SqliteCheckpointStore,
};

/// Items above the threshold wait for a human-supplied score.
fn scoring_node() -> BatchNode<u32, u32> {
    let task: Arc<dyn Compilable<u32, u32>> = Arc::new(Lambda::new(|ctx: RunContext, x: u32| async move {
        if x < 100 {
            return Ok(x);
        }
        match ctx.resume_data::<u32>()? {
            Some(score) => Ok(score),
            None => Err(interrupt(&ctx, json!({"value": x}))),
        }
    }));
    BatchNode::new(BatchNodeConfig::new("Scorer").with_max_concurrency(2), task)
}

#[tokio::test]
async fn test_suspension_survives_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoints.db");
    let ctx = RunContext::new().append_address_segment("node", "scores");

    let signal = {
        let store = SqliteCheckpointStore::open(&path).unwrap();
        let outcome = scoring_node()
            .invoke(&ctx, vec![1, 150, 2, 300], BatchOptions::new())
            .await
            .unwrap();
        let signal = match outcome {
            BatchOutcome::Interrupted(signal) => signal,
            BatchOutcome::Completed(_) => panic!("Expected interrupt"),
        };
        save_interrupt(&store, "scores-run", &signal).await.unwrap();
        signal
    };

    let reopened = SqliteCheckpointStore::open(&path).unwrap();
    let loaded = load_interrupt(&reopened, "scores-run").await.unwrap().unwrap();
    assert_eq!(loaded, signal);

    let resume_ctx = RunContext::new()
        .append_address_segment("node", "scores")
        .resume_from(&loaded)
        .with_resume_data("node:scores;batch_process:1", json!(15))
        .with_resume_data("node:scores;batch_process:3", json!(30));

    let outcome = scoring_node()
        .invoke(&resume_ctx, Vec::new(), BatchOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome.outputs().unwrap(), &[1, 15, 2, 30][..]);

    assert!(reopened.delete("scores-run").await.unwrap());
    assert!(load_interrupt(&reopened, "scores-run").await.unwrap().is_none());
}

#[tokio::test]
async fn test_in_memory_store_round_trips_signal() {
    let store = InMemoryCheckpointStore::new();
    let ctx = RunContext::new();

    let outcome = scoring_node()
        .invoke(&ctx, vec![500], BatchOptions::new())
        .await
        .unwrap();
    let signal = outcome.interrupt().unwrap().clone();

    save_interrupt(&store, "run", &signal).await.unwrap();
    assert!(store.get("run").await.unwrap().is_some());
    assert_eq!(load_interrupt(&store, "run").await.unwrap(), Some(signal));
    assert_eq!(load_interrupt(&store, "missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_sqlite_store_as_compile_option_is_not_used_by_items() {
    let store = Arc::new(SqliteCheckpointStore::in_memory().unwrap());
    let node = scoring_node().with_compile_options(
        plan_cascade_batch::CompileOptions::new()
            .with_graph_name("scores")
            .with_checkpoint_store(store.clone()),
    );

    let outcome = node
        .invoke(&RunContext::new(), vec![1, 2, 3], BatchOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome.outputs().unwrap(), &[1, 2, 3][..]);
    assert!(store.list_keys().await.unwrap().is_empty());
}
