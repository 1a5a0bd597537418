//! Concurrency Controller
//!
//! Decides how the sub-tasks of one invocation are scheduled:
//!
//! - `max_concurrency == 0`: items run one after another in index order.
//! - `max_concurrency == N`: at most N items run at once. The first item runs
//!   inline on the calling task; the others are spawned and wait for a permit.
//!
//! Every dispatched item produces exactly one `TaskReport` on the channel,
//! unless it panics. A panicking item is logged and sends nothing, wherever
//! it ran; the collector then reports it as missing.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use super::collector::TaskReport;
use super::runner::SubTaskRunner;
use super::types::SubTaskHandle;

/// Schedules sub-tasks under the configured concurrency bound.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyController {
    max_concurrency: usize,
}

impl ConcurrencyController {
    pub fn new(max_concurrency: usize) -> Self {
        Self { max_concurrency }
    }

    pub fn is_sequential(&self) -> bool {
        self.max_concurrency == 0
    }

    /// Run every handle and send its report to `tx`.
    ///
    /// Returns once all dispatched items have reported.
    pub async fn dispatch<I, O>(
        self,
        runner: Arc<SubTaskRunner<I, O>>,
        handles: Vec<SubTaskHandle<I>>,
        tx: mpsc::Sender<TaskReport<O>>,
    ) where
        I: Send + Sync + 'static,
        O: Send + Sync + 'static,
    {
        if self.is_sequential() {
            self.dispatch_sequential(&runner, handles, tx).await;
        } else {
            self.dispatch_concurrent(runner, handles, tx).await;
        }
    }

    async fn dispatch_sequential<I, O>(
        &self,
        runner: &SubTaskRunner<I, O>,
        handles: Vec<SubTaskHandle<I>>,
        tx: mpsc::Sender<TaskReport<O>>,
    ) where
        I: Send + Sync + 'static,
        O: Send + Sync + 'static,
    {
        for handle in handles {
            let Some(report) = run_guarded(runner, handle).await else {
                continue;
            };
            if tx.send(report).await.is_err() {
                tracing::warn!("Outcome collector closed before all items reported");
                return;
            }
        }
    }

    async fn dispatch_concurrent<I, O>(
        &self,
        runner: Arc<SubTaskRunner<I, O>>,
        handles: Vec<SubTaskHandle<I>>,
        tx: mpsc::Sender<TaskReport<O>>,
    ) where
        I: Send + Sync + 'static,
        O: Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = handles.into_iter();

        let Some(first) = handles.next() else {
            return;
        };

        // The inline item takes its slot before any sibling can compete for one.
        let first_permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!("Concurrency semaphore closed: {}", e);
                return;
            }
        };

        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(handles.len());
        for handle in handles {
            let sem = semaphore.clone();
            let runner = runner.clone();
            let tx = tx.clone();
            let index = handle.index;

            tasks.push(tokio::spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::warn!(index, "Concurrency semaphore closed: {}", e);
                        return;
                    }
                };
                let Some(report) = run_guarded(&runner, handle).await else {
                    return;
                };
                if tx.send(report).await.is_err() {
                    tracing::warn!(index, "Outcome collector closed before item reported");
                }
            }));
        }

        let first_report = run_guarded(&runner, first).await;
        drop(first_permit);
        if let Some(report) = first_report {
            if tx.send(report).await.is_err() {
                tracing::warn!("Outcome collector closed before first item reported");
            }
        }
        drop(tx);

        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("Sub-task panicked or was aborted: {}", e);
            }
        }
    }
}

/// Run one item, turning a panic into a logged, missing report.
async fn run_guarded<I, O>(
    runner: &SubTaskRunner<I, O>,
    handle: SubTaskHandle<I>,
) -> Option<TaskReport<O>>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    let index = handle.index;
    match AssertUnwindSafe(runner.run(handle)).catch_unwind().await {
        Ok(report) => Some(report),
        Err(_) => {
            tracing::warn!(index, "Sub-task panicked");
            None
        }
    }
}
