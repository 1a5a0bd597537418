//! Outcome Collector
//!
//! Receives sub-task reports as they arrive, classifies each one and folds
//! them into the invocation's result:
//!
//! - any failure: the first failure observed wins, everything else is discarded
//! - otherwise any suspension: the suspended items and every completed output
//!   are handed back for a composite interrupt
//! - otherwise: outputs in input order

use std::collections::{BTreeMap, HashSet};

use plan_cascade_core::{into_interrupt_signal, CoreError, CoreResult, InterruptSignal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::utils::error::{AppError, AppResult, DiscardedOutcomes};

/// Raw result of one sub-task, tagged with its item index.
#[derive(Debug)]
pub struct TaskReport<O> {
    pub index: usize,
    pub result: CoreResult<O>,
}

/// Classified result of one sub-task.
#[derive(Debug)]
pub enum Outcome<O> {
    Success(O),
    Failure(CoreError),
    Suspended(InterruptSignal),
}

impl<O> Outcome<O> {
    /// Tell suspend-for-input signals apart from ordinary errors.
    pub fn classify(result: CoreResult<O>) -> Self {
        match result {
            Ok(output) => Self::Success(output),
            Err(err) => match into_interrupt_signal(err) {
                Ok(signal) => Self::Suspended(signal),
                Err(err) => Self::Failure(err),
            },
        }
    }
}

/// What the collected reports amount to, short of a failure.
#[derive(Debug)]
pub enum Collected<O> {
    /// Every item has an output, in input order.
    Completed(Vec<O>),
    /// Some items suspended.
    Suspended {
        /// Index -> output for every item with an output, restored ones included.
        completed: BTreeMap<usize, O>,
        /// Suspended items, ascending by index.
        interrupted: Vec<(usize, InterruptSignal)>,
    },
}

/// Folds the reports of one invocation.
pub struct OutcomeCollector<O> {
    expected: HashSet<usize>,
    outputs: Vec<Option<O>>,
    succeeded: Vec<usize>,
    failures: Vec<(usize, CoreError)>,
    suspended: Vec<(usize, InterruptSignal)>,
    seen: HashSet<usize>,
    failure_token: Option<CancellationToken>,
}

impl<O> OutcomeCollector<O> {
    /// Collector expecting one report per index in `expected`.
    ///
    /// `outputs` holds one slot per item of the batch, already filled for
    /// items restored from a previous run.
    pub fn new(expected: impl IntoIterator<Item = usize>, outputs: Vec<Option<O>>) -> Self {
        Self {
            expected: expected.into_iter().collect(),
            outputs,
            succeeded: Vec::new(),
            failures: Vec::new(),
            suspended: Vec::new(),
            seen: HashSet::new(),
            failure_token: None,
        }
    }

    /// Cancel `token` as soon as the first failure arrives.
    pub fn with_failure_token(mut self, token: CancellationToken) -> Self {
        self.failure_token = Some(token);
        self
    }

    /// Record one report. Duplicate or unexpected reports are ignored.
    pub fn record(&mut self, report: TaskReport<O>) {
        let TaskReport { index, result } = report;

        if !self.expected.contains(&index) || index >= self.outputs.len() {
            tracing::warn!(index, "Ignoring report for an item that was not dispatched");
            return;
        }
        if !self.seen.insert(index) {
            tracing::warn!(index, "Ignoring duplicate report");
            return;
        }

        match Outcome::classify(result) {
            Outcome::Success(output) => {
                self.outputs[index] = Some(output);
                self.succeeded.push(index);
            }
            Outcome::Suspended(signal) => {
                tracing::debug!(index, interrupt = %signal.id(), "Sub-task suspended");
                self.suspended.push((index, signal));
            }
            Outcome::Failure(err) => {
                tracing::debug!(index, "Sub-task failed: {}", err);
                if self.failures.is_empty() {
                    if let Some(token) = &self.failure_token {
                        token.cancel();
                    }
                }
                self.failures.push((index, err));
            }
        }
    }

    /// Drain `rx` until every sender is gone, then fold the reports.
    pub async fn collect(mut self, mut rx: mpsc::Receiver<TaskReport<O>>) -> AppResult<Collected<O>> {
        while let Some(report) = rx.recv().await {
            self.record(report);
        }
        self.finish()
    }

    /// Fold the recorded reports into the invocation result.
    pub fn finish(self) -> AppResult<Collected<O>> {
        let Self {
            expected,
            outputs,
            mut succeeded,
            failures,
            mut suspended,
            seen,
            ..
        } = self;

        let mut failures = failures.into_iter();
        if let Some((index, source)) = failures.next() {
            succeeded.sort_unstable();
            let mut interrupted: Vec<usize> = suspended.iter().map(|(i, _)| *i).collect();
            interrupted.sort_unstable();
            let discarded = DiscardedOutcomes {
                succeeded,
                interrupted,
                failed: failures.map(|(i, e)| (i, e.to_string())).collect(),
            };
            return Err(AppError::TaskFailed {
                index,
                source,
                discarded,
            });
        }

        let mut missing: Vec<usize> = expected.difference(&seen).copied().collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(AppError::internal(format!(
                "No outcome reported for items {:?}",
                missing
            )));
        }

        if !suspended.is_empty() {
            suspended.sort_by_key(|(index, _)| *index);
            let completed = outputs
                .into_iter()
                .enumerate()
                .filter_map(|(index, output)| output.map(|o| (index, o)))
                .collect();
            return Ok(Collected::Suspended {
                completed,
                interrupted: suspended,
            });
        }

        let total = outputs.len();
        let outputs: Vec<O> = outputs.into_iter().flatten().collect();
        if outputs.len() != total {
            return Err(AppError::internal(format!(
                "Only {} of {} items produced an output",
                outputs.len(),
                total
            )));
        }
        Ok(Collected::Completed(outputs))
    }
}
