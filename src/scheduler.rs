//! Bounded worker pool over partitions.
//!
//! Unfinished partitions are dispatched before finished ones (stable within
//! each group, so seed order breaks ties). Every dispatched partition gets its
//! own browser session for its whole lifetime. A worker failure, or a panic,
//! is recorded against its partition and never cancels siblings.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::browser::{Browser, BrowserFactory};
use crate::error::HarvestError;

/// Work for one partition, run against a session the scheduler opened for it.
#[async_trait]
pub trait PartitionWorker: Send + Sync + 'static {
    type Item: Send + Sync + 'static;
    type Report: Send + 'static;

    /// Runs until the partition is exhausted or `cancel` fires; the worker
    /// checks `cancel` only between units of work.
    async fn run(
        &self,
        browser: &mut dyn Browser,
        item: &Self::Item,
        cancel: &CancellationToken,
    ) -> Result<Self::Report, HarvestError>;
}

/// A partition tagged with whether the checkpoint store already has it finished.
#[derive(Debug, Clone)]
pub struct ScheduledPartition<T> {
    pub id: String,
    pub done: bool,
    pub item: T,
}

#[derive(Debug)]
pub struct PartitionFailure {
    pub id: String,
    pub error: HarvestError,
}

#[derive(Debug)]
pub struct RunSummary<R> {
    /// Completed or cancelled-at-a-boundary partitions, in completion order.
    pub reports: Vec<(String, R)>,
    pub already_done: Vec<String>,
    pub failures: Vec<PartitionFailure>,
    pub not_started: Vec<String>,
}

impl<R> Default for RunSummary<R> {
    fn default() -> Self {
        Self {
            reports: Vec::new(),
            already_done: Vec::new(),
            failures: Vec::new(),
            not_started: Vec::new(),
        }
    }
}

impl<R> RunSummary<R> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Not-done first; relative order inside each group is preserved.
pub fn rank<T>(mut partitions: Vec<ScheduledPartition<T>>) -> Vec<ScheduledPartition<T>> {
    partitions.sort_by_key(|p| p.done);
    partitions
}

pub struct Scheduler<W: PartitionWorker> {
    worker: Arc<W>,
    factory: Arc<dyn BrowserFactory>,
    max_concurrent: usize,
    dispatch_stagger: Duration,
    cancel: CancellationToken,
}

type TaskOutput<R> = (String, Result<R, HarvestError>);

impl<W: PartitionWorker> Scheduler<W> {
    pub fn new(
        worker: Arc<W>,
        factory: Arc<dyn BrowserFactory>,
        max_concurrent: usize,
        dispatch_stagger: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            worker,
            factory,
            max_concurrent: max_concurrent.max(1),
            dispatch_stagger,
            cancel,
        }
    }

    pub async fn run(&self, partitions: Vec<ScheduledPartition<W::Item>>) -> RunSummary<W::Report> {
        let ranked = rank(partitions);
        let pending = ranked.iter().filter(|p| !p.done).count();
        tracing::info!(
            partitions = ranked.len(),
            pending,
            workers = self.max_concurrent,
            "Dispatching partitions"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set: JoinSet<TaskOutput<W::Report>> = JoinSet::new();
        let mut summary = RunSummary::default();
        let mut dispatched = 0usize;

        for partition in ranked {
            if self.cancel.is_cancelled() {
                summary.not_started.push(partition.id);
                continue;
            }

            if partition.done {
                tracing::debug!(partition = %partition.id, "Already done, skipping");
                summary.already_done.push(partition.id);
                continue;
            }

            if dispatched > 0 && !self.dispatch_stagger.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        summary.not_started.push(partition.id);
                        continue;
                    }
                    _ = tokio::time::sleep(self.dispatch_stagger) => {}
                }
            }

            let permit = tokio::select! {
                _ = self.cancel.cancelled() => {
                    summary.not_started.push(partition.id);
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                // Only possible if the semaphore was closed, which never happens here.
                summary.not_started.push(partition.id);
                continue;
            };

            tracing::info!(partition = %partition.id, "Partition dispatched");
            dispatched += 1;

            let worker = Arc::clone(&self.worker);
            let factory = Arc::clone(&self.factory);
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let id = partition.id;
                let result = AssertUnwindSafe(run_partition(
                    worker.as_ref(),
                    factory.as_ref(),
                    &partition.item,
                    &cancel,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HarvestError::Panicked(panic_message(panic.as_ref()))));
                (id, result)
            });
        }

        if !summary.not_started.is_empty() {
            tracing::warn!(count = summary.not_started.len(), "Cancelled before dispatch");
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, Ok(report))) => {
                    tracing::info!(partition = %id, "Partition finished");
                    summary.reports.push((id, report));
                }
                Ok((id, Err(error))) => {
                    tracing::error!(partition = %id, error = %error, "Partition failed");
                    summary.failures.push(PartitionFailure { id, error });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Partition task aborted");
                    summary.failures.push(PartitionFailure {
                        id: String::from("<unknown>"),
                        error: HarvestError::Aborted(e.to_string()),
                    });
                }
            }
        }

        summary
    }
}

async fn run_partition<W: PartitionWorker>(
    worker: &W,
    factory: &dyn BrowserFactory,
    item: &W::Item,
    cancel: &CancellationToken,
) -> Result<W::Report, HarvestError> {
    let mut browser = factory.open_session().await?;
    worker.run(browser.as_mut(), item, cancel).await
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
