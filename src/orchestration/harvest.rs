//! Link harvest command.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::config::HarvestConfig;
use crate::browser::BrowserFactory;
use crate::checkpoint::CheckpointStore;
use crate::scheduler::{RunSummary, ScheduledPartition, Scheduler};
use crate::seed::{self, SeedError};
use crate::traversal::{HarvestWorker, PartitionReport};

/// Loads seeds and checkpoint, then runs every court through the scheduler.
///
/// Only an unreadable seed list fails the call; everything after that is
/// reported per partition in the summary.
#[tracing::instrument(skip_all, fields(seed_file = %config.seed_file.display(), workers = config.workers))]
pub async fn run_harvest(
    config: &HarvestConfig,
    factory: Arc<dyn BrowserFactory>,
    cancel: CancellationToken,
) -> Result<RunSummary<PartitionReport>, SeedError> {
    let partitions = seed::read_partitions(&config.seed_file, &config.years)?;

    let store = Arc::new(CheckpointStore::new(&config.checkpoint_file));
    let checkpoint = store.load();

    let scheduled = partitions
        .into_iter()
        .map(|partition| ScheduledPartition {
            id: partition.id.clone(),
            done: checkpoint.get(&partition.id).is_some_and(|r| r.is_done),
            item: partition,
        })
        .collect();

    let worker = Arc::new(HarvestWorker::new(
        store,
        &config.output_dir,
        config.handshake.clone(),
        config.pacing.politeness_delay,
        config.batch_size,
    ));
    let scheduler = Scheduler::new(
        worker,
        factory,
        config.workers,
        config.pacing.dispatch_stagger,
        cancel,
    );

    let summary = scheduler.run(scheduled).await;
    log_summary(&summary);
    Ok(summary)
}

fn log_summary(summary: &RunSummary<PartitionReport>) {
    let mut totals = PartitionReport::default();
    for (_, report) in &summary.reports {
        totals.records += report.records;
        totals.months_completed += report.months_completed;
        totals.months_failed += report.months_failed;
        totals.years_skipped += report.years_skipped;
    }

    tracing::info!(
        partitions_run = summary.reports.len(),
        already_done = summary.already_done.len(),
        failed = summary.failures.len(),
        not_started = summary.not_started.len(),
        records = totals.records,
        months_completed = totals.months_completed,
        months_failed = totals.months_failed,
        years_skipped = totals.years_skipped,
        "Harvest finished"
    );
}
