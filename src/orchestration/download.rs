//! Document download command.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::config::DownloadConfig;
use crate::browser::BrowserFactory;
use crate::checkpoint::RowCursorStore;
use crate::fetcher::{DocumentFetcher, DownloadInput, FetchOptions, FetchReport};
use crate::scheduler::{RunSummary, ScheduledPartition, Scheduler};
use crate::seed;

#[tracing::instrument(skip_all, fields(inputs = config.inputs.len(), workers = config.workers))]
pub async fn run_download(
    config: &DownloadConfig,
    factory: Arc<dyn BrowserFactory>,
    cancel: CancellationToken,
) -> RunSummary<FetchReport> {
    let store = Arc::new(RowCursorStore::new(&config.checkpoint_file));
    let cursors = store.load();

    let scheduled = config
        .inputs
        .iter()
        .map(|path| {
            let input = DownloadInput::from_path(path);
            let next_row = cursors.get(&input.id).copied().unwrap_or_default();
            ScheduledPartition {
                id: input.id.clone(),
                done: next_row > 0 && is_exhausted(&input, next_row),
                item: input,
            }
        })
        .collect();

    let fetcher = Arc::new(DocumentFetcher::new(
        store,
        config.handshake.clone(),
        FetchOptions {
            output_dir: config.output_dir.clone(),
            format: config.format,
            print_transform: config.print_transform,
            save_settle: config.pacing.save_settle,
        },
    ));
    let scheduler = Scheduler::new(
        fetcher,
        factory,
        config.workers,
        config.pacing.dispatch_stagger,
        cancel,
    );

    let summary = scheduler.run(scheduled).await;

    let saved: usize = summary.reports.iter().map(|(_, r)| r.saved).sum();
    let skipped: usize = summary.reports.iter().map(|(_, r)| r.skipped).sum();
    tracing::info!(
        files_run = summary.reports.len(),
        already_done = summary.already_done.len(),
        failed = summary.failures.len(),
        not_started = summary.not_started.len(),
        saved,
        skipped,
        "Download finished"
    );

    summary
}

/// Cursor at or past the last row. Unreadable files count as unfinished so
/// the worker reports them.
fn is_exhausted(input: &DownloadInput, next_row: u64) -> bool {
    match seed::read_fetch_rows(&input.path) {
        Ok(rows) => next_row >= rows.len() as u64,
        Err(_) => false,
    }
}
