//! Download mode: every row of a harvested links file becomes one saved document.
//!
//! The per-file cursor is the index of the next row to process and moves past
//! a row once its outcome is final, saved or skipped. A broken row is never
//! retried on the next run. A backend that cannot produce the requested
//! format at all fails the file instead, leaving the cursor where it was.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::browser::{Browser, BrowserError};
use crate::checkpoint::RowCursorStore;
use crate::error::HarvestError;
use crate::handshake::{self, HandshakeOutcome, HandshakePolicy};
use crate::models::{ArtifactFormat, FetchRow, FetchTarget};
use crate::scheduler::PartitionWorker;
use crate::seed;

/// One links file; its file name is the partition id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInput {
    pub id: String,
    pub path: PathBuf,
}

impl DownloadInput {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { id, path }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Saved(PathBuf),
    Skipped(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub rows_total: usize,
    pub saved: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub format: ArtifactFormat,
    /// Try the print-friendly rendering before saving.
    pub print_transform: bool,
    /// Wait before capturing the page.
    pub save_settle: Duration,
}

pub struct DocumentFetcher {
    store: Arc<RowCursorStore>,
    policy: HandshakePolicy,
    options: FetchOptions,
}

impl DocumentFetcher {
    pub fn new(store: Arc<RowCursorStore>, policy: HandshakePolicy, options: FetchOptions) -> Self {
        Self {
            store,
            policy,
            options,
        }
    }

    #[tracing::instrument(skip_all, fields(partition = %input.id))]
    pub async fn download(
        &self,
        browser: &mut dyn Browser,
        input: &DownloadInput,
        cancel: &CancellationToken,
    ) -> Result<FetchReport, HarvestError> {
        let rows = seed::read_fetch_rows(&input.path)?;
        let start = self.store.get(&input.id) as usize;
        let mut report = FetchReport {
            rows_total: rows.len(),
            ..FetchReport::default()
        };

        if start > 0 {
            tracing::info!(next_row = start, rows = rows.len(), "Resuming from row cursor");
        }

        for (index, row) in rows.iter().enumerate().skip(start) {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.fetch_row(browser, row).await? {
                RowOutcome::Saved(path) => {
                    report.saved += 1;
                    tracing::info!(row = index, path = %path.display(), "Saved document");
                }
                RowOutcome::Skipped(reason) => {
                    report.skipped += 1;
                    tracing::warn!(row = index, url = %row.url, reason = %reason, "Row skipped");
                }
            }

            let next = (index + 1) as u64;
            if let Err(e) = self.store.update(&input.id, |cursor| *cursor = next) {
                tracing::error!(row = index, error = %e, "Failed to persist row cursor");
            }
        }

        Ok(report)
    }

    /// Reach, optionally print-transform, then save one row's document.
    ///
    /// Row-level problems are a [`RowOutcome::Skipped`]; only a backend that
    /// cannot capture the requested format is an error.
    pub async fn fetch_row(
        &self,
        browser: &mut dyn Browser,
        row: &FetchRow,
    ) -> Result<RowOutcome, HarvestError> {
        let target = FetchTarget::derive(&self.options.output_dir, row, self.options.format);
        if target.url.is_empty() {
            return Ok(RowOutcome::Skipped(String::from("row has no url")));
        }

        if let HandshakeOutcome::Failed { attempts, reason } =
            handshake::reach(browser, &target.url, &self.policy).await
        {
            return Ok(RowOutcome::Skipped(format!(
                "unreachable after {} attempts: {}",
                attempts, reason
            )));
        }

        if self.options.print_transform {
            if let Err(e) = browser.click(&handshake::print_control()).await {
                tracing::warn!(url = %target.url, error = %e, "Print control unavailable, saving page as is");
            }
        }

        tokio::time::sleep(self.options.save_settle).await;

        let artifact = match self.options.format {
            ArtifactFormat::Html => browser.page_source().await.map(String::into_bytes),
            ArtifactFormat::Pdf => browser.export_pdf().await,
        };
        let bytes = match artifact {
            Ok(bytes) => bytes,
            Err(e @ BrowserError::Unsupported(_)) => return Err(HarvestError::CaptureUnsupported(e)),
            Err(e) => return Ok(RowOutcome::Skipped(format!("cannot capture page: {}", e))),
        };

        Ok(match write_artifact(&target.path, &bytes).await {
            Ok(()) => RowOutcome::Saved(target.path),
            Err(e) => RowOutcome::Skipped(format!("cannot write {}: {}", target.path.display(), e)),
        })
    }
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

#[async_trait]
impl PartitionWorker for DocumentFetcher {
    type Item = DownloadInput;
    type Report = FetchReport;

    async fn run(
        &self,
        browser: &mut dyn Browser,
        input: &DownloadInput,
        cancel: &CancellationToken,
    ) -> Result<FetchReport, HarvestError> {
        self.download(browser, input, cancel).await
    }
}
