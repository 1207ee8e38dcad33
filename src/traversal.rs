//! Year -> month -> page walk for one court.
//!
//! Each month is one unit: its records are flushed and the checkpoint is
//! advanced to `(year, month)` once the month ends, whether it ended because
//! pagination ran out or because a page failed to load. Cancellation is only
//! observed between units.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::browser::{Anchor, Browser};
use crate::checkpoint::{CheckpointRecord, CheckpointStore, ResumePoint};
use crate::error::HarvestError;
use crate::handshake::{self, HandshakeOutcome, HandshakePolicy};
use crate::models::{sanitize_component, HarvestedRecord, Month, Partition};
use crate::scheduler::PartitionWorker;
use crate::sink::BatchSink;
use crate::url_utils;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthOutcome {
    /// Pagination ran out normally.
    Completed { records: usize },
    /// A page could not be read; records gathered before it were flushed.
    Failed { records: usize, error: String },
}

impl MonthOutcome {
    pub fn records(&self) -> usize {
        match self {
            MonthOutcome::Completed { records } | MonthOutcome::Failed { records, .. } => *records,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub months_completed: usize,
    pub months_failed: usize,
    /// Years whose listing never yielded a month link.
    pub years_skipped: usize,
    pub records: usize,
    pub already_done: bool,
    pub cancelled: bool,
}

/// Link harvest for one court, persisting progress through a shared store.
pub struct HarvestWorker {
    store: Arc<CheckpointStore>,
    output_dir: PathBuf,
    policy: HandshakePolicy,
    politeness_delay: Duration,
    batch_size: usize,
}

impl HarvestWorker {
    pub fn new(
        store: Arc<CheckpointStore>,
        output_dir: impl Into<PathBuf>,
        policy: HandshakePolicy,
        politeness_delay: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
            policy,
            politeness_delay,
            batch_size,
        }
    }

    /// `<output_dir>/<court>.csv`
    pub fn output_path(&self, court: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.csv", sanitize_component(court)))
    }

    #[tracing::instrument(skip_all, fields(partition = %partition.id))]
    pub async fn harvest(
        &self,
        browser: &mut dyn Browser,
        partition: &Partition,
        cancel: &CancellationToken,
    ) -> PartitionReport {
        let mut report = PartitionReport::default();
        let mut progress = self.store.get(&partition.id);

        if progress.is_done {
            tracing::info!("Partition already done");
            report.already_done = true;
            return report;
        }
        if let Some((year, month)) = progress.position() {
            tracing::info!(year, month, "Resuming from checkpoint");
        }

        let mut sink = BatchSink::new(self.output_path(&partition.id), self.batch_size);

        'years: for &year in &partition.years {
            let after = match progress.resume_point(year) {
                ResumePoint::SkipYear => {
                    tracing::debug!(year, "Year already accounted for");
                    continue;
                }
                ResumePoint::After(after) => after,
            };

            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let months = self.month_links(browser, partition, year).await;
            if months.is_empty() {
                tracing::warn!(year, "No months found, skipping year");
                report.years_skipped += 1;
                self.advance(partition, &mut progress, year, Month::December);
                continue;
            }

            for (month, month_url) in months
                .into_iter()
                .filter(|(month, _)| after.map_or(true, |done| *month > done))
            {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'years;
                }

                let outcome = self
                    .harvest_month(browser, partition, year, month, &month_url, &mut sink)
                    .await;
                report.records += outcome.records();
                match &outcome {
                    MonthOutcome::Completed { records } => {
                        report.months_completed += 1;
                        tracing::info!(year, month = %month, records, "Month complete");
                    }
                    MonthOutcome::Failed { records, error } => {
                        report.months_failed += 1;
                        tracing::warn!(year, month = %month, records, error = %error, "Month failed, moving on");
                    }
                }
                self.advance(partition, &mut progress, year, month);
            }

            self.advance(partition, &mut progress, year, Month::December);
        }

        sink.flush();

        if !report.cancelled {
            if let Some(final_year) = partition.final_year() {
                match self.store.update(&partition.id, |r| r.mark_done(final_year)) {
                    Ok(_) => tracing::info!(records = report.records, "Partition done"),
                    Err(e) => tracing::error!(error = %e, "Failed to mark partition done"),
                }
            }
        }

        report
    }

    /// Month links on the year listing, one per month, in calendar order.
    async fn month_links(
        &self,
        browser: &mut dyn Browser,
        partition: &Partition,
        year: i32,
    ) -> Vec<(Month, String)> {
        let year_url = match url_utils::year_listing_url(&partition.base_url, year) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(year, base_url = %partition.base_url, error = %e, "Cannot build year listing url");
                return Vec::new();
            }
        };

        match handshake::reach(browser, &year_url, &self.policy).await {
            HandshakeOutcome::Reached { attempts } => {
                tracing::debug!(year, url = %year_url, attempts, "Year listing reached");
            }
            HandshakeOutcome::Failed { attempts, reason } => {
                tracing::warn!(year, url = %year_url, attempts, reason = %reason, "Year listing unreachable");
                return Vec::new();
            }
        }

        match browser.find_anchors().await {
            Ok(anchors) => month_links_from(&anchors),
            Err(e) => {
                tracing::warn!(year, url = %year_url, error = %e, "Cannot read year listing");
                Vec::new()
            }
        }
    }

    async fn harvest_month(
        &self,
        browser: &mut dyn Browser,
        partition: &Partition,
        year: i32,
        month: Month,
        month_url: &str,
        sink: &mut BatchSink,
    ) -> MonthOutcome {
        let mut page_url = month_url.to_string();
        let mut visited = HashSet::new();
        let mut records = 0;
        let mut page = 1;

        loop {
            visited.insert(page_url.clone());
            tracing::debug!(year, month = %month, page, url = %page_url, "Loading page");

            let loaded = match browser.open(&page_url).await {
                Ok(()) => browser.find_anchors().await,
                Err(e) => Err(e),
            };
            let anchors = match loaded {
                Ok(anchors) => anchors,
                Err(e) => {
                    sink.flush();
                    return MonthOutcome::Failed {
                        records,
                        error: e.to_string(),
                    };
                }
            };

            for anchor in anchors.iter().filter(|a| is_document_anchor(a)) {
                sink.push(HarvestedRecord {
                    court: partition.id.clone(),
                    year,
                    month,
                    title: anchor.text.trim().to_string(),
                    url: anchor.href.clone(),
                });
                records += 1;
            }

            match next_page(&anchors) {
                Some(next) if !visited.contains(next) => {
                    page_url = next.to_string();
                    page += 1;
                    tokio::time::sleep(self.politeness_delay).await;
                }
                Some(next) => {
                    tracing::warn!(url = %next, "Pagination loops back, ending month");
                    break;
                }
                None => break,
            }
        }

        sink.flush();
        MonthOutcome::Completed { records }
    }

    /// Persist `(year, month)`. A failed write is logged; the run goes on.
    fn advance(&self, partition: &Partition, progress: &mut CheckpointRecord, year: i32, month: Month) {
        if !progress.advance(year, month) {
            return;
        }
        if let Err(e) = self.store.update(&partition.id, |r| {
            r.advance(year, month);
        }) {
            tracing::error!(year, month = %month, error = %e, "Failed to persist checkpoint");
        }
    }
}

#[async_trait]
impl PartitionWorker for HarvestWorker {
    type Item = Partition;
    type Report = PartitionReport;

    async fn run(
        &self,
        browser: &mut dyn Browser,
        partition: &Partition,
        cancel: &CancellationToken,
    ) -> Result<PartitionReport, HarvestError> {
        Ok(self.harvest(browser, partition, cancel).await)
    }
}

/// Month anchors by exact name, deduplicated and sorted by calendar order.
pub fn month_links_from(anchors: &[Anchor]) -> Vec<(Month, String)> {
    let mut months: Vec<(Month, String)> = Vec::new();
    for anchor in anchors {
        if let Some(month) = Month::from_name(&anchor.text) {
            if !months.iter().any(|(seen, _)| *seen == month) {
                months.push((month, anchor.href.clone()));
            }
        }
    }
    months.sort_by_key(|(month, _)| *month);
    months
}

fn is_document_anchor(anchor: &Anchor) -> bool {
    url_utils::is_document_link(&anchor.href) && !anchor.text.trim().is_empty()
}

fn next_page(anchors: &[Anchor]) -> Option<&str> {
    anchors
        .iter()
        .find(|a| url_utils::is_next_link_text(&a.text))
        .map(|a| a.href.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_links_exact_sorted_deduped() {
        let anchors = vec![
            Anchor::new("https://x/2020/March/", "March"),
            Anchor::new("https://x/2020/January/", "January"),
            Anchor::new("https://x/2020/jan/", "january"),
            Anchor::new("https://x/2020/March-dup/", "March"),
            Anchor::new("https://x/2021/", "2021"),
        ];
        assert_eq!(
            month_links_from(&anchors),
            vec![
                (Month::January, "https://x/2020/January/".to_string()),
                (Month::March, "https://x/2020/March/".to_string()),
            ]
        );
    }

    #[test]
    fn test_document_anchor_filter() {
        assert!(is_document_anchor(&Anchor::new("https://indiankanoon.org/doc/1/", "A vs B")));
        assert!(!is_document_anchor(&Anchor::new("https://indiankanoon.org/doc/1/", "  ")));
        assert!(!is_document_anchor(&Anchor::new("https://indiankanoon.org/search/", "A vs B")));
    }

    #[test]
    fn test_next_page_lookup() {
        let anchors = vec![
            Anchor::new("https://x/p1", "Previous"),
            Anchor::new("https://x/p3", " next "),
        ];
        assert_eq!(next_page(&anchors), Some("https://x/p3"));
        assert_eq!(next_page(&anchors[..1]), None);
    }

    #[test]
    fn test_month_outcome_records() {
        assert_eq!(MonthOutcome::Completed { records: 3 }.records(), 3);
        assert_eq!(
            MonthOutcome::Failed {
                records: 2,
                error: "x".to_string()
            }
            .records(),
            2
        );
    }

    #[tokio::test]
    async fn test_error_status_page_fails_month() {
        use crate::browser::http::test_server;
        use crate::browser::HttpBrowser;
        use crate::network::HttpClient;

        let base = test_server::serve(vec![
            (
                "/browse/delhi/2021/May/",
                200,
                "<a href=\"/doc/1/\">A vs B</a><a href=\"/browse/delhi/2021/May/?page=2\">Next</a>"
                    .to_string(),
            ),
            ("/browse/delhi/2021/May/?page=2", 503, "<html>busy</html>".to_string()),
        ])
        .await;
        let dir = tempfile::TempDir::new().unwrap();
        let worker = HarvestWorker::new(
            Arc::new(CheckpointStore::new(dir.path().join("scraping_checkpoint.json"))),
            dir.path(),
            HandshakePolicy::listing().without_delays(),
            Duration::ZERO,
            10,
        );
        let partition = Partition::new("Delhi", format!("{}/browse/delhi/", base), vec![2021]);
        let mut sink = BatchSink::new(worker.output_path("Delhi"), 10);
        let client = HttpClient::new("TestBot/1.0".to_string(), 5).unwrap();
        let mut browser = HttpBrowser::new(Arc::new(client));

        let outcome = worker
            .harvest_month(
                &mut browser,
                &partition,
                2021,
                Month::May,
                &format!("{}/browse/delhi/2021/May/", base),
                &mut sink,
            )
            .await;

        match outcome {
            MonthOutcome::Failed { records, error } => {
                assert_eq!(records, 1);
                assert!(error.contains("503"));
            }
            other => panic!("expected a failed month, got {:?}", other),
        }
        assert_eq!(sink.written(), 1);
    }
}
