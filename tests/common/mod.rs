#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use judgment_harvester::browser::{Anchor, Browser, BrowserError, BrowserFactory, Locator};
use judgment_harvester::checkpoint::CheckpointStore;
use judgment_harvester::handshake::{print_control, HandshakePolicy};
use judgment_harvester::models::Month;
use judgment_harvester::orchestration::{DownloadConfig, HarvestConfig, Pacing};
use judgment_harvester::ArtifactFormat;

pub const ROOT: &str = "https://indiankanoon.org";

pub fn court_base(court: &str) -> String {
    format!("{}/browse/{}/", ROOT, court.to_lowercase())
}

pub fn year_url(court: &str, year: i32) -> String {
    format!("{}{}/", court_base(court), year)
}

pub fn month_url(court: &str, year: i32, month: Month) -> String {
    format!("{}{}/", year_url(court, year), month)
}

fn page_url(court: &str, year: i32, month: Month, page: usize) -> String {
    if page == 1 {
        month_url(court, year, month)
    } else {
        format!("{}?page={}", month_url(court, year, month), page)
    }
}

pub fn doc_url(court: &str, year: i32, month: Month, index: usize) -> String {
    format!("{}/doc/{}-{}-{}-{}/", ROOT, court.to_lowercase(), year, month.ordinal(), index)
}

#[derive(Default)]
struct Page {
    anchors: Vec<Anchor>,
    markers: Vec<String>,
}

/// In-memory site: court listings, paginated months and document pages.
#[derive(Default)]
pub struct Site {
    pages: HashMap<String, Page>,
    unreachable: HashSet<String>,
    month_starts: HashSet<String>,
    month_opens: AtomicUsize,
    cancel_after_months: Mutex<Option<(usize, CancellationToken)>>,
    opened: Mutex<Vec<String>>,
    sessions: AtomicUsize,
    prints: AtomicUsize,
    checkpoint_probe: Mutex<Option<(PathBuf, String)>>,
    probed_positions: Mutex<Vec<(i32, u32)>>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    /// One month of a court. `pages` holds the document count of each page.
    pub fn month(mut self, court: &str, year: i32, month: Month, pages: &[usize]) -> Self {
        let year_page = self.pages.entry(year_url(court, year)).or_default();
        year_page
            .anchors
            .push(Anchor::new(month_url(court, year, month), month.name()));

        let mut index = 0;
        for (i, &docs) in pages.iter().enumerate() {
            let page_no = i + 1;
            let mut page = Page::default();
            page.anchors.push(Anchor::new(format!("{}/search/", ROOT), "Search"));
            for _ in 0..docs {
                index += 1;
                page.anchors.push(Anchor::new(
                    doc_url(court, year, month, index),
                    format!("{} case {} of {} {}", court, index, month, year),
                ));
            }
            // Document-shaped link without a title is never a record.
            page.anchors
                .push(Anchor::new(format!("{}/doc/untitled/", ROOT), ""));
            if page_no < pages.len() {
                page.anchors
                    .push(Anchor::new(page_url(court, year, month, page_no + 1), "Next"));
            }
            self.pages.insert(page_url(court, year, month, page_no), page);
        }
        self.month_starts.insert(month_url(court, year, month));
        self
    }

    /// Give page `last_page` of a month a `Next` link back to its first page.
    pub fn next_loops_back(mut self, court: &str, year: i32, month: Month, last_page: usize) -> Self {
        if let Some(page) = self.pages.get_mut(&page_url(court, year, month, last_page)) {
            page.anchors
                .push(Anchor::new(month_url(court, year, month), "Next"));
        }
        self
    }

    /// A year listing with no month links at all.
    pub fn empty_year(mut self, court: &str, year: i32) -> Self {
        let page = self.pages.entry(year_url(court, year)).or_default();
        page.anchors.push(Anchor::new(format!("{}/", ROOT), "Home"));
        self
    }

    /// A document page carrying the print control.
    pub fn document(mut self, url: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                anchors: Vec::new(),
                markers: vec![print_control().to_string()],
            },
        );
        self
    }

    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Cancel `token` when the `n`th month (counting first pages) is opened.
    pub fn cancel_after_months(self, n: usize, token: CancellationToken) -> Self {
        *self.cancel_after_months.lock() = Some((n, token));
        self
    }

    /// Record `key`'s checkpoint position from `path` on every page load.
    pub fn probe_checkpoint(self, path: &Path, key: &str) -> Self {
        *self.checkpoint_probe.lock() = Some((path.to_path_buf(), key.to_string()));
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn prints(&self) -> usize {
        self.prints.load(Ordering::SeqCst)
    }

    pub fn probed_positions(&self) -> Vec<(i32, u32)> {
        self.probed_positions.lock().clone()
    }

    fn load(&self, url: &str) -> Result<(), BrowserError> {
        self.opened.lock().push(url.to_string());

        if let Some((path, key)) = self.checkpoint_probe.lock().as_ref() {
            if let Some(position) = CheckpointStore::new(path).get(key).position() {
                self.probed_positions.lock().push(position);
            }
        }

        if self.month_starts.contains(url) {
            let count = self.month_opens.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((n, token)) = self.cancel_after_months.lock().as_ref() {
                if count == *n {
                    token.cancel();
                }
            }
        }

        if self.unreachable.contains(url) || !self.pages.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

pub struct ScriptedBrowser {
    site: Arc<Site>,
    current: Option<String>,
}

impl ScriptedBrowser {
    fn page(&self) -> Option<&Page> {
        self.current.as_ref().and_then(|url| self.site.pages.get(url))
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open_with_reconnect(&mut self, url: &str, _: u32) -> Result<(), BrowserError> {
        self.open(url).await
    }

    async fn open(&mut self, url: &str) -> Result<(), BrowserError> {
        tokio::task::yield_now().await;
        match self.site.load(url) {
            Ok(()) => {
                self.current = Some(url.to_string());
                Ok(())
            }
            Err(e) => {
                self.current = None;
                Err(e)
            }
        }
    }

    async fn current_url(&mut self) -> Option<String> {
        self.current.clone()
    }

    async fn is_visible(&mut self, locator: &Locator) -> bool {
        let wanted = locator.to_string();
        self.page().is_some_and(|page| page.markers.contains(&wanted))
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), BrowserError> {
        if self.is_visible(locator).await {
            self.site.prints.fetch_add(1, Ordering::SeqCst);
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(locator.to_string()))
        }
    }

    async fn find_anchors(&mut self) -> Result<Vec<Anchor>, BrowserError> {
        self.page()
            .map(|page| page.anchors.clone())
            .ok_or(BrowserError::NoPage)
    }

    async fn solve_challenge_widget(&mut self) -> Result<(), BrowserError> {
        Err(BrowserError::Unsupported("challenge widget"))
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        match &self.current {
            Some(url) => Ok(format!("<html><body>{}</body></html>", url)),
            None => Err(BrowserError::NoPage),
        }
    }
}

pub struct ScriptedFactory {
    pub site: Arc<Site>,
}

#[async_trait]
impl BrowserFactory for ScriptedFactory {
    async fn open_session(&self) -> Result<Box<dyn Browser>, BrowserError> {
        self.site.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedBrowser {
            site: Arc::clone(&self.site),
            current: None,
        }))
    }
}

pub fn factory(site: &Arc<Site>) -> Arc<dyn BrowserFactory> {
    Arc::new(ScriptedFactory {
        site: Arc::clone(site),
    })
}

/// Seed file listing `courts` in order.
pub fn write_seed(dir: &Path, courts: &[&str]) -> PathBuf {
    let path = dir.join("court_links.csv");
    let mut body = String::from("court,url\n");
    for court in courts {
        body.push_str(&format!("{},{}\n", court, court_base(court)));
    }
    std::fs::write(&path, body).unwrap();
    path
}

pub fn harvest_config(dir: &Path, seed_file: PathBuf, years: Vec<i32>, workers: usize) -> HarvestConfig {
    HarvestConfig {
        seed_file,
        output_dir: dir.to_path_buf(),
        checkpoint_file: dir.join("scraping_checkpoint.json"),
        years,
        workers,
        batch_size: 4,
        handshake: HandshakePolicy::listing().without_delays(),
        pacing: Pacing::none(),
    }
}

pub fn download_config(dir: &Path, inputs: Vec<PathBuf>, workers: usize) -> DownloadConfig {
    DownloadConfig {
        inputs,
        output_dir: dir.join("judgments"),
        checkpoint_file: dir.join("scraping_checkpoint_download.json"),
        workers,
        format: ArtifactFormat::Html,
        print_transform: true,
        handshake: HandshakePolicy::document().without_delays(),
        pacing: Pacing::none(),
    }
}

/// Data rows (header excluded) of a CSV file; empty when the file is missing.
pub fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    if !path.exists() {
        return Vec::new();
    }
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

pub fn header_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| *l == "court,year,month,title,url")
        .count()
}
