use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::url_utils;

/// Calendar month as it appears in listing link text.
///
/// Variant order is calendar order, so `Ord` doubles as the resume order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Exact, case-sensitive match against the English month names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// 1-based calendar position.
    pub const fn ordinal(self) -> u32 {
        self as u32 + 1
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One court: an independently schedulable unit of harvesting work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: String,
    pub base_url: String,
    pub years: Vec<i32>,
}

impl Partition {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, years: Vec<i32>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            years,
        }
    }

    pub fn final_year(&self) -> Option<i32> {
        self.years.last().copied()
    }
}

/// One extracted judgment reference. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HarvestedRecord {
    pub court: String,
    pub year: i32,
    pub month: Month,
    pub title: String,
    pub url: String,
}

/// A row of a harvested links file, as read back by the download mode.
///
/// Year and month stay textual: they only ever become path components.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchRow {
    pub court: String,
    pub year: String,
    pub month: String,
    pub url: String,
}

/// Rendered artifact kind written by the document fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactFormat {
    #[default]
    Html,
    Pdf,
}

impl ArtifactFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Html => "html",
            ArtifactFormat::Pdf => "pdf",
        }
    }
}

/// Document URL paired with its deterministic output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub path: PathBuf,
}

impl FetchTarget {
    /// `<base>/<court>/<year>/<month>/<doc_id>.<ext>`. Same row, same path.
    pub fn derive(base_dir: &Path, row: &FetchRow, format: ArtifactFormat) -> Self {
        let url = row.url.trim().to_string();
        let doc_id = url_utils::document_id(&url);
        let path = base_dir
            .join(sanitize_component(&row.court))
            .join(sanitize_component(&row.year))
            .join(sanitize_component(&row.month))
            .join(format!("{}.{}", sanitize_component(&doc_id), format.extension()));

        Self { url, path }
    }
}

/// Make a value safe to use as a single path component.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
