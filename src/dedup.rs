//! Drops repeated document URLs from harvested CSV files in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{0} has no url column")]
    MissingUrlColumn(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub kept: usize,
    pub removed: usize,
}

/// Rewrite `path` keeping the first row for every `url`. Header and column
/// order are preserved; the file is replaced atomically.
pub fn dedup_file(path: &Path) -> Result<DedupReport, DedupError> {
    let csv_err = |source: csv::Error| DedupError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let io_err = |source: std::io::Error| DedupError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let url_column = headers
        .iter()
        .position(|h| h.trim() == "url")
        .ok_or_else(|| DedupError::MissingUrlColumn(path.to_path_buf()))?;

    let tmp_path = path.with_extension("csv.tmp");
    let mut writer = csv::Writer::from_path(&tmp_path).map_err(csv_err)?;
    writer.write_record(&headers).map_err(csv_err)?;

    let mut seen = HashSet::new();
    let mut report = DedupReport::default();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let url = record.get(url_column).unwrap_or_default().trim().to_string();
        if seen.insert(url) {
            writer.write_record(&record).map_err(csv_err)?;
            report.kept += 1;
        } else {
            report.removed += 1;
        }
    }
    writer.flush().map_err(io_err)?;
    drop(writer);

    std::fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(report)
}

/// Dedup every file; a file that fails is logged and left untouched.
pub fn dedup_files(paths: &[PathBuf]) -> Vec<(PathBuf, DedupReport)> {
    let mut reports = Vec::new();
    for path in paths {
        match dedup_file(path) {
            Ok(report) => {
                tracing::info!(path = %path.display(), kept = report.kept, removed = report.removed, "Deduplicated");
                reports.push((path.clone(), report));
            }
            Err(e) => {
                let _ = std::fs::remove_file(path.with_extension("csv.tmp"));
                tracing::error!(path = %path.display(), error = %e, "Skipping file");
            }
        }
    }
    reports
}
