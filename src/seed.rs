//! Readers for the seed list and for harvested link files.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{FetchRow, Partition};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row {row} in {path}: {source}")]
    Row {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    court: String,
    url: String,
}

/// Read `court,url` rows into partitions covering `years`.
///
/// Blank courts or URLs are skipped with a warning; a repeated court keeps
/// its first row.
pub fn read_partitions(path: &Path, years: &[i32]) -> Result<Vec<Partition>, SeedError> {
    let rows: Vec<SeedRow> = read_rows(path)?;
    let mut partitions: Vec<Partition> = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let court = row.court.trim();
        let url = row.url.trim();
        if court.is_empty() || url.is_empty() {
            tracing::warn!(path = %path.display(), row = index + 1, "Seed row without court or url, skipping");
            continue;
        }
        if partitions.iter().any(|p| p.id == court) {
            tracing::warn!(path = %path.display(), court = %court, "Duplicate court in seed list, keeping the first");
            continue;
        }
        partitions.push(Partition::new(court, url, years.to_vec()));
    }

    tracing::info!(path = %path.display(), partitions = partitions.len(), "Loaded seed list");
    Ok(partitions)
}

/// Every row of a harvested links file, in file order.
pub fn read_fetch_rows(path: &Path) -> Result<Vec<FetchRow>, SeedError> {
    read_rows(path)
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, SeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)
        .map_err(|source| SeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|source| SeedError::Row {
                path: path.to_path_buf(),
                row: index + 1,
                source,
            })
        })
        .collect()
}
