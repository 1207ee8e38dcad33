//! Bounded in-memory batches of harvested records, appended to one CSV per court.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::HarvestedRecord;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Append `records` to `path`, writing the header only when the file is new or empty.
pub fn append_records(path: &Path, records: &[HarvestedRecord]) -> Result<(), SinkError> {
    if records.is_empty() {
        return Ok(());
    }

    let io_err = |source: std::io::Error| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let needs_header = match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(io_err(e)),
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Accumulates records and flushes them every `threshold` pushes.
///
/// Flushing is best-effort: a failed write is logged and the batch is dropped,
/// traversal carries on.
pub struct BatchSink {
    path: PathBuf,
    threshold: usize,
    buffer: Vec<HarvestedRecord>,
    written: usize,
    dropped: usize,
}

impl BatchSink {
    pub fn new(path: impl Into<PathBuf>, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            path: path.into(),
            threshold,
            buffer: Vec::with_capacity(threshold),
            written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, record: HarvestedRecord) {
        self.buffer.push(record);
        if self.buffer.len() >= self.threshold {
            self.flush();
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Records successfully appended over this sink's lifetime.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Records lost to failed flushes.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Append whatever is buffered. Returns how many records were written.
    pub fn flush(&mut self) -> usize {
        if self.buffer.is_empty() {
            return 0;
        }

        let count = self.buffer.len();
        let result = append_records(&self.path, &self.buffer);
        self.buffer.clear();

        match result {
            Ok(()) => {
                self.written += count;
                tracing::debug!(path = %self.path.display(), records = count, "Flushed batch");
                count
            }
            Err(e) => {
                self.dropped += count;
                tracing::error!(path = %self.path.display(), records = count, error = %e, "Failed to flush batch");
                0
            }
        }
    }
}

impl Drop for BatchSink {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.flush();
        }
    }
}
