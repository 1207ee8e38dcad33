//! Durable per-partition progress.
//!
//! The store is a single JSON object keyed by partition id. Every access goes
//! through one mutex so a read-modify-write by one worker can never interleave
//! with another worker's write; the lock is only ever held inside a
//! synchronous call, never across an `.await`.
//!
//! A missing, empty or unparsable file loads as an empty mapping with a
//! warning. Writes replace the whole file via a temp file and rename.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Month;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on checkpoint file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Resumption marker for one court.
///
/// `last_month` is the last month accounted for in `last_year`; a finished
/// year is recorded as `December` so a resume skips it entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub last_year: Option<i32>,
    pub last_month: Option<Month>,
    pub is_done: bool,
}

/// Where a partition's traversal picks up within one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// Year already fully accounted for.
    SkipYear,
    /// Process months strictly after the given one (`None`: from January).
    After(Option<Month>),
}

impl CheckpointRecord {
    pub fn position(&self) -> Option<(i32, u32)> {
        self.last_year
            .map(|year| (year, self.last_month.map_or(0, Month::ordinal)))
    }

    /// Skip years before `last_year`; inside `last_year` resume after `last_month`.
    pub fn resume_point(&self, year: i32) -> ResumePoint {
        if self.is_done {
            return ResumePoint::SkipYear;
        }
        match self.last_year {
            Some(last) if year < last => ResumePoint::SkipYear,
            Some(last) if year == last => match self.last_month {
                Some(Month::December) => ResumePoint::SkipYear,
                month => ResumePoint::After(month),
            },
            _ => ResumePoint::After(None),
        }
    }

    /// Move the marker forward to `(year, month)`. Returns `false` and leaves
    /// the record untouched if that would move it backwards.
    pub fn advance(&mut self, year: i32, month: Month) -> bool {
        let next = (year, month.ordinal());
        if let Some(current) = self.position() {
            if next < current {
                return false;
            }
        }
        self.last_year = Some(year);
        self.last_month = Some(month);
        true
    }

    pub fn mark_done(&mut self, final_year: i32) {
        self.last_year = Some(final_year);
        self.last_month = Some(Month::December);
        self.is_done = true;
    }
}

/// Thread-safe JSON mapping from partition id to `V`.
pub struct JsonStore<V> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: std::marker::PhantomData<fn() -> V>,
}

/// Link harvest progress, one `CheckpointRecord` per court.
pub type CheckpointStore = JsonStore<CheckpointRecord>;

/// Download progress, next row index per links file.
pub type RowCursorStore = JsonStore<u64>;

impl<V> JsonStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Default,
{
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole mapping. Never fails: unreadable state degrades to empty.
    pub fn load(&self) -> BTreeMap<String, V> {
        let _guard = self.lock.lock();
        match self.read_unlocked() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Checkpoint file unreadable, starting without prior progress");
                BTreeMap::new()
            }
        }
    }

    /// Full rewrite of the mapping.
    pub fn save(&self, entries: &BTreeMap<String, V>) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        self.write_unlocked(entries)
    }

    /// Value for one partition, or the default when absent.
    pub fn get(&self, key: &str) -> V {
        self.load().get(key).cloned().unwrap_or_default()
    }

    /// Read-modify-write of one partition under the store lock.
    ///
    /// A file that cannot be read is an error here rather than an empty
    /// mapping, so the rewrite never drops other partitions' progress.
    pub fn update<F>(&self, key: &str, mutate: F) -> Result<V, StoreError>
    where
        F: FnOnce(&mut V),
    {
        let _guard = self.lock.lock();
        let mut entries = self.read_unlocked()?;
        let entry = entries.entry(key.to_string()).or_default();
        mutate(entry);
        let updated = entry.clone();
        self.write_unlocked(&entries)?;
        Ok(updated)
    }

    /// Missing, empty or malformed content is an empty mapping; only an
    /// I/O failure on an existing file is an error.
    fn read_unlocked(&self) -> Result<BTreeMap<String, V>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            tracing::warn!(path = %self.path.display(), "Checkpoint file is empty, starting without prior progress");
            return Ok(BTreeMap::new());
        }

        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Checkpoint file is corrupted, starting without prior progress");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_unlocked(&self, entries: &BTreeMap<String, V>) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path).map_err(io_err)?;
            file.write_all(&json).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("scraping_checkpoint.json"))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn test_zero_byte_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"{\"Delhi\": {\"last_year\": 20").unwrap();
        assert!(store.load().is_empty());
        assert_eq!(store.get("Delhi"), CheckpointRecord::default());
    }

    #[test]
    fn test_update_survives_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"not json at all").unwrap();

        store.update("Delhi", |r| {
            r.advance(2020, Month::March);
        })
        .unwrap();

        assert_eq!(store.get("Delhi").last_month, Some(Month::March));
    }

    #[test]
    fn test_update_refuses_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scraping_checkpoint.json");
        // A directory in place of the file reads as an I/O error, not as absent.
        std::fs::create_dir(&path).unwrap();
        let store = CheckpointStore::new(&path);

        assert!(store.load().is_empty());

        let result = store.update("Delhi", |r| {
            r.advance(2020, Month::March);
        });
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .update("Bombay High Court", |r| {
                r.advance(2021, Month::June);
            })
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "Bombay High Court": {
                    "last_year": 2021,
                    "last_month": "June",
                    "is_done": false
                }
            })
        );
    }

    #[test]
    fn test_save_is_full_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.update("A", |r| r.mark_done(2024)).unwrap();

        let mut replacement = BTreeMap::new();
        replacement.insert("B".to_string(), CheckpointRecord::default());
        store.save(&replacement).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("B"));
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_partitions() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let key = format!("court-{}", i);
                    for month in Month::ALL {
                        store
                            .update(&key, |r| {
                                r.advance(2020, month);
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load();
        assert_eq!(loaded.len(), 8);
        assert!(loaded
            .values()
            .all(|r| r.last_month == Some(Month::December) && r.last_year == Some(2020)));
    }

    #[test]
    fn test_row_cursor_store() {
        let dir = TempDir::new().unwrap();
        let store = RowCursorStore::new(dir.path().join("download.json"));
        assert_eq!(store.get("Delhi High Court.csv"), 0);

        store.update("Delhi High Court.csv", |next| *next = 17).unwrap();
        assert_eq!(store.get("Delhi High Court.csv"), 17);
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap().trim(),
            "{\n  \"Delhi High Court.csv\": 17\n}"
        );
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut record = CheckpointRecord::default();
        assert!(record.advance(2020, Month::May));
        assert!(record.advance(2020, Month::May));
        assert!(!record.advance(2020, Month::April));
        assert!(!record.advance(2019, Month::December));
        assert_eq!(record.position(), Some((2020, 5)));
        assert!(record.advance(2021, Month::January));
        assert_eq!(record.position(), Some((2021, 1)));
    }

    #[test]
    fn test_resume_point() {
        let record = CheckpointRecord {
            last_year: Some(2021),
            last_month: Some(Month::March),
            is_done: false,
        };
        assert_eq!(record.resume_point(2020), ResumePoint::SkipYear);
        assert_eq!(record.resume_point(2021), ResumePoint::After(Some(Month::March)));
        assert_eq!(record.resume_point(2022), ResumePoint::After(None));

        let finished_year = CheckpointRecord {
            last_year: Some(2021),
            last_month: Some(Month::December),
            is_done: false,
        };
        assert_eq!(finished_year.resume_point(2021), ResumePoint::SkipYear);

        let fresh = CheckpointRecord::default();
        assert_eq!(fresh.resume_point(2020), ResumePoint::After(None));

        let mut done = CheckpointRecord::default();
        done.mark_done(2024);
        assert_eq!(done.resume_point(2024), ResumePoint::SkipYear);
    }
}
