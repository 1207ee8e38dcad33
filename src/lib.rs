pub mod backoff;
pub mod browser;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetcher;
pub mod handshake;
pub mod logging;
pub mod models;
pub mod network;
pub mod orchestration;
pub mod parser;
pub mod scheduler;
pub mod seed;
pub mod sink;
pub mod traversal;
pub mod url_utils;

// Re-export main types for library usage
pub use browser::{Anchor, Browser, BrowserError, BrowserFactory, Locator, SessionOptions};
pub use checkpoint::{CheckpointRecord, CheckpointStore, RowCursorStore, StoreError};
pub use error::HarvestError;
pub use handshake::{HandshakeOutcome, HandshakePolicy};
pub use models::{ArtifactFormat, FetchRow, FetchTarget, HarvestedRecord, Month, Partition};
pub use scheduler::{PartitionWorker, RunSummary, ScheduledPartition, Scheduler};
pub use traversal::{HarvestWorker, MonthOutcome, PartitionReport};
