use thiserror::Error;

use crate::browser::BrowserError;
use crate::seed::SeedError;

/// Failure that ends one partition's worker. Sibling partitions are unaffected.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Browser session failed: {0}")]
    Session(#[from] BrowserError),

    #[error("Backend cannot produce the requested artifact: {0}")]
    CaptureUnsupported(BrowserError),

    #[error("Input unavailable: {0}")]
    Input(#[from] SeedError),

    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("Worker task aborted: {0}")]
    Aborted(String),
}
