//! Runtime configuration built from CLI arguments.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::browser::SessionOptions;
use crate::cli::SessionArgs;
use crate::config::Config;
use crate::handshake::HandshakePolicy;
use crate::models::ArtifactFormat;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Start year {start} is after end year {end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("At least one worker is required")]
    NoWorkers,
}

/// Every fixed wait outside the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between paginated pages of one month.
    pub politeness_delay: Duration,
    /// Before capturing a document.
    pub save_settle: Duration,
    /// Between successive partition dispatches.
    pub dispatch_stagger: Duration,
}

impl Pacing {
    pub fn standard() -> Self {
        Self {
            politeness_delay: Duration::from_secs(Config::POLITENESS_DELAY_SECS),
            save_settle: Duration::from_secs(Config::SAVE_SETTLE_SECS),
            dispatch_stagger: Duration::from_secs(Config::DISPATCH_STAGGER_SECS),
        }
    }

    pub fn none() -> Self {
        Self {
            politeness_delay: Duration::ZERO,
            save_settle: Duration::ZERO,
            dispatch_stagger: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub seed_file: PathBuf,
    /// Per-court CSVs land here.
    pub output_dir: PathBuf,
    pub checkpoint_file: PathBuf,
    pub years: Vec<i32>,
    pub workers: usize,
    pub batch_size: usize,
    pub handshake: HandshakePolicy,
    pub pacing: Pacing,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub checkpoint_file: PathBuf,
    pub workers: usize,
    pub format: ArtifactFormat,
    pub print_transform: bool,
    pub handshake: HandshakePolicy,
    pub pacing: Pacing,
}

/// Inclusive range; a single year when `start == end`.
pub fn year_range(start: i32, end: i32) -> Result<Vec<i32>, ConfigError> {
    if start > end {
        return Err(ConfigError::InvalidYearRange { start, end });
    }
    Ok((start..=end).collect())
}

fn check_workers(workers: usize) -> Result<usize, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::NoWorkers);
    }
    Ok(workers)
}

pub fn build_harvest_config(
    seed_file: PathBuf,
    data_dir: &Path,
    start_year: i32,
    end_year: i32,
    workers: usize,
) -> Result<HarvestConfig, ConfigError> {
    Ok(HarvestConfig {
        seed_file,
        output_dir: data_dir.to_path_buf(),
        checkpoint_file: data_dir.join(Config::CHECKPOINT_FILE),
        years: year_range(start_year, end_year)?,
        workers: check_workers(workers)?,
        batch_size: Config::BATCH_SIZE,
        handshake: HandshakePolicy::listing(),
        pacing: Pacing::standard(),
    })
}

pub fn build_download_config(
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    checkpoint_file: PathBuf,
    workers: usize,
    format: ArtifactFormat,
    print_transform: bool,
) -> Result<DownloadConfig, ConfigError> {
    Ok(DownloadConfig {
        inputs,
        output_dir,
        checkpoint_file,
        workers: check_workers(workers)?,
        format,
        print_transform,
        handshake: HandshakePolicy::document(),
        pacing: Pacing::standard(),
    })
}

pub fn session_options(args: &SessionArgs) -> SessionOptions {
    SessionOptions {
        user_agent: args.user_agent.clone(),
        timeout_secs: args.timeout,
        headless: args.headless,
    }
}
