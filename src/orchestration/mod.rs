//! Run wiring: configuration, shutdown and the command runners.

pub mod config;
pub mod download;
pub mod harvest;
pub mod shutdown;

pub use config::{
    build_download_config, build_harvest_config, session_options, ConfigError, DownloadConfig,
    HarvestConfig, Pacing,
};
pub use download::run_download;
pub use harvest::run_harvest;
pub use shutdown::setup_shutdown_handler;
