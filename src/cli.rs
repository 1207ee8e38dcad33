use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;
use crate::models::ArtifactFormat;

/// Resumable harvester for court judgment listings and documents.
/// Exit codes: 0=success, 1=run error or failed partitions, 2=invalid arguments
#[derive(Parser, Debug)]
#[command(name = "judgment-harvester")]
#[command(about = "Harvest court judgment links and documents with crash-safe resumption")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every mode that drives browser sessions.
#[derive(clap::Args, Debug, Clone)]
pub struct SessionArgs {
    #[arg(long, help = "Run browser sessions without a window")]
    pub headless: bool,

    #[arg(
        short,
        long,
        default_value = Config::USER_AGENT,
        help = "User agent string for page loads"
    )]
    pub user_agent: String,

    #[arg(
        short,
        long,
        default_value_t = Config::REQUEST_TIMEOUT_SECS,
        help = "Page load timeout in seconds"
    )]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk every court's year and month listings and append judgment links to <court>.csv.
    Harvest {
        #[arg(
            short,
            long,
            default_value = Config::SEED_FILE,
            help = "CSV with court,url columns"
        )]
        seed_file: PathBuf,

        #[arg(
            short,
            long,
            default_value = Config::DATA_DIR,
            help = "Directory for per-court CSVs, the checkpoint and logs"
        )]
        data_dir: PathBuf,

        #[arg(long, default_value_t = Config::START_YEAR, help = "First year to harvest")]
        start_year: i32,

        #[arg(long, default_value_t = Config::END_YEAR, help = "Last year to harvest (inclusive)")]
        end_year: i32,

        #[arg(
            short,
            long,
            default_value_t = Config::DEFAULT_WORKERS,
            help = "Courts harvested concurrently"
        )]
        workers: usize,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Save every judgment listed in harvested CSV files.
    Download {
        #[arg(required = true, help = "Harvested <court>.csv files")]
        inputs: Vec<PathBuf>,

        #[arg(
            short,
            long,
            default_value = Config::DOWNLOAD_DIR,
            help = "Root directory for saved documents"
        )]
        output_dir: PathBuf,

        #[arg(
            long,
            default_value = Config::DOWNLOAD_CHECKPOINT_FILE,
            help = "Row cursor checkpoint file"
        )]
        checkpoint_file: PathBuf,

        #[arg(
            short,
            long,
            default_value_t = Config::DOWNLOAD_WORKERS,
            help = "Files processed concurrently"
        )]
        workers: usize,

        #[arg(long, value_enum, default_value_t = FormatArg::Html, help = "Artifact to save")]
        format: FormatArg,

        #[arg(long, help = "Save the page as loaded instead of its print view")]
        no_print: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Remove repeated document URLs from harvested CSV files in place.
    Dedup {
        #[arg(required = true, help = "CSV files to deduplicate")]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Html,
    Pdf,
}

impl From<FormatArg> for ArtifactFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => ArtifactFormat::Html,
            FormatArg::Pdf => ArtifactFormat::Pdf,
        }
    }
}

impl Cli {
    /// On error, clap prints help and exits with code 2 (usage error).
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
