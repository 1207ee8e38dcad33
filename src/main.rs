use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use judgment_harvester::browser::{BrowserError, BrowserFactory, HttpBrowserFactory};
use judgment_harvester::cli::{Cli, Commands, SessionArgs};
use judgment_harvester::config::Config;
use judgment_harvester::dedup;
use judgment_harvester::logging::{init_logging_in_data_dir, LogGuards};
use judgment_harvester::orchestration::{
    build_download_config, build_harvest_config, run_download, run_harvest, session_options,
    setup_shutdown_handler, ConfigError,
};
use judgment_harvester::scheduler::RunSummary;
use judgment_harvester::seed::SeedError;

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Browser backend unavailable: {0}")]
    Browser(#[from] BrowserError),

    #[error("Seed list error: {0}")]
    Seed(#[from] SeedError),

    #[error("{0} partition(s) failed")]
    PartitionsFailed(usize),

    #[error("{0} file(s) could not be deduplicated")]
    DedupFailed(usize),
}

fn init_logging(dir: &Path) -> Result<LogGuards, MainError> {
    init_logging_in_data_dir(dir).map_err(|e| MainError::Logging(e.to_string()))
}

fn browser_factory(args: &SessionArgs) -> Result<Arc<dyn BrowserFactory>, MainError> {
    let options = session_options(args);
    if !options.headless {
        tracing::debug!("Static HTML backend has no window; --headless has no effect");
    }
    let factory: Arc<dyn BrowserFactory> = Arc::new(HttpBrowserFactory::new(&options)?);
    Ok(factory)
}

fn check_failures<R>(summary: &RunSummary<R>) -> Result<(), MainError> {
    for failure in &summary.failures {
        tracing::error!(partition = %failure.id, error = %failure.error, "Partition failed");
    }
    if summary.failures.is_empty() {
        Ok(())
    } else {
        Err(MainError::PartitionsFailed(summary.failures.len()))
    }
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Harvest {
            seed_file,
            data_dir,
            start_year,
            end_year,
            workers,
            session,
        } => {
            let config = build_harvest_config(seed_file, &data_dir, start_year, end_year, workers)?;
            let _guards = init_logging(&data_dir)?;
            tracing::info!(
                years = ?config.years,
                workers = config.workers,
                data_dir = %data_dir.display(),
                "Starting harvest"
            );

            let factory = browser_factory(&session)?;
            let cancel = CancellationToken::new();
            let _shutdown = setup_shutdown_handler(cancel.clone());

            let summary = run_harvest(&config, factory, cancel).await?;
            check_failures(&summary)
        }

        Commands::Download {
            inputs,
            output_dir,
            checkpoint_file,
            workers,
            format,
            no_print,
            session,
        } => {
            let config = build_download_config(
                inputs,
                output_dir,
                checkpoint_file,
                workers,
                format.into(),
                !no_print,
            )?;
            let _guards = init_logging(&config.output_dir)?;
            tracing::info!(
                files = config.inputs.len(),
                workers = config.workers,
                format = config.format.extension(),
                "Starting download"
            );

            let factory = browser_factory(&session)?;
            let cancel = CancellationToken::new();
            let _shutdown = setup_shutdown_handler(cancel.clone());

            let summary = run_download(&config, factory, cancel).await;
            check_failures(&summary)
        }

        Commands::Dedup { files } => {
            let _guards = init_logging(Path::new(Config::DATA_DIR))?;
            let reports = dedup::dedup_files(&files);
            let failed = files.len() - reports.len();
            if failed > 0 {
                return Err(MainError::DedupFailed(failed));
            }
            Ok(())
        }
    }
}
