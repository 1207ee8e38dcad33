/// Logging setup: daily-rotated text and JSON files plus a compact stdout layer.
///
/// Filtering comes from `RUST_LOG` and defaults to `info`, e.g.
/// `RUST_LOG=judgment_harvester=debug,reqwest=warn`.
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const TEXT_LOG_FILE: &str = "harvest.log";
pub const JSON_LOG_FILE: &str = "harvest.json.log";

/// Keeps the background log writers alive; drop it only at process exit so
/// buffered lines are flushed.
#[must_use = "dropping the guards stops file logging"]
pub struct LogGuards {
    _text: WorkerGuard,
    _json: WorkerGuard,
}

/// Install the global subscriber writing into `log_dir`.
///
/// Fails if the directory cannot be created or a subscriber is already set.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<LogGuards, Box<dyn std::error::Error>> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (text_writer, text_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_path, TEXT_LOG_FILE));
    let (json_writer, json_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_path, JSON_LOG_FILE));

    let text_layer = fmt::layer()
        .with_writer(text_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter.clone());

    let json_layer = fmt::layer()
        .json()
        .with_writer(json_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(env_filter.clone());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(stdout_layer)
        .try_init()?;

    tracing::info!(log_dir = %log_path.display(), "Logging initialized");

    Ok(LogGuards {
        _text: text_guard,
        _json: json_guard,
    })
}

/// `init_logging` into `<data_dir>/logs`.
pub fn init_logging_in_data_dir<P: AsRef<Path>>(
    data_dir: P,
) -> Result<LogGuards, Box<dyn std::error::Error>> {
    init_logging(data_dir.as_ref().join("logs"))
}
