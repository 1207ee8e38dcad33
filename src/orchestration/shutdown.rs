//! Ctrl+C handling.

use tokio_util::sync::CancellationToken;

/// First Ctrl+C stops dispatch; running partitions finish their current unit
/// and persist it. Second Ctrl+C exits immediately.
pub fn setup_shutdown_handler(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Cannot listen for Ctrl+C, graceful shutdown unavailable");
            return;
        }

        tracing::warn!("Received Ctrl+C, finishing in-flight units. Press Ctrl+C again to force quit");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Force quit requested, exiting immediately");
            std::process::exit(1);
        }
    })
}
