//! Signal handling for graceful shutdown.

use anyhow::{Context, Result};
use deckdial_hid::Shutdown;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

/// Trigger `shutdown` on the first SIGTERM or SIGINT (Ctrl+C).
///
/// The polling thread notices the request between reads and releases the
/// interface before it exits.
pub fn spawn_signal_listener(shutdown: Shutdown) -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = terminate.recv() => info!("Received SIGTERM"),
            _ = interrupt.recv() => info!("Received SIGINT"),
        }
        shutdown.trigger();
    });

    Ok(())
}
