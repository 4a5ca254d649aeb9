//! Deckdial Daemon - Stream Deck Plus knob volume control.
//!
//! Claims the Stream Deck Plus control interface, turns knob and button
//! reports into gestures, and applies them to the audio sink until SIGINT or
//! SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use deckdial_hid::{DeviceHandle, ResilienceLoop, RusbBackend, Shutdown};
use deckdial_mixer::{Actuator, PactlSink, VolumeControl};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod signals;

/// How long queued gestures may keep the process alive after polling stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Deckdial");

    // Load configuration
    let config = config::load_config()?;
    let device_id = config.device.device_id()?;
    let signatures = config.classifier.signature_table()?;
    info!(device = %device_id, signatures = signatures.len(), "Configuration loaded");

    // The first claim is the only one allowed to fail the process
    let backend = RusbBackend::new(config.device.reattach_kernel_driver);
    let handle = DeviceHandle::open_and_claim(backend, device_id)
        .with_context(|| format!("Could not open control surface {device_id}"))?;

    // One volume service shared by every knob
    let volume: Arc<dyn VolumeControl> =
        Arc::new(PactlSink::new(config.mixer.sink.clone(), config.mixer.step));
    let actuator = Actuator::new(volume, config.mixer.bindings(), config.mixer.command_timeout());
    let (dispatch, worker) = deckdial_mixer::queue(actuator, config.mixer.queue_depth);
    let worker_handle = tokio::spawn(worker.run());

    // Set up signal handling
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone())?;

    let poller = ResilienceLoop::new(handle, signatures, dispatch, config.poll_config(), shutdown);

    info!("Daemon running. Press Ctrl+C to exit.");
    let stats = tokio::task::spawn_blocking(move || poller.run())
        .await
        .context("Polling thread panicked")?;

    info!(
        reports = stats.reports,
        gestures = stats.gestures,
        transient_errors = stats.transient_errors,
        reconnects = stats.reconnects,
        dispatch_failures = stats.dispatch_failures,
        "Polling finished"
    );

    // The dispatcher went away with the loop, so the worker only has the backlog left
    match tokio::time::timeout(DRAIN_TIMEOUT, worker_handle).await {
        Ok(Ok(applied)) => info!(applied, "Actuator drained"),
        Ok(Err(e)) => warn!(error = %e, "Actuator worker failed"),
        Err(_) => warn!("Actuator did not drain in time, exiting anyway"),
    }

    info!("Daemon stopped");
    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG`. Set `DECKDIAL_LOG_JSON` for JSON lines.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("deckdial=info".parse()?)
        .add_directive("deckdial_daemon=debug".parse()?)
        .add_directive("deckdial_hid=debug".parse()?);

    if std::env::var_os("DECKDIAL_LOG_JSON").is_some() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}
