//! Gesture queue and the worker that acts on it.

use std::sync::Arc;
use std::time::Duration;

use deckdial_core::{DispatchError, Gesture, GestureSink};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::bindings::{Action, Bindings};
use crate::error::{MixerError, MixerResult};
use crate::volume::VolumeControl;

/// Applies gestures to the shared volume service.
pub struct Actuator {
    volume: Arc<dyn VolumeControl>,
    bindings: Bindings,
    /// Longest a single backend call may take before it is abandoned
    grace: Duration,
}

impl Actuator {
    #[must_use]
    pub fn new(volume: Arc<dyn VolumeControl>, bindings: Bindings, grace: Duration) -> Self {
        Self { volume, bindings, grace }
    }

    /// Carry out the action bound to `gesture`.
    ///
    /// # Errors
    /// Returns an error if the backend fails or exceeds the grace period.
    pub async fn handle(&self, gesture: Gesture) -> MixerResult<()> {
        match self.bindings.action_for(gesture) {
            Action::AdjustVolume(delta) => {
                let volume = self.call(move |v| v.apply(delta)).await?;
                info!(%gesture, volume_percent = (volume * 100.0).round() as u32, "Volume changed");
            }
            Action::ToggleMute => {
                let muted = self.call(|v| v.toggle_mute()).await?;
                info!(%gesture, muted, "Mute toggled");
            }
            Action::Log(gesture) => info!(%gesture, "Gesture"),
            Action::Unbound(gesture) => debug!(%gesture, "No binding for gesture"),
        }
        Ok(())
    }

    /// Run a blocking backend call off the runtime, bounded by the grace period.
    async fn call<T, F>(&self, f: F) -> MixerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VolumeControl) -> MixerResult<T> + Send + 'static,
    {
        let volume = Arc::clone(&self.volume);
        let task = tokio::task::spawn_blocking(move || f(volume.as_ref()));

        match tokio::time::timeout(self.grace, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(MixerError::TaskFailed(e.to_string())),
            Err(_) => Err(MixerError::Timeout(self.grace)),
        }
    }
}

/// Create the polling-side sender and the runtime-side worker.
#[must_use]
pub fn queue(actuator: Actuator, depth: usize) -> (QueueDispatch, ActuatorWorker) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (QueueDispatch { tx }, ActuatorWorker { actuator, rx })
}

/// Non-blocking gesture sender used by the polling loop.
#[derive(Clone)]
pub struct QueueDispatch {
    tx: mpsc::Sender<Gesture>,
}

impl GestureSink for QueueDispatch {
    fn dispatch(&self, gesture: Gesture) -> Result<(), DispatchError> {
        self.tx.try_send(gesture).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Drains the gesture queue on the async runtime.
pub struct ActuatorWorker {
    actuator: Actuator,
    rx: mpsc::Receiver<Gesture>,
}

impl ActuatorWorker {
    /// Handle gestures until every [`QueueDispatch`] is dropped.
    ///
    /// Returns the number of gestures that were applied successfully.
    pub async fn run(mut self) -> u64 {
        let mut applied = 0;

        while let Some(gesture) = self.rx.recv().await {
            match self.actuator.handle(gesture).await {
                Ok(()) => applied += 1,
                Err(e) => warn!(%gesture, error = %e, "Failed to apply gesture"),
            }
        }

        debug!(applied, "Actuator worker stopped");
        applied
    }
}
