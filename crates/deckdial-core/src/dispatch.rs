//! Boundary between the polling loop and whatever acts on gestures.

use thiserror::Error;

use crate::gesture::Gesture;
use crate::state::ResilienceState;

/// Why a gesture could not be handed off.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Dispatch queue full, gesture dropped")]
    QueueFull,

    #[error("Dispatch receiver closed")]
    Closed,

    #[error("Dispatch failed: {0}")]
    Failed(String),
}

/// Receiver of classified gestures.
///
/// Called from the polling thread between reads, so implementations must
/// return promptly and never wait on the actuator.
pub trait GestureSink: Send {
    /// Hand off one gesture.
    ///
    /// # Errors
    /// Returns an error if the gesture was not accepted. The caller logs it
    /// and keeps polling.
    fn dispatch(&self, gesture: Gesture) -> Result<(), DispatchError>;

    /// Notified when the device link changes phase.
    fn link_state(&self, _state: &ResilienceState) {}
}
