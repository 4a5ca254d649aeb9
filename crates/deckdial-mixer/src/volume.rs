//! Shared volume service interface.

use crate::error::MixerResult;

/// Control over one output sink.
///
/// A single instance is shared by every knob binding.
#[cfg_attr(test, mockall::automock)]
pub trait VolumeControl: Send + Sync {
    /// Current volume, 0.0 - 1.0.
    ///
    /// # Errors
    /// Returns an error if the sink cannot be queried.
    fn current(&self) -> MixerResult<f64>;

    /// Move the volume by `delta` steps and return the new level.
    ///
    /// # Errors
    /// Returns an error if the sink cannot be queried or updated.
    fn apply(&self, delta: i32) -> MixerResult<f64>;

    /// Flip the mute state and return whether the sink is now muted.
    ///
    /// # Errors
    /// Returns an error if the sink cannot be updated.
    fn toggle_mute(&self) -> MixerResult<bool>;
}

/// Volume after `delta` steps of size `step`, clamped to 0.0 - 1.0.
#[must_use]
pub fn stepped_volume(current: f64, delta: i32, step: f64) -> f64 {
    (current + f64::from(delta) * step).clamp(0.0, 1.0)
}
