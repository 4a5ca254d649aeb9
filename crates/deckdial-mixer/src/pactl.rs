//! `pactl` sink control.
//!
//! Talks to PulseAudio (or pipewire-pulse) through the `pactl` command line
//! tool, the same way the sink would be adjusted by hand.

use tracing::{debug, warn};

use crate::error::{MixerError, MixerResult};
use crate::volume::{VolumeControl, stepped_volume};

/// Sink name that follows the server's default output.
pub const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

/// Volume control for one sink via `pactl`.
pub struct PactlSink {
    sink: String,
    step: f64,
}

impl PactlSink {
    /// Create a control for `sink`, moving `step` (0.0 - 1.0) per click.
    #[must_use]
    pub fn new(sink: String, step: f64) -> Self {
        Self { sink, step }
    }

    #[must_use]
    pub fn sink(&self) -> &str {
        &self.sink
    }

    fn pactl(&self, args: &[&str]) -> MixerResult<String> {
        let output = std::process::Command::new("pactl").args(args).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MixerError::CommandFailed(format!("{} {}: {}", args[0], self.sink, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn set_volume(&self, volume: f64) -> MixerResult<()> {
        let volume_percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        self.pactl(&["set-sink-volume", &self.sink, &format!("{volume_percent}%")])?;
        debug!(sink = %self.sink, volume_percent, "Sink volume set");
        Ok(())
    }
}

impl VolumeControl for PactlSink {
    fn current(&self) -> MixerResult<f64> {
        let stdout = self.pactl(&["get-sink-volume", &self.sink])?;
        parse_volume(&stdout)
    }

    fn apply(&self, delta: i32) -> MixerResult<f64> {
        let volume = stepped_volume(self.current()?, delta, self.step);
        self.set_volume(volume)?;
        Ok(volume)
    }

    fn toggle_mute(&self) -> MixerResult<bool> {
        self.pactl(&["set-sink-mute", &self.sink, "toggle"])?;
        let stdout = self.pactl(&["get-sink-mute", &self.sink])?;
        parse_mute(&stdout)
    }
}

/// Parse the first channel's percentage from `pactl get-sink-volume` output:
///
/// ```text
/// Volume: front-left: 32768 /  50% / -18.06 dB,   front-right: 32768 /  50% / -18.06 dB
/// ```
fn parse_volume(stdout: &str) -> MixerResult<f64> {
    for part in stdout.split_whitespace() {
        if let Some(percent_str) = part.strip_suffix('%')
            && let Ok(percent) = percent_str.parse::<u32>()
        {
            return Ok(f64::from(percent) / 100.0);
        }
    }

    warn!("Could not parse pactl volume output");
    Err(MixerError::ParseError(stdout.trim().to_string()))
}

/// Parse `Mute: yes` / `Mute: no`.
fn parse_mute(stdout: &str) -> MixerResult<bool> {
    match stdout.trim().strip_prefix("Mute:").map(str::trim) {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        _ => Err(MixerError::ParseError(stdout.trim().to_string())),
    }
}
