//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use deckdial_core::{Gesture, MatchMode, Signature, SignatureTable};
use deckdial_hid::{Backoff, DeviceId, PollConfig};
use deckdial_mixer::pactl::DEFAULT_SINK;
use deckdial_mixer::{Bindings, ButtonBinding, KnobBinding};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable pointing at an alternative config file.
const CONFIG_ENV: &str = "DECKDIAL_CONFIG";

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// USB device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Read timing
    #[serde(default)]
    pub polling: PollingConfig,
    /// Reconnect backoff
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Report signatures
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Sink and bindings
    #[serde(default)]
    pub mixer: MixerConfig,
}

/// Device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// USB Vendor ID
    #[serde(default = "default_vid")]
    pub vendor_id: String,
    /// USB Product ID
    #[serde(default = "default_pid")]
    pub product_id: String,
    /// Interface carrying the knob reports
    #[serde(default)]
    pub interface: u8,
    /// Interrupt IN endpoint address
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Give the interface back to the kernel driver on exit
    #[serde(default = "default_true")]
    pub reattach_kernel_driver: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vid(),
            product_id: default_pid(),
            interface: 0,
            endpoint: default_endpoint(),
            reattach_kernel_driver: true,
        }
    }
}

impl DeviceConfig {
    /// Resolve the hex strings into a device address.
    pub fn device_id(&self) -> Result<DeviceId> {
        Ok(DeviceId {
            vendor_id: parse_hex_u16(&self.vendor_id).context("Invalid device.vendor_id")?,
            product_id: parse_hex_u16(&self.product_id).context("Invalid device.product_id")?,
            interface: self.interface,
            endpoint: u8::try_from(parse_hex_u16(&self.endpoint).context("Invalid device.endpoint")?)
                .context("device.endpoint must fit in one byte")?,
        })
    }
}

fn default_vid() -> String {
    "0fd9".to_string()
}

fn default_pid() -> String {
    "0084".to_string()
}

fn default_endpoint() -> String {
    "81".to_string()
}

fn default_true() -> bool {
    true
}

fn parse_hex_u16(text: &str) -> Result<u16> {
    let digits = text.trim().trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).with_context(|| format!("{text:?} is not a hex number"))
}

/// Read timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interrupt read timeout
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Pause after each read, for rate limiting
    #[serde(default)]
    pub pace_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { read_timeout_ms: default_read_timeout_ms(), pace_ms: 0 }
    }
}

fn default_read_timeout_ms() -> u64 {
    200
}

/// Reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Failed attempts before the device is reported as persistently gone
    #[serde(default = "default_ceiling")]
    pub ceiling: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            ceiling: default_ceiling(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_ceiling() -> u32 {
    10
}

/// Report signature settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// `prefix` or `contains`
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Start from the captured Stream Deck Plus signatures
    #[serde(default = "default_true")]
    pub builtin_signatures: bool,
    /// Extra signatures, checked after the built-in ones
    #[serde(default)]
    pub signatures: Vec<SignatureConfig>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { match_mode: MatchMode::default(), builtin_signatures: true, signatures: Vec::new() }
    }
}

/// One configured signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Hex bytes, e.g. `"01 03 05 00 01 01"`
    pub bytes: String,
    pub gesture: Gesture,
}

impl ClassifierConfig {
    /// Build the ordered signature table.
    pub fn signature_table(&self) -> Result<SignatureTable> {
        let mut signatures = if self.builtin_signatures {
            SignatureTable::builtin(self.match_mode).signatures().to_vec()
        } else {
            Vec::new()
        };

        for entry in &self.signatures {
            let signature = Signature::parse(&entry.bytes, entry.gesture)
                .with_context(|| format!("Invalid signature {:?}", entry.bytes))?;
            signatures.push(signature);
        }

        if signatures.is_empty() {
            bail!("No report signatures configured");
        }

        SignatureTable::new(self.match_mode, signatures).context("Invalid signature table")
    }
}

/// Sink and binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerConfig {
    /// pactl sink name
    #[serde(default = "default_sink")]
    pub sink: String,
    /// Volume change per click (0.01 = 1%)
    #[serde(default = "default_step")]
    pub step: f64,
    /// Longest a single sink command may take
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Gestures buffered between the polling thread and the sink
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    #[serde(default = "default_knobs")]
    pub knobs: Vec<KnobBinding>,
    #[serde(default = "default_buttons")]
    pub buttons: Vec<ButtonBinding>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            step: default_step(),
            command_timeout_ms: default_command_timeout_ms(),
            queue_depth: default_queue_depth(),
            knobs: default_knobs(),
            buttons: default_buttons(),
        }
    }
}

impl MixerConfig {
    #[must_use]
    pub fn bindings(&self) -> Bindings {
        Bindings::new(self.knobs.clone(), self.buttons.clone())
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn default_sink() -> String {
    DEFAULT_SINK.to_string()
}

fn default_step() -> f64 {
    0.01
}

fn default_command_timeout_ms() -> u64 {
    500
}

fn default_queue_depth() -> usize {
    32
}

fn default_knobs() -> Vec<KnobBinding> {
    Bindings::builtin().knobs
}

fn default_buttons() -> Vec<ButtonBinding> {
    Bindings::builtin().buttons
}

impl Config {
    /// Loop timing derived from `[polling]` and `[reconnect]`.
    #[must_use]
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            read_timeout: Duration::from_millis(self.polling.read_timeout_ms),
            pace: Duration::from_millis(self.polling.pace_ms),
            backoff: Backoff {
                initial: Duration::from_millis(self.reconnect.initial_delay_ms),
                max: Duration::from_millis(self.reconnect.max_delay_ms),
                ceiling: self.reconnect.ceiling,
            },
        }
    }

    /// Reject settings that would make the daemon misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.polling.read_timeout_ms == 0 {
            bail!("polling.read_timeout_ms must be greater than zero");
        }
        if self.mixer.step.is_nan() || self.mixer.step <= 0.0 || self.mixer.step > 1.0 {
            bail!("mixer.step must be in (0, 1], got {}", self.mixer.step);
        }
        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            bail!("reconnect.initial_delay_ms must not exceed reconnect.max_delay_ms");
        }
        Ok(())
    }
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => config_path()?,
    };
    load_from(&config_path)
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_from(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {path:?}"))?
    } else {
        info!(config_path = ?path, "Config file not found, using defaults");
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "deckdial", "Deckdial")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
