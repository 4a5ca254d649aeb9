//! Deckdial HID - Stream Deck Plus report polling.
//!
//! This crate owns the USB side: claiming the control interface, reading
//! interrupt reports, and keeping the claim alive across unplugs and kernel
//! driver rebinds.
//!
//! **Note**: Reports are read from the raw interrupt endpoint through libusb,
//! not through hidraw, so the kernel HID driver is detached while we hold the
//! interface.

pub mod backoff;
pub mod device;
pub mod error;
pub mod poller;
pub mod reader;
pub mod shutdown;

#[cfg(test)]
mod testing;

pub use backoff::Backoff;
pub use device::{ClaimedInterface, DeviceHandle, DeviceId, RusbBackend, UsbBackend};
pub use error::{HidError, HidResult};
pub use poller::{LoopStats, PollConfig, ResilienceLoop};
pub use reader::{ReadOutcome, ReportReader};
pub use shutdown::Shutdown;
