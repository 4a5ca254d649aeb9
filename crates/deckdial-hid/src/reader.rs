//! Interrupt report reads.

use std::time::Duration;

use deckdial_core::MAX_REPORT_LEN;

use crate::device::{DeviceHandle, UsbBackend};

/// Result of one read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome<'a> {
    /// Bytes actually received, possibly fewer than requested
    Data(&'a [u8]),
    /// Nothing arrived in time; normal while idle
    Timeout,
    /// Transfer failed but the device is still there
    TransientError(rusb::Error),
    /// Device or interface is no longer present
    DeviceGone(rusb::Error),
}

impl ReadOutcome<'_> {
    /// Map a libusb transfer error onto an outcome.
    #[must_use]
    pub fn from_error(err: rusb::Error) -> ReadOutcome<'static> {
        match err {
            rusb::Error::Timeout => ReadOutcome::Timeout,
            rusb::Error::NoDevice | rusb::Error::NotFound => ReadOutcome::DeviceGone(err),
            other => ReadOutcome::TransientError(other),
        }
    }
}

/// Reads reports into a reusable buffer.
///
/// A returned report borrows the buffer, so it lives until the next read.
pub struct ReportReader {
    buf: Box<[u8]>,
}

impl ReportReader {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: vec![0; MAX_REPORT_LEN].into_boxed_slice() }
    }

    /// Issue exactly one interrupt transfer of up to [`MAX_REPORT_LEN`] bytes.
    pub fn read<B: UsbBackend>(
        &mut self,
        handle: &DeviceHandle<B>,
        endpoint: u8,
        timeout: Duration,
    ) -> ReadOutcome<'_> {
        match handle.read_interrupt(endpoint, &mut self.buf, timeout) {
            Ok(len) => ReadOutcome::Data(&self.buf[..len.min(self.buf.len())]),
            Err(e) => ReadOutcome::from_error(e),
        }
    }
}

impl Default for ReportReader {
    fn default() -> Self {
        Self::new()
    }
}
