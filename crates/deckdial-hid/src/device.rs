//! Stream Deck Plus interface claim.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{HidError, HidResult};

/// Elgato USB Vendor ID
pub const ELGATO_VID: u16 = 0x0fd9;
/// Stream Deck Plus USB Product ID
pub const STREAM_DECK_PLUS_PID: u16 = 0x0084;
/// Interface carrying knob and button reports
pub const CONTROL_INTERFACE: u8 = 0;
/// Interrupt IN endpoint of the control interface
pub const REPORT_ENDPOINT: u8 = 0x81;

/// The device exposes a single configuration.
const SOLE_CONFIGURATION: u8 = 1;

/// Where to find the control surface on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    pub endpoint: u8,
}

impl Default for DeviceId {
    fn default() -> Self {
        Self {
            vendor_id: ELGATO_VID,
            product_id: STREAM_DECK_PLUS_PID,
            interface: CONTROL_INTERFACE,
            endpoint: REPORT_ENDPOINT,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} interface {} endpoint {:#04x}",
            self.vendor_id, self.product_id, self.interface, self.endpoint
        )
    }
}

/// A claimed USB interface that can be read from.
pub trait ClaimedInterface: Send {
    /// One interrupt transfer into `buf`, bounded by `timeout`.
    ///
    /// # Errors
    /// Returns the libusb error for the failed transfer.
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;

    /// Give the interface back.
    ///
    /// # Errors
    /// Returns the libusb error if the release itself failed.
    fn release(&mut self) -> rusb::Result<()>;
}

/// Something that can locate a device and claim one of its interfaces.
pub trait UsbBackend: Send {
    type Interface: ClaimedInterface;

    /// Locate the device, take it from the kernel driver, and claim the interface.
    ///
    /// # Errors
    /// Returns [`HidError::DeviceNotFound`] if no matching device is attached.
    fn open_and_claim(&self, id: &DeviceId) -> HidResult<Self::Interface>;
}

/// Exclusive ownership of the control interface claim.
///
/// The claim is released on [`DeviceHandle::release`], before every
/// [`DeviceHandle::reopen`], and when the handle is dropped.
pub struct DeviceHandle<B: UsbBackend> {
    backend: B,
    id: DeviceId,
    claim: Option<B::Interface>,
}

impl<B: UsbBackend> DeviceHandle<B> {
    /// Open the device and claim its interface.
    ///
    /// # Errors
    /// Returns an error if the device is absent or the claim fails.
    pub fn open_and_claim(backend: B, id: DeviceId) -> HidResult<Self> {
        let claim = backend.open_and_claim(&id)?;
        Ok(Self { backend, id, claim: Some(claim) })
    }

    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Whether the interface is currently claimed.
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }

    /// Release the claim. Failures are logged and ignored; calling this on a
    /// released handle does nothing.
    pub fn release(&mut self) {
        let Some(mut claim) = self.claim.take() else {
            return;
        };

        match claim.release() {
            Ok(()) => debug!(device = %self.id, "Interface released"),
            Err(e) => debug!(device = %self.id, error = %e, "Interface release failed, ignoring"),
        }
    }

    /// Release the current claim and claim the interface again from scratch.
    ///
    /// # Errors
    /// Returns an error if the device cannot be found or claimed. The handle
    /// is left released in that case.
    pub fn reopen(&mut self) -> HidResult<()> {
        self.release();
        let claim = self.backend.open_and_claim(&self.id)?;
        self.claim = Some(claim);
        Ok(())
    }

    /// Read one interrupt report. An unclaimed handle reads as "no device".
    ///
    /// # Errors
    /// Returns the libusb error for the failed transfer.
    pub fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        match &self.claim {
            Some(claim) => claim.read_interrupt(endpoint, buf, timeout),
            None => Err(rusb::Error::NoDevice),
        }
    }
}

impl<B: UsbBackend> Drop for DeviceHandle<B> {
    fn drop(&mut self) {
        self.release();
    }
}

/// libusb-backed transport.
#[derive(Debug, Clone, Copy)]
pub struct RusbBackend {
    /// Hand the interface back to the kernel driver on release
    reattach_kernel_driver: bool,
}

impl RusbBackend {
    #[must_use]
    pub fn new(reattach_kernel_driver: bool) -> Self {
        Self { reattach_kernel_driver }
    }

    fn find_device(id: &DeviceId) -> HidResult<rusb::Device<rusb::GlobalContext>> {
        let devices = rusb::devices()?;

        for device in devices.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };

            if desc.vendor_id() == id.vendor_id && desc.product_id() == id.product_id {
                debug!(bus = device.bus_number(), address = device.address(), "Found device");
                return Ok(device);
            }
        }

        Err(HidError::DeviceNotFound { vendor_id: id.vendor_id, product_id: id.product_id })
    }
}

impl Default for RusbBackend {
    fn default() -> Self {
        Self::new(true)
    }
}

impl UsbBackend for RusbBackend {
    type Interface = RusbInterface;

    fn open_and_claim(&self, id: &DeviceId) -> HidResult<RusbInterface> {
        let device = Self::find_device(id)?;
        let mut handle = device.open().map_err(|e| open_error(e, id))?;

        let detached = detach_kernel_driver(&mut handle, id.interface);

        match handle.active_configuration() {
            Ok(SOLE_CONFIGURATION) => {}
            _ => handle.set_active_configuration(SOLE_CONFIGURATION).map_err(|e| open_error(e, id))?,
        }

        handle.claim_interface(id.interface).map_err(|e| match e {
            rusb::Error::Busy => HidError::InterfaceBusy(id.interface),
            other => open_error(other, id),
        })?;

        info!(
            device = %id,
            bus = device.bus_number(),
            address = device.address(),
            kernel_driver_detached = detached,
            "Interface claimed"
        );

        Ok(RusbInterface {
            handle,
            interface: id.interface,
            reattach: self.reattach_kernel_driver && detached,
        })
    }
}

/// Detach whatever kernel driver is bound to `interface`.
///
/// Returns whether a driver was actually detached. "No driver active" is
/// success; other failures are logged and left for the claim to report.
fn detach_kernel_driver<T: rusb::UsbContext>(handle: &mut rusb::DeviceHandle<T>, interface: u8) -> bool {
    match handle.kernel_driver_active(interface) {
        Ok(true) => {}
        Ok(false) | Err(rusb::Error::NotSupported) => return false,
        Err(e) => {
            debug!(interface, error = %e, "Could not query kernel driver state");
            return false;
        }
    }

    info!(interface, "Kernel driver active - detaching");
    match handle.detach_kernel_driver(interface) {
        Ok(()) => true,
        Err(rusb::Error::NotFound) => false,
        Err(e) => {
            warn!(interface, error = %e, "Could not detach kernel driver");
            false
        }
    }
}

fn open_error(err: rusb::Error, id: &DeviceId) -> HidError {
    match err {
        rusb::Error::Access => HidError::PermissionDenied,
        rusb::Error::NoDevice | rusb::Error::NotFound => {
            HidError::DeviceNotFound { vendor_id: id.vendor_id, product_id: id.product_id }
        }
        other => HidError::UsbError(other),
    }
}

/// Interface claimed through libusb.
pub struct RusbInterface {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
    interface: u8,
    reattach: bool,
}

impl ClaimedInterface for RusbInterface {
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.read_interrupt(endpoint, buf, timeout)
    }

    fn release(&mut self) -> rusb::Result<()> {
        let result = self.handle.release_interface(self.interface);

        if self.reattach {
            self.reattach = false;
            if let Err(e) = self.handle.attach_kernel_driver(self.interface) {
                debug!(interface = self.interface, error = %e, "Could not re-attach kernel driver");
            }
        }

        result
    }
}
