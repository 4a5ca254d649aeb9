//! HID error types.

use thiserror::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Device not found: {vendor_id:04x}:{product_id:04x}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Permission denied - check udev rules")]
    PermissionDenied,

    #[error("Interface {0} is claimed by another process")]
    InterfaceBusy(u8),

    #[error("USB error: {0}")]
    UsbError(#[from] rusb::Error),
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;
