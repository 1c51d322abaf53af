//! HID error types.

use thiserror::Error;
use usbdongle_core::Error;

/// HID error type.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Permission denied - check udev rules")]
    PermissionDenied,

    #[error("USB error: {0}")]
    UsbError(#[from] rusb::Error),

    #[error("Short write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },
}

/// Result type for HID operations.
pub type HidResult<T> = Result<T, HidError>;

impl From<HidError> for Error {
    fn from(error: HidError) -> Self {
        match error {
            HidError::DeviceNotFound | HidError::PermissionDenied => Self::TransportUnavailable,
            HidError::UsbError(rusb::Error::Timeout) => Self::Timeout,
            HidError::UsbError(rusb::Error::NoDevice) => Self::TransportUnavailable,
            other => Self::TransportIo(other.to_string()),
        }
    }
}
