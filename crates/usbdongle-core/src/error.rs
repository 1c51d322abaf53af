//! Error types for USB dongle control.

use thiserror::Error;

use crate::feature::FeatureKind;

/// Core error type shared by every dongle operation.
///
/// Transport-level failures from lower layers collapse into one of the
/// transport variants here, so callers can tell "no device" apart from
/// "device present but protocol error".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("No device attached or the device could not be opened")]
    TransportUnavailable,

    #[error("Transport I/O error: {0}")]
    TransportIo(String),

    #[error("Timed out waiting for a device response")]
    Timeout,

    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("Unsupported USB dongle")]
    UnsupportedUsbDongle,

    #[error("{model} does not support {feature}")]
    UnsupportedFeature { model: &'static str, feature: FeatureKind },

    #[error("Value {value} is out of range for {feature}")]
    OutOfRange { feature: FeatureKind, value: i64 },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for dongle operations.
pub type Result<T> = std::result::Result<T, Error>;
