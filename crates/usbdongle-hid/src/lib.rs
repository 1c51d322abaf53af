//! USB Dongle HID - Command codec, transport and device orchestration.
//!
//! Reports are exchanged with the dongle over its HID interrupt endpoints.
//! The codec and the orchestration logic only depend on the [`Transport`]
//! trait; [`UsbTransport`] is the rusb-backed implementation.

pub mod codec;
pub mod command;
pub mod detect;
pub mod error;
pub mod profile;
pub mod repository;
pub mod transport;
pub mod usb;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::{REPORT_LENGTH, Report, decode_telemetry, encode_get, encode_set};
pub use command::{Command, GetCommand, Opcode};
pub use detect::{find_dongles, find_first_dongle};
pub use error::{HidError, HidResult};
pub use profile::ApplyError;
pub use repository::{DEFAULT_RECEIVE_TIMEOUT, DongleRepository};
pub use transport::{DeviceDescriptor, Session, Transport};
pub use usb::{UsbConfig, UsbTransport};
pub use worker::DongleWorker;
