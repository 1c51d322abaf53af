//! USB Dongle Core - Feature values, device families, snapshots and profiles.
//!
//! This crate holds the device model shared by the transport, the profile
//! store and the daemon. Nothing in here performs I/O.

pub mod dongle;
pub mod error;
pub mod family;
pub mod feature;
pub mod profile;
pub mod store;
pub mod volume;

pub use dongle::{
    FiioKa5, FiioKa5OtherState, MoondropDawn, MoondropDawnState, Telemetry, UnsupportedUsbDongle,
    UsbDongle,
};
pub use error::{Error, Result};
pub use family::{Capabilities, DongleFamily};
pub use feature::{
    ChannelBalance, DacMode, DisplayBrightness, DisplayInvert, DisplayTimeout, FeatureKind,
    FeatureValue, Filter, FirmwareVersion, Gain, HardwareMute, HidMode, IndicatorState,
    SampleRate, SpdifOut,
};
pub use profile::Profile;
pub use store::ProfileStore;
pub use volume::{HardwareVolumeControl, VolumeLevel, VolumeMode, VolumeRange};
