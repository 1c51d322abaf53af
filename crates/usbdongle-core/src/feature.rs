//! Bounded feature values.
//!
//! Every type here is self-validating: scalar values are clamped into their
//! declared range at construction, and enumerated values are only produced
//! from a known id. A feature value therefore can never hold something the
//! hardware would reject.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::volume::{VolumeLevel, VolumeMode};

/// Identifies a controllable or readable device attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    ChannelBalance,
    DacMode,
    DisplayBrightness,
    DisplayInvert,
    DisplayTimeout,
    Filter,
    FirmwareVersion,
    Gain,
    HardwareMute,
    HidMode,
    IndicatorState,
    SampleRate,
    SpdifOut,
    VolumeLevel,
    VolumeMode,
}

impl FeatureKind {
    /// Human-readable feature name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ChannelBalance => "channel balance",
            Self::DacMode => "DAC mode",
            Self::DisplayBrightness => "display brightness",
            Self::DisplayInvert => "display invert",
            Self::DisplayTimeout => "display timeout",
            Self::Filter => "filter",
            Self::FirmwareVersion => "firmware version",
            Self::Gain => "gain",
            Self::HardwareMute => "hardware mute",
            Self::HidMode => "HID mode",
            Self::IndicatorState => "indicator state",
            Self::SampleRate => "sample rate",
            Self::SpdifOut => "SPDIF out",
            Self::VolumeLevel => "volume level",
            Self::VolumeMode => "volume mode",
        }
    }

    /// Whether the feature can be written, as opposed to telemetry only.
    #[must_use]
    pub fn is_settable(self) -> bool {
        !matches!(self, Self::FirmwareVersion | Self::SampleRate)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value for any settable feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "feature", content = "value")]
pub enum FeatureValue {
    ChannelBalance(ChannelBalance),
    DacMode(DacMode),
    DisplayBrightness(DisplayBrightness),
    DisplayInvert(DisplayInvert),
    DisplayTimeout(DisplayTimeout),
    Filter(Filter),
    Gain(Gain),
    HardwareMute(HardwareMute),
    HidMode(HidMode),
    IndicatorState(IndicatorState),
    SpdifOut(SpdifOut),
    VolumeLevel(VolumeLevel),
    VolumeMode(VolumeMode),
}

impl FeatureValue {
    /// The feature this value targets.
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::ChannelBalance(_) => FeatureKind::ChannelBalance,
            Self::DacMode(_) => FeatureKind::DacMode,
            Self::DisplayBrightness(_) => FeatureKind::DisplayBrightness,
            Self::DisplayInvert(_) => FeatureKind::DisplayInvert,
            Self::DisplayTimeout(_) => FeatureKind::DisplayTimeout,
            Self::Filter(_) => FeatureKind::Filter,
            Self::Gain(_) => FeatureKind::Gain,
            Self::HardwareMute(_) => FeatureKind::HardwareMute,
            Self::HidMode(_) => FeatureKind::HidMode,
            Self::IndicatorState(_) => FeatureKind::IndicatorState,
            Self::SpdifOut(_) => FeatureKind::SpdifOut,
            Self::VolumeLevel(_) => FeatureKind::VolumeLevel,
            Self::VolumeMode(_) => FeatureKind::VolumeMode,
        }
    }

    /// The single payload byte this value is carried as on the wire.
    #[must_use]
    pub fn to_raw(&self) -> u8 {
        match self {
            Self::ChannelBalance(v) => v.value().to_le_bytes()[0],
            Self::DacMode(v) => v.id(),
            Self::DisplayBrightness(v) => v.value(),
            Self::DisplayInvert(v) => u8::from(v.is_enabled()),
            Self::DisplayTimeout(v) => v.value(),
            Self::Filter(v) => v.id(),
            Self::Gain(v) => v.id(),
            Self::HardwareMute(v) => u8::from(v.is_enabled()),
            Self::HidMode(v) => v.id(),
            Self::IndicatorState(v) => v.id(),
            Self::SpdifOut(v) => u8::from(v.is_enabled()),
            Self::VolumeLevel(v) => v.value(),
            Self::VolumeMode(v) => v.id(),
        }
    }
}

fn out_of_range(feature: FeatureKind, value: impl Into<i64>) -> Error {
    Error::OutOfRange { feature, value: value.into() }
}

/// Left/right channel balance. Negative values favour the left channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelBalance(i8);

impl ChannelBalance {
    pub const MIN: i8 = -12;
    pub const MAX: i8 = 12;

    /// Create a balance value, clamping into `MIN..=MAX`.
    #[must_use]
    pub fn new(value: i8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// Create a balance value, rejecting anything outside `MIN..=MAX`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfRange`] if the value is outside the valid range.
    pub fn try_new(value: i8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(out_of_range(FeatureKind::ChannelBalance, value))
        }
    }

    #[must_use]
    pub fn value(self) -> i8 {
        self.0
    }

    #[must_use]
    pub fn display_value(self) -> i32 {
        i32::from(self.0)
    }
}

impl Default for ChannelBalance {
    fn default() -> Self {
        Self(0)
    }
}

/// Display backlight brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayBrightness(u8);

impl DisplayBrightness {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 255;

    /// Create a brightness value, clamping into `MIN..=MAX`.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// # Errors
    /// Returns [`Error::OutOfRange`] if the value is below [`Self::MIN`].
    pub fn try_new(value: u8) -> Result<Self> {
        if value >= Self::MIN {
            Ok(Self(value))
        } else {
            Err(out_of_range(FeatureKind::DisplayBrightness, value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn display_value(self) -> i32 {
        i32::from(self.0)
    }
}

impl Default for DisplayBrightness {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Seconds of inactivity before the display turns off. Zero keeps it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayTimeout(u8);

impl DisplayTimeout {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 60;

    /// Create a timeout value, clamping into `MIN..=MAX`.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    /// # Errors
    /// Returns [`Error::OutOfRange`] if the value exceeds [`Self::MAX`].
    pub fn try_new(value: u8) -> Result<Self> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(out_of_range(FeatureKind::DisplayTimeout, value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn display_value(self) -> i32 {
        i32::from(self.0)
    }
}

impl Default for DisplayTimeout {
    fn default() -> Self {
        Self(30)
    }
}

/// On/off switches share one shape.
macro_rules! switch_feature {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
        pub struct $name(bool);

        impl $name {
            #[must_use]
            pub fn new(enabled: bool) -> Self {
                Self(enabled)
            }

            #[must_use]
            pub fn is_enabled(self) -> bool {
                self.0
            }

            #[must_use]
            pub fn toggled(self) -> Self {
                Self(!self.0)
            }
        }
    };
}

switch_feature!(
    /// Rotates the display contents by 180 degrees.
    DisplayInvert
);
switch_feature!(
    /// Mutes the analog output in hardware.
    HardwareMute
);
switch_feature!(
    /// Enables the coaxial SPDIF output.
    SpdifOut
);

/// Digital reconstruction filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    FastRollOffLowLatency,
    FastRollOffPhaseCompensated,
    SlowRollOffLowLatency,
    SlowRollOffPhaseCompensated,
    NonOversampling,
}

impl Filter {
    pub const ALL: [Self; 5] = [
        Self::FastRollOffLowLatency,
        Self::FastRollOffPhaseCompensated,
        Self::SlowRollOffLowLatency,
        Self::SlowRollOffPhaseCompensated,
        Self::NonOversampling,
    ];

    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or_else(|| out_of_range(FeatureKind::Filter, id))
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn display_value(self) -> &'static str {
        match self {
            Self::FastRollOffLowLatency => "Fast roll-off, low latency",
            Self::FastRollOffPhaseCompensated => "Fast roll-off, phase-compensated",
            Self::SlowRollOffLowLatency => "Slow roll-off, low latency",
            Self::SlowRollOffPhaseCompensated => "Slow roll-off, phase-compensated",
            Self::NonOversampling => "Non-oversampling",
        }
    }
}

/// Output gain stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gain {
    #[default]
    Low,
    High,
}

impl Gain {
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Low),
            1 => Ok(Self::High),
            _ => Err(out_of_range(FeatureKind::Gain, id)),
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn display_value(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::High => "High",
        }
    }
}

/// Amplifier operating class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DacMode {
    ClassH,
    #[default]
    ClassAB,
}

impl DacMode {
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::ClassH),
            1 => Ok(Self::ClassAB),
            _ => Err(out_of_range(FeatureKind::DacMode, id)),
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn display_value(self) -> &'static str {
        match self {
            Self::ClassH => "Class H",
            Self::ClassAB => "Class AB",
        }
    }
}

/// Mapping of the inline remote buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HidMode {
    #[default]
    A,
    B,
}

impl HidMode {
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::A),
            1 => Ok(Self::B),
            _ => Err(out_of_range(FeatureKind::HidMode, id)),
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn display_value(self) -> &'static str {
        match self {
            Self::A => "Mode A",
            Self::B => "Mode B",
        }
    }
}

/// Status LED behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    #[default]
    Enabled,
    DisabledTemporarily,
    Disabled,
}

impl IndicatorState {
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Enabled),
            1 => Ok(Self::DisabledTemporarily),
            2 => Ok(Self::Disabled),
            _ => Err(out_of_range(FeatureKind::IndicatorState, id)),
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn display_value(self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::DisabledTemporarily => "Disabled (until replug)",
            Self::Disabled => "Disabled",
        }
    }
}

/// Sample rate of the current playback stream, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SampleRate(u32);

impl SampleRate {
    /// Rates in device id order.
    const RATES_HZ: [u32; 10] =
        [44_100, 48_000, 88_200, 96_000, 176_400, 192_000, 352_800, 384_000, 705_600, 768_000];

    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        Self::RATES_HZ
            .get(usize::from(id))
            .map(|&hz| Self(hz))
            .ok_or_else(|| out_of_range(FeatureKind::SampleRate, id))
    }

    #[must_use]
    pub fn id(self) -> u8 {
        Self::RATES_HZ
            .iter()
            .position(|&hz| hz == self.0)
            .and_then(|index| u8::try_from(index).ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn hz(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn display_value(self) -> String {
        let khz = self.0 / 1000;
        match (self.0 % 1000) / 100 {
            0 => format!("{khz} kHz"),
            tenth => format!("{khz}.{tenth} kHz"),
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self(Self::RATES_HZ[0])
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value())
    }
}

/// Firmware version reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    #[must_use]
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub fn display_value(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_channel_balance_clamps() {
        assert_eq!(ChannelBalance::new(-100).value(), ChannelBalance::MIN);
        assert_eq!(ChannelBalance::new(100).value(), ChannelBalance::MAX);
        assert_eq!(ChannelBalance::new(-3).value(), -3);
        assert_eq!(ChannelBalance::default().value(), 0);
    }

    #[test]
    fn test_channel_balance_try_new_rejects() {
        assert_matches!(
            ChannelBalance::try_new(13),
            Err(Error::OutOfRange { feature: FeatureKind::ChannelBalance, value: 13 })
        );
    }

    #[test]
    fn test_display_brightness_never_zero() {
        assert_eq!(DisplayBrightness::new(0).value(), DisplayBrightness::MIN);
        assert!(DisplayBrightness::try_new(0).is_err());
        assert_eq!(DisplayBrightness::default().value(), 255);
    }

    #[test]
    fn test_display_timeout_clamps() {
        assert_eq!(DisplayTimeout::new(200).value(), DisplayTimeout::MAX);
        assert_eq!(DisplayTimeout::new(0).value(), 0);
    }

    #[test]
    fn test_enum_ids_round_trip() {
        for filter in Filter::ALL {
            assert_eq!(Filter::from_id(filter.id()).unwrap(), filter);
        }
        assert_eq!(Gain::from_id(Gain::High.id()).unwrap(), Gain::High);
        assert_eq!(DacMode::from_id(DacMode::ClassH.id()).unwrap(), DacMode::ClassH);
        assert_eq!(HidMode::from_id(HidMode::B.id()).unwrap(), HidMode::B);
        assert_eq!(
            IndicatorState::from_id(IndicatorState::Disabled.id()).unwrap(),
            IndicatorState::Disabled
        );
    }

    #[test]
    fn test_unknown_ids_are_out_of_range() {
        assert_matches!(Filter::from_id(5), Err(Error::OutOfRange { .. }));
        assert_matches!(Gain::from_id(2), Err(Error::OutOfRange { .. }));
        assert_matches!(DacMode::from_id(9), Err(Error::OutOfRange { .. }));
        assert_matches!(HidMode::from_id(2), Err(Error::OutOfRange { .. }));
        assert_matches!(IndicatorState::from_id(3), Err(Error::OutOfRange { .. }));
        assert_matches!(SampleRate::from_id(10), Err(Error::OutOfRange { .. }));
    }

    #[test]
    fn test_sample_rate_display() {
        assert_eq!(SampleRate::from_id(0).unwrap().display_value(), "44.1 kHz");
        assert_eq!(SampleRate::from_id(5).unwrap().display_value(), "192 kHz");
        assert_eq!(SampleRate::from_id(8).unwrap().display_value(), "705.6 kHz");
        assert_eq!(SampleRate::from_id(3).unwrap().hz(), 96_000);
    }

    #[test]
    fn test_firmware_version_display() {
        assert_eq!(FirmwareVersion::new(1, 52).display_value(), "1.52");
        assert_eq!(FirmwareVersion::new(2, 0).to_string(), "2.0");
    }

    #[test]
    fn test_channel_balance_raw_is_twos_complement() {
        let value = FeatureValue::ChannelBalance(ChannelBalance::new(-1));
        assert_eq!(value.to_raw(), 0xff);
    }

    #[test]
    fn test_telemetry_features_not_settable() {
        assert!(!FeatureKind::FirmwareVersion.is_settable());
        assert!(!FeatureKind::SampleRate.is_settable());
        assert!(FeatureKind::VolumeLevel.is_settable());
    }

    proptest! {
        #[test]
        fn prop_channel_balance_always_in_range(raw in any::<i8>()) {
            let balance = ChannelBalance::new(raw);
            prop_assert!((ChannelBalance::MIN..=ChannelBalance::MAX).contains(&balance.value()));
        }

        #[test]
        fn prop_display_values_always_in_range(raw in any::<u8>()) {
            prop_assert!(DisplayBrightness::new(raw).value() >= DisplayBrightness::MIN);
            prop_assert!(DisplayTimeout::new(raw).value() <= DisplayTimeout::MAX);
        }
    }
}
