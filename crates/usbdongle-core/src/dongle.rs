//! Immutable device snapshots.
//!
//! A [`UsbDongle`] is replaced, never mutated: every successful get or set
//! produces a fresh value through [`UsbDongle::with_feature`] or
//! [`UsbDongle::with_telemetry`], and a failed operation leaves the caller
//! holding the previous snapshot.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::family::{DAWN_VOLUME_RANGE, DongleFamily};
use crate::feature::{
    ChannelBalance, DacMode, DisplayBrightness, DisplayInvert, DisplayTimeout, FeatureKind,
    FeatureValue, Filter, FirmwareVersion, Gain, HardwareMute, HidMode, IndicatorState,
    SampleRate, SpdifOut,
};
use crate::volume::{HardwareVolumeControl, VolumeLevel, VolumeMode, VolumeRange};

/// Snapshot of an attached dongle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "family")]
pub enum UsbDongle {
    Unsupported(UnsupportedUsbDongle),
    FiioKa5(FiioKa5),
    MoondropDawn(MoondropDawn),
}

/// A USB device whose identity matches no known family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnsupportedUsbDongle {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl UsbDongle {
    /// Resolve a vendor/product id pair to a default-state snapshot.
    ///
    /// Unknown ids yield [`UsbDongle::Unsupported`]; this never fails.
    #[must_use]
    pub fn from_ids(vendor_id: u16, product_id: u16) -> Self {
        match DongleFamily::from_ids(vendor_id, product_id) {
            Some(family) => Self::factory_default(family),
            None => Self::Unsupported(UnsupportedUsbDongle { vendor_id, product_id }),
        }
    }

    /// Factory-default snapshot for a family.
    #[must_use]
    pub fn factory_default(family: DongleFamily) -> Self {
        match family {
            DongleFamily::FiioKa5 => Self::FiioKa5(FiioKa5::default()),
            DongleFamily::MoondropDawn => Self::MoondropDawn(MoondropDawn::default()),
        }
    }

    #[must_use]
    pub fn family(&self) -> Option<DongleFamily> {
        match self {
            Self::Unsupported(_) => None,
            Self::FiioKa5(_) => Some(DongleFamily::FiioKa5),
            Self::MoondropDawn(_) => Some(DongleFamily::MoondropDawn),
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.family().is_some()
    }

    #[must_use]
    pub fn vendor_id(&self) -> u16 {
        match self {
            Self::Unsupported(dongle) => dongle.vendor_id,
            _ => self.family().map_or(0, |family| family.capabilities().vendor_id),
        }
    }

    #[must_use]
    pub fn product_id(&self) -> u16 {
        match self {
            Self::Unsupported(dongle) => dongle.product_id,
            _ => self.family().map_or(0, |family| family.capabilities().product_id),
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.family().map_or("Unsupported", |family| family.capabilities().model_name)
    }

    #[must_use]
    pub fn manufacturer(&self) -> &'static str {
        self.family().map_or("Unknown", |family| family.capabilities().manufacturer)
    }

    /// `"<manufacturer> <model>"`, e.g. `"FiiO KA5"`.
    #[must_use]
    pub fn product_name(&self) -> String {
        format!("{} {}", self.manufacturer(), self.model_name())
    }

    /// Replace a single feature.
    ///
    /// Volume levels are re-clamped against the snapshot's current volume
    /// range; switching the volume mode re-clamps the stored level.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] for an unsupported snapshot and
    /// [`Error::UnsupportedFeature`] if the family lacks the feature.
    pub fn with_feature(&self, value: FeatureValue) -> Result<Self> {
        match self {
            Self::Unsupported(_) => Err(Error::UnsupportedUsbDongle),
            Self::FiioKa5(dongle) => dongle.with_feature(value).map(Self::FiioKa5),
            Self::MoondropDawn(dongle) => dongle.with_feature(value).map(Self::MoondropDawn),
        }
    }

    /// Merge decoded telemetry into a new snapshot.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] for an unsupported snapshot and
    /// [`Error::ProtocolMismatch`] if the telemetry belongs to another family.
    pub fn with_telemetry(&self, telemetry: Telemetry) -> Result<Self> {
        match self {
            Self::Unsupported(_) => Err(Error::UnsupportedUsbDongle),
            Self::FiioKa5(dongle) => dongle.with_telemetry(telemetry).map(Self::FiioKa5),
            Self::MoondropDawn(dongle) => dongle.with_telemetry(telemetry).map(Self::MoondropDawn),
        }
    }

    /// Current value of a settable feature, if the family has it.
    #[must_use]
    pub fn feature_value(&self, kind: FeatureKind) -> Option<FeatureValue> {
        match self {
            Self::Unsupported(_) => None,
            Self::FiioKa5(dongle) => dongle.feature_value(kind),
            Self::MoondropDawn(dongle) => dongle.feature_value(kind),
        }
    }

    #[must_use]
    pub fn volume_level(&self) -> Option<VolumeLevel> {
        match self {
            Self::Unsupported(_) => None,
            Self::FiioKa5(dongle) => Some(dongle.volume_level),
            Self::MoondropDawn(dongle) => Some(dongle.volume_level),
        }
    }

    /// Range the volume level is currently bounded by.
    #[must_use]
    pub fn volume_range(&self) -> Option<VolumeRange> {
        match self {
            Self::Unsupported(_) => None,
            Self::FiioKa5(dongle) => Some(dongle.volume_mode.range()),
            Self::MoondropDawn(_) => Some(DAWN_VOLUME_RANGE),
        }
    }

    #[must_use]
    pub fn volume_control(&self) -> Option<HardwareVolumeControl> {
        self.family().map(|family| family.capabilities().volume)
    }

    /// Loudness in percent, regardless of the family's scale direction.
    #[must_use]
    pub fn volume_percent(&self) -> Option<u8> {
        let control = self.volume_control()?;
        Some(control.percent(self.volume_level()?, self.volume_range()?))
    }
}

/// Values decoded from one telemetry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry {
    FirmwareVersion(FirmwareVersion),
    SampleRate(SampleRate),
    Volume { level: u8, mode: VolumeMode },
    Filter(Filter),
    FiioKa5OtherState(FiioKa5OtherState),
    MoondropDawnState(MoondropDawnState),
}

/// The switches reported together by the KA5's aggregate state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiioKa5OtherState {
    pub gain: Gain,
    pub channel_balance: ChannelBalance,
    pub dac_mode: DacMode,
    pub hardware_mute: HardwareMute,
    pub spdif_out: SpdifOut,
    pub display_timeout: DisplayTimeout,
    pub hid_mode: HidMode,
    pub display_brightness: DisplayBrightness,
    pub display_invert: DisplayInvert,
}

/// Everything the Dawn reports in its single state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoondropDawnState {
    pub filter: Filter,
    pub gain: Gain,
    pub volume_level: VolumeLevel,
    pub indicator_state: IndicatorState,
}

fn telemetry_mismatch(model: &str, telemetry: &Telemetry) -> Error {
    Error::ProtocolMismatch(format!("{model} cannot report {telemetry:?}"))
}

/// FiiO KA5 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FiioKa5 {
    channel_balance: ChannelBalance,
    dac_mode: DacMode,
    display_brightness: DisplayBrightness,
    display_invert: DisplayInvert,
    display_timeout: DisplayTimeout,
    filter: Filter,
    firmware_version: FirmwareVersion,
    gain: Gain,
    hardware_mute: HardwareMute,
    hid_mode: HidMode,
    sample_rate: SampleRate,
    spdif_out: SpdifOut,
    volume_level: VolumeLevel,
    volume_mode: VolumeMode,
}

impl FiioKa5 {
    #[must_use]
    pub fn channel_balance(&self) -> ChannelBalance {
        self.channel_balance
    }

    #[must_use]
    pub fn dac_mode(&self) -> DacMode {
        self.dac_mode
    }

    #[must_use]
    pub fn display_brightness(&self) -> DisplayBrightness {
        self.display_brightness
    }

    #[must_use]
    pub fn display_invert(&self) -> DisplayInvert {
        self.display_invert
    }

    #[must_use]
    pub fn display_timeout(&self) -> DisplayTimeout {
        self.display_timeout
    }

    #[must_use]
    pub fn filter(&self) -> Filter {
        self.filter
    }

    #[must_use]
    pub fn firmware_version(&self) -> FirmwareVersion {
        self.firmware_version
    }

    #[must_use]
    pub fn gain(&self) -> Gain {
        self.gain
    }

    #[must_use]
    pub fn hardware_mute(&self) -> HardwareMute {
        self.hardware_mute
    }

    #[must_use]
    pub fn hid_mode(&self) -> HidMode {
        self.hid_mode
    }

    #[must_use]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    #[must_use]
    pub fn spdif_out(&self) -> SpdifOut {
        self.spdif_out
    }

    #[must_use]
    pub fn volume_level(&self) -> VolumeLevel {
        self.volume_level
    }

    #[must_use]
    pub fn volume_mode(&self) -> VolumeMode {
        self.volume_mode
    }

    fn with_feature(&self, value: FeatureValue) -> Result<Self> {
        let mut next = *self;
        match value {
            FeatureValue::ChannelBalance(v) => next.channel_balance = v,
            FeatureValue::DacMode(v) => next.dac_mode = v,
            FeatureValue::DisplayBrightness(v) => next.display_brightness = v,
            FeatureValue::DisplayInvert(v) => next.display_invert = v,
            FeatureValue::DisplayTimeout(v) => next.display_timeout = v,
            FeatureValue::Filter(v) => next.filter = v,
            FeatureValue::Gain(v) => next.gain = v,
            FeatureValue::HardwareMute(v) => next.hardware_mute = v,
            FeatureValue::HidMode(v) => next.hid_mode = v,
            FeatureValue::SpdifOut(v) => next.spdif_out = v,
            FeatureValue::VolumeLevel(v) => next.volume_level = v.clamped_to(next.volume_mode.range()),
            FeatureValue::VolumeMode(v) => {
                next.volume_mode = v;
                next.volume_level = next.volume_level.clamped_to(v.range());
                if next.volume_level != self.volume_level {
                    debug!(
                        from = self.volume_level.value(),
                        to = next.volume_level.value(),
                        mode = v.display_value(),
                        "Volume level re-clamped to new mode"
                    );
                }
            }
            FeatureValue::IndicatorState(_) => {
                return Err(Error::UnsupportedFeature { model: "KA5", feature: value.kind() });
            }
        }
        Ok(next)
    }

    fn with_telemetry(&self, telemetry: Telemetry) -> Result<Self> {
        let mut next = *self;
        match telemetry {
            Telemetry::FirmwareVersion(v) => next.firmware_version = v,
            Telemetry::SampleRate(v) => next.sample_rate = v,
            Telemetry::Volume { level, mode } => {
                next.volume_mode = mode;
                next.volume_level = VolumeLevel::try_new(level, mode.range())
                    .map_err(|_| Error::ProtocolMismatch(format!("volume {level} exceeds {mode:?}")))?;
            }
            Telemetry::Filter(v) => next.filter = v,
            Telemetry::FiioKa5OtherState(state) => {
                next.gain = state.gain;
                next.channel_balance = state.channel_balance;
                next.dac_mode = state.dac_mode;
                next.hardware_mute = state.hardware_mute;
                next.spdif_out = state.spdif_out;
                next.display_timeout = state.display_timeout;
                next.hid_mode = state.hid_mode;
                next.display_brightness = state.display_brightness;
                next.display_invert = state.display_invert;
            }
            Telemetry::MoondropDawnState(_) => return Err(telemetry_mismatch("KA5", &telemetry)),
        }
        Ok(next)
    }

    fn feature_value(&self, kind: FeatureKind) -> Option<FeatureValue> {
        Some(match kind {
            FeatureKind::ChannelBalance => FeatureValue::ChannelBalance(self.channel_balance),
            FeatureKind::DacMode => FeatureValue::DacMode(self.dac_mode),
            FeatureKind::DisplayBrightness => FeatureValue::DisplayBrightness(self.display_brightness),
            FeatureKind::DisplayInvert => FeatureValue::DisplayInvert(self.display_invert),
            FeatureKind::DisplayTimeout => FeatureValue::DisplayTimeout(self.display_timeout),
            FeatureKind::Filter => FeatureValue::Filter(self.filter),
            FeatureKind::Gain => FeatureValue::Gain(self.gain),
            FeatureKind::HardwareMute => FeatureValue::HardwareMute(self.hardware_mute),
            FeatureKind::HidMode => FeatureValue::HidMode(self.hid_mode),
            FeatureKind::SpdifOut => FeatureValue::SpdifOut(self.spdif_out),
            FeatureKind::VolumeLevel => FeatureValue::VolumeLevel(self.volume_level),
            FeatureKind::VolumeMode => FeatureValue::VolumeMode(self.volume_mode),
            FeatureKind::FirmwareVersion | FeatureKind::SampleRate | FeatureKind::IndicatorState => {
                return None;
            }
        })
    }
}

/// Moondrop Dawn Pro state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoondropDawn {
    filter: Filter,
    gain: Gain,
    indicator_state: IndicatorState,
    volume_level: VolumeLevel,
}

impl Default for MoondropDawn {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            gain: Gain::default(),
            indicator_state: IndicatorState::default(),
            volume_level: VolumeLevel::new(80, DAWN_VOLUME_RANGE),
        }
    }
}

impl MoondropDawn {
    #[must_use]
    pub fn filter(&self) -> Filter {
        self.filter
    }

    #[must_use]
    pub fn gain(&self) -> Gain {
        self.gain
    }

    #[must_use]
    pub fn indicator_state(&self) -> IndicatorState {
        self.indicator_state
    }

    #[must_use]
    pub fn volume_level(&self) -> VolumeLevel {
        self.volume_level
    }

    fn with_feature(&self, value: FeatureValue) -> Result<Self> {
        let mut next = *self;
        match value {
            FeatureValue::Filter(v) => next.filter = v,
            FeatureValue::Gain(v) => next.gain = v,
            FeatureValue::IndicatorState(v) => next.indicator_state = v,
            FeatureValue::VolumeLevel(v) => next.volume_level = v.clamped_to(DAWN_VOLUME_RANGE),
            _ => {
                return Err(Error::UnsupportedFeature { model: "Dawn Pro", feature: value.kind() });
            }
        }
        Ok(next)
    }

    fn with_telemetry(&self, telemetry: Telemetry) -> Result<Self> {
        match telemetry {
            Telemetry::MoondropDawnState(state) => Ok(Self {
                filter: state.filter,
                gain: state.gain,
                indicator_state: state.indicator_state,
                volume_level: state.volume_level.clamped_to(DAWN_VOLUME_RANGE),
            }),
            _ => Err(telemetry_mismatch("Dawn Pro", &telemetry)),
        }
    }

    fn feature_value(&self, kind: FeatureKind) -> Option<FeatureValue> {
        match kind {
            FeatureKind::Filter => Some(FeatureValue::Filter(self.filter)),
            FeatureKind::Gain => Some(FeatureValue::Gain(self.gain)),
            FeatureKind::IndicatorState => Some(FeatureValue::IndicatorState(self.indicator_state)),
            FeatureKind::VolumeLevel => Some(FeatureValue::VolumeLevel(self.volume_level)),
            _ => None,
        }
    }
}
