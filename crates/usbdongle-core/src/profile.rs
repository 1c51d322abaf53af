//! Saved device profiles.
//!
//! A profile is a flat, persistable copy of every feature of one device
//! family. Scalar features are stored as their display values and enumerated
//! features by id, so a record survives serialization unchanged.

use serde::{Deserialize, Serialize};

use crate::dongle::UsbDongle;
use crate::error::{Error, Result};
use crate::family::{DAWN_VOLUME_RANGE, DongleFamily};
use crate::feature::{
    ChannelBalance, DacMode, DisplayBrightness, DisplayInvert, DisplayTimeout, FeatureKind,
    FeatureValue, Filter, FirmwareVersion, Gain, HardwareMute, HidMode, IndicatorState,
    SampleRate, SpdifOut,
};
use crate::volume::{VolumeLevel, VolumeMode};

/// Name given to factory-default profiles.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// A saved feature snapshot for one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub channel_balance: i32,
    pub dac_mode_id: u8,
    pub display_brightness: i32,
    pub display_timeout: i32,
    pub filter_id: u8,
    /// Informational only, never written back to a device.
    pub firmware_version: String,
    pub gain_id: u8,
    pub hid_mode_id: u8,
    pub indicator_state_id: u8,
    pub is_display_invert_enabled: bool,
    pub is_hardware_mute_enabled: bool,
    pub is_spdif_out_enabled: bool,
    /// Informational only, never written back to a device.
    pub sample_rate: String,
    pub volume_level: i32,
    pub volume_mode_id: u8,
}

impl Profile {
    /// Capture the current state of `dongle` under `name`.
    ///
    /// Features the family lacks keep their default values.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] for an unsupported dongle.
    pub fn capture(dongle: &UsbDongle, name: &str) -> Result<Self> {
        let mut profile = Self::blank(dongle.vendor_id(), dongle.product_id(), name);

        match dongle {
            UsbDongle::Unsupported(_) => return Err(Error::UnsupportedUsbDongle),
            UsbDongle::FiioKa5(ka5) => {
                profile.channel_balance = ka5.channel_balance().display_value();
                profile.dac_mode_id = ka5.dac_mode().id();
                profile.display_brightness = ka5.display_brightness().display_value();
                profile.display_timeout = ka5.display_timeout().display_value();
                profile.filter_id = ka5.filter().id();
                profile.firmware_version = ka5.firmware_version().display_value();
                profile.gain_id = ka5.gain().id();
                profile.hid_mode_id = ka5.hid_mode().id();
                profile.is_display_invert_enabled = ka5.display_invert().is_enabled();
                profile.is_hardware_mute_enabled = ka5.hardware_mute().is_enabled();
                profile.is_spdif_out_enabled = ka5.spdif_out().is_enabled();
                profile.sample_rate = ka5.sample_rate().display_value();
                profile.volume_level = ka5.volume_level().display_value();
                profile.volume_mode_id = ka5.volume_mode().id();
            }
            UsbDongle::MoondropDawn(dawn) => {
                profile.filter_id = dawn.filter().id();
                profile.gain_id = dawn.gain().id();
                profile.indicator_state_id = dawn.indicator_state().id();
                profile.volume_level = dawn.volume_level().display_value();
            }
        }

        Ok(profile)
    }

    /// The factory-default profile for the family of `dongle`.
    ///
    /// The HID mode is taken from `dongle` rather than reset, since switching
    /// it changes how the host enumerates the device.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] for an unsupported dongle.
    pub fn factory_default(dongle: &UsbDongle) -> Result<Self> {
        let family = dongle.family().ok_or(Error::UnsupportedUsbDongle)?;
        let mut profile = Self::capture(&family.default_dongle(), DEFAULT_PROFILE_NAME)?;
        if let UsbDongle::FiioKa5(ka5) = dongle {
            profile.hid_mode_id = ka5.hid_mode().id();
        }
        Ok(profile)
    }

    #[must_use]
    pub fn family(&self) -> Option<DongleFamily> {
        DongleFamily::from_ids(self.vendor_id, self.product_id)
    }

    /// Whether this profile was captured from the same kind of device.
    #[must_use]
    pub fn matches(&self, dongle: &UsbDongle) -> bool {
        dongle.is_supported()
            && self.vendor_id == dongle.vendor_id()
            && self.product_id == dongle.product_id()
    }

    /// The set commands that reproduce this profile, in the order they must
    /// be sent.
    ///
    /// The volume mode always precedes the volume level so the level is
    /// validated against the mode it will actually run under.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] if the ids match no family and
    /// [`Error::OutOfRange`] if a stored value is invalid.
    pub fn apply_sequence(&self) -> Result<Vec<FeatureValue>> {
        match self.family() {
            None => Err(Error::UnsupportedUsbDongle),
            Some(DongleFamily::FiioKa5) => {
                let volume_mode = VolumeMode::from_id(self.volume_mode_id)?;
                Ok(vec![
                    FeatureValue::Filter(Filter::from_id(self.filter_id)?),
                    FeatureValue::Gain(Gain::from_id(self.gain_id)?),
                    FeatureValue::ChannelBalance(ChannelBalance::try_new(narrow(
                        FeatureKind::ChannelBalance,
                        self.channel_balance,
                    )?)?),
                    FeatureValue::DacMode(DacMode::from_id(self.dac_mode_id)?),
                    FeatureValue::HardwareMute(HardwareMute::new(self.is_hardware_mute_enabled)),
                    FeatureValue::SpdifOut(SpdifOut::new(self.is_spdif_out_enabled)),
                    FeatureValue::DisplayBrightness(DisplayBrightness::try_new(narrow(
                        FeatureKind::DisplayBrightness,
                        self.display_brightness,
                    )?)?),
                    FeatureValue::DisplayTimeout(DisplayTimeout::try_new(narrow(
                        FeatureKind::DisplayTimeout,
                        self.display_timeout,
                    )?)?),
                    FeatureValue::DisplayInvert(DisplayInvert::new(self.is_display_invert_enabled)),
                    FeatureValue::HidMode(HidMode::from_id(self.hid_mode_id)?),
                    FeatureValue::VolumeMode(volume_mode),
                    FeatureValue::VolumeLevel(VolumeLevel::try_new(
                        narrow(FeatureKind::VolumeLevel, self.volume_level)?,
                        volume_mode.range(),
                    )?),
                ])
            }
            Some(DongleFamily::MoondropDawn) => Ok(vec![
                FeatureValue::Filter(Filter::from_id(self.filter_id)?),
                FeatureValue::Gain(Gain::from_id(self.gain_id)?),
                FeatureValue::IndicatorState(IndicatorState::from_id(self.indicator_state_id)?),
                FeatureValue::VolumeLevel(VolumeLevel::try_new(
                    narrow(FeatureKind::VolumeLevel, self.volume_level)?,
                    DAWN_VOLUME_RANGE,
                )?),
            ]),
        }
    }

    fn blank(vendor_id: u16, product_id: u16, name: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor_id,
            product_id,
            channel_balance: ChannelBalance::default().display_value(),
            dac_mode_id: DacMode::default().id(),
            display_brightness: DisplayBrightness::default().display_value(),
            display_timeout: DisplayTimeout::default().display_value(),
            filter_id: Filter::default().id(),
            firmware_version: FirmwareVersion::default().display_value(),
            gain_id: Gain::default().id(),
            hid_mode_id: HidMode::default().id(),
            indicator_state_id: IndicatorState::default().id(),
            is_display_invert_enabled: false,
            is_hardware_mute_enabled: false,
            is_spdif_out_enabled: false,
            sample_rate: SampleRate::default().display_value(),
            volume_level: VolumeLevel::default().display_value(),
            volume_mode_id: VolumeMode::default().id(),
        }
    }
}

/// Convert a stored display value back into the feature's raw width.
fn narrow<T: TryFrom<i32>>(feature: FeatureKind, value: i32) -> Result<T> {
    T::try_from(value).map_err(|_| Error::OutOfRange { feature, value: value.into() })
}
