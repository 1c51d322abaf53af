//! Supported device families and what each of them can do.

use serde::Serialize;

use crate::dongle::UsbDongle;
use crate::feature::FeatureKind;
use crate::volume::{HardwareVolumeControl, VOLUME_STEP_SIZE_MAX, VolumeRange};

/// FiiO USB vendor id.
pub const FIIO_VID: u16 = 0x2972;
/// FiiO KA5 product id.
pub const FIIO_KA5_PID: u16 = 0x0055;
/// Moondrop USB vendor id.
pub const MOONDROP_VID: u16 = 0x2fc6;
/// Moondrop Dawn Pro product id.
pub const MOONDROP_DAWN_PID: u16 = 0xf06a;

/// Fixed volume range of the Moondrop Dawn. Raw 0 is the loudest setting.
pub const DAWN_VOLUME_RANGE: VolumeRange = VolumeRange::new(0, 112);

/// A device family this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DongleFamily {
    FiioKa5,
    MoondropDawn,
}

/// Static description of a device family.
#[derive(Debug)]
pub struct Capabilities {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: &'static str,
    pub model_name: &'static str,
    /// Every feature the family exposes, settable or read-only.
    pub features: &'static [FeatureKind],
    pub volume: HardwareVolumeControl,
}

static FIIO_KA5: Capabilities = Capabilities {
    vendor_id: FIIO_VID,
    product_id: FIIO_KA5_PID,
    manufacturer: "FiiO",
    model_name: "KA5",
    features: &[
        FeatureKind::ChannelBalance,
        FeatureKind::DacMode,
        FeatureKind::DisplayBrightness,
        FeatureKind::DisplayInvert,
        FeatureKind::DisplayTimeout,
        FeatureKind::Filter,
        FeatureKind::FirmwareVersion,
        FeatureKind::Gain,
        FeatureKind::HardwareMute,
        FeatureKind::HidMode,
        FeatureKind::SampleRate,
        FeatureKind::SpdifOut,
        FeatureKind::VolumeLevel,
        FeatureKind::VolumeMode,
    ],
    volume: HardwareVolumeControl { max_step_size: VOLUME_STEP_SIZE_MAX, ascending: true },
};

static MOONDROP_DAWN: Capabilities = Capabilities {
    vendor_id: MOONDROP_VID,
    product_id: MOONDROP_DAWN_PID,
    manufacturer: "Moondrop",
    model_name: "Dawn Pro",
    features: &[
        FeatureKind::Filter,
        FeatureKind::Gain,
        FeatureKind::IndicatorState,
        FeatureKind::VolumeLevel,
    ],
    volume: HardwareVolumeControl { max_step_size: VOLUME_STEP_SIZE_MAX, ascending: false },
};

impl DongleFamily {
    pub const ALL: [Self; 2] = [Self::FiioKa5, Self::MoondropDawn];

    /// Look up the family for a USB vendor/product id pair.
    #[must_use]
    pub fn from_ids(vendor_id: u16, product_id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|family| {
            let caps = family.capabilities();
            caps.vendor_id == vendor_id && caps.product_id == product_id
        })
    }

    #[must_use]
    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            Self::FiioKa5 => &FIIO_KA5,
            Self::MoondropDawn => &MOONDROP_DAWN,
        }
    }

    #[must_use]
    pub fn supports(self, feature: FeatureKind) -> bool {
        self.capabilities().features.contains(&feature)
    }

    /// Factory-default snapshot for this family.
    #[must_use]
    pub fn default_dongle(self) -> UsbDongle {
        UsbDongle::factory_default(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ids() {
        assert_eq!(DongleFamily::from_ids(FIIO_VID, FIIO_KA5_PID), Some(DongleFamily::FiioKa5));
        assert_eq!(
            DongleFamily::from_ids(MOONDROP_VID, MOONDROP_DAWN_PID),
            Some(DongleFamily::MoondropDawn)
        );
        assert_eq!(DongleFamily::from_ids(FIIO_VID, MOONDROP_DAWN_PID), None);
        assert_eq!(DongleFamily::from_ids(0x0fd9, 0x0070), None);
    }

    #[test]
    fn test_feature_counts() {
        assert_eq!(DongleFamily::FiioKa5.capabilities().features.len(), 14);
        assert_eq!(DongleFamily::MoondropDawn.capabilities().features.len(), 4);
    }

    #[test]
    fn test_supports() {
        assert!(DongleFamily::FiioKa5.supports(FeatureKind::SpdifOut));
        assert!(!DongleFamily::FiioKa5.supports(FeatureKind::IndicatorState));
        assert!(DongleFamily::MoondropDawn.supports(FeatureKind::IndicatorState));
        assert!(!DongleFamily::MoondropDawn.supports(FeatureKind::VolumeMode));
    }
}
