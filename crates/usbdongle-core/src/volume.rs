//! Volume level, volume mode and the hardware volume step policy.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::feature::FeatureKind;

/// Lowest raw volume value any family accepts.
pub const VOLUME_MIN: u8 = 0;
/// Smallest single volume step.
pub const VOLUME_STEP_SIZE_MIN: u8 = 1;
/// Largest single volume step the bundled families allow.
pub const VOLUME_STEP_SIZE_MAX: u8 = 10;

/// Inclusive raw volume range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VolumeRange {
    pub min: u8,
    pub max: u8,
}

impl VolumeRange {
    #[must_use]
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Number of steps between the ends of the range.
    #[must_use]
    pub fn steps(self) -> u8 {
        self.max - self.min
    }

    #[must_use]
    pub fn clamp(self, raw: u8) -> u8 {
        raw.clamp(self.min, self.max)
    }

    #[must_use]
    pub fn contains(self, raw: u8) -> bool {
        (self.min..=self.max).contains(&raw)
    }
}

/// Volume scale selection. Each mode has its own step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    #[default]
    S120,
    S60,
}

impl VolumeMode {
    /// # Errors
    /// Returns [`Error::OutOfRange`] for an unknown id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::S120),
            1 => Ok(Self::S60),
            _ => Err(Error::OutOfRange { feature: FeatureKind::VolumeMode, value: id.into() }),
        }
    }

    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn steps(self) -> u8 {
        match self {
            Self::S120 => 120,
            Self::S60 => 60,
        }
    }

    /// Valid volume levels while this mode is active.
    #[must_use]
    pub fn range(self) -> VolumeRange {
        VolumeRange::new(VOLUME_MIN, self.steps())
    }

    #[must_use]
    pub fn display_value(self) -> &'static str {
        match self {
            Self::S120 => "120 steps",
            Self::S60 => "60 steps",
        }
    }
}

/// Raw volume level as the device understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    /// Create a level, clamping into `range`.
    #[must_use]
    pub fn new(raw: u8, range: VolumeRange) -> Self {
        Self(range.clamp(raw))
    }

    /// # Errors
    /// Returns [`Error::OutOfRange`] if `raw` lies outside `range`.
    pub fn try_new(raw: u8, range: VolumeRange) -> Result<Self> {
        if range.contains(raw) {
            Ok(Self(raw))
        } else {
            Err(Error::OutOfRange { feature: FeatureKind::VolumeLevel, value: raw.into() })
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

    /// Re-clamp this level into another range.
    #[must_use]
    pub fn clamped_to(self, range: VolumeRange) -> Self {
        Self::new(self.0, range)
    }

    /// Percentage of `mode`'s scale, rounded down.
    #[must_use]
    pub fn to_percent(self, mode: VolumeMode) -> u8 {
        percent(self.0, mode.steps())
    }
}

impl Default for VolumeLevel {
    fn default() -> Self {
        Self(30)
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn percent(value: u8, steps: u8) -> u8 {
    if steps == 0 {
        return 0;
    }
    // value <= steps for every caller, so the result fits in a u8
    u8::try_from(u16::from(value) * 100 / u16::from(steps)).unwrap_or(100)
}

/// Step policy shared by UI controls and hot-key actions.
///
/// `ascending` means the raw value grows as the output gets louder. Some
/// families count attenuation instead, in which case "up" lowers the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HardwareVolumeControl {
    pub max_step_size: u8,
    pub ascending: bool,
}

impl HardwareVolumeControl {
    /// One step louder, clamped to `range`.
    #[must_use]
    pub fn step_up(&self, level: VolumeLevel, range: VolumeRange, step: u8) -> VolumeLevel {
        self.step(level, range, step, true)
    }

    /// One step quieter, clamped to `range`.
    #[must_use]
    pub fn step_down(&self, level: VolumeLevel, range: VolumeRange, step: u8) -> VolumeLevel {
        self.step(level, range, step, false)
    }

    fn step(&self, level: VolumeLevel, range: VolumeRange, step: u8, louder: bool) -> VolumeLevel {
        let step = step.clamp(VOLUME_STEP_SIZE_MIN, self.max_step_size.max(VOLUME_STEP_SIZE_MIN));
        let raw = if louder == self.ascending {
            level.value().saturating_add(step)
        } else {
            level.value().saturating_sub(step)
        };
        VolumeLevel::new(raw, range)
    }

    /// Loudness in percent, independent of the scale direction.
    #[must_use]
    pub fn percent(&self, level: VolumeLevel, range: VolumeRange) -> u8 {
        let level = range.clamp(level.value());
        if self.ascending {
            percent(level - range.min, range.steps())
        } else {
            percent(range.max - level, range.steps())
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const ASCENDING: HardwareVolumeControl =
        HardwareVolumeControl { max_step_size: VOLUME_STEP_SIZE_MAX, ascending: true };
    const DESCENDING: HardwareVolumeControl =
        HardwareVolumeControl { max_step_size: VOLUME_STEP_SIZE_MAX, ascending: false };

    #[test]
    fn test_to_percent() {
        let level = VolumeLevel::new(60, VolumeMode::S120.range());
        assert_eq!(level.to_percent(VolumeMode::S120), 50);
        assert_eq!(level.to_percent(VolumeMode::S60), 100);
        assert_eq!(VolumeLevel::new(1, VolumeMode::S120.range()).to_percent(VolumeMode::S120), 0);
    }

    #[test]
    fn test_level_clamps_to_mode() {
        let level = VolumeLevel::new(100, VolumeMode::S60.range());
        assert_eq!(level.value(), 60);
        assert!(VolumeLevel::try_new(61, VolumeMode::S60.range()).is_err());
    }

    #[test]
    fn test_step_up_at_max_is_noop() {
        let range = VolumeMode::S120.range();
        let max = VolumeLevel::new(range.max, range);
        assert_eq!(ASCENDING.step_up(max, range, 1), max);
    }

    #[test]
    fn test_step_down_at_min_is_noop() {
        let range = VolumeMode::S60.range();
        let min = VolumeLevel::new(VOLUME_MIN, range);
        assert_eq!(ASCENDING.step_down(min, range, 1), min);
    }

    #[test]
    fn test_descending_scale_steps_inverted() {
        let range = VolumeRange::new(0, 112);
        let level = VolumeLevel::new(50, range);
        assert_eq!(DESCENDING.step_up(level, range, 2).value(), 48);
        assert_eq!(DESCENDING.step_down(level, range, 2).value(), 52);

        let loudest = VolumeLevel::new(0, range);
        assert_eq!(DESCENDING.step_up(loudest, range, 1), loudest);
    }

    #[test]
    fn test_step_size_is_capped() {
        let range = VolumeMode::S120.range();
        let level = VolumeLevel::new(50, range);
        assert_eq!(ASCENDING.step_up(level, range, 50).value(), 60);
        assert_eq!(ASCENDING.step_up(level, range, 0).value(), 51);
    }

    #[test]
    fn test_percent_respects_direction() {
        let range = VolumeRange::new(0, 112);
        assert_eq!(DESCENDING.percent(VolumeLevel::new(0, range), range), 100);
        assert_eq!(DESCENDING.percent(VolumeLevel::new(112, range), range), 0);
        assert_eq!(ASCENDING.percent(VolumeLevel::new(112, range), range), 100);
    }

    proptest! {
        #[test]
        fn prop_steps_stay_in_range(raw in any::<u8>(), step in any::<u8>(), ascending in any::<bool>()) {
            let control = HardwareVolumeControl { max_step_size: VOLUME_STEP_SIZE_MAX, ascending };
            let range = VolumeMode::S60.range();
            let level = VolumeLevel::new(raw, range);
            prop_assert!(range.contains(control.step_up(level, range, step).value()));
            prop_assert!(range.contains(control.step_down(level, range, step).value()));
        }
    }
}
