//! Report encoding and telemetry decoding.
//!
//! Every outgoing report is a fixed-size buffer: opcode, at most one payload
//! byte, zero padding. Responses echo the opcode of the query they answer
//! followed by values at fixed offsets.

use std::fmt;

use usbdongle_core::family::DAWN_VOLUME_RANGE;
use usbdongle_core::{
    ChannelBalance, DacMode, DisplayBrightness, DisplayInvert, DisplayTimeout, DongleFamily,
    Error, FeatureKind, FeatureValue, FiioKa5OtherState, Filter, FirmwareVersion, Gain,
    HardwareMute, HidMode, IndicatorState, MoondropDawnState, Result, SampleRate, SpdifOut,
    Telemetry, VolumeLevel, VolumeMode,
};

use crate::command::{Command, GetCommand, OPCODE_LENGTH, Opcode};

/// Size of every report in either direction.
pub const REPORT_LENGTH: usize = 64;

const PAYLOAD: usize = OPCODE_LENGTH;

/// One outgoing report.
#[derive(Clone, PartialEq, Eq)]
pub struct Report([u8; REPORT_LENGTH]);

impl Report {
    fn new(opcode: Opcode, payload: Option<u8>) -> Self {
        let mut buf = [0u8; REPORT_LENGTH];
        buf[..OPCODE_LENGTH].copy_from_slice(opcode.as_bytes());
        if let Some(byte) = payload {
            buf[PAYLOAD] = byte;
        }
        Self(buf)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn opcode(&self) -> Opcode {
        Opcode([self.0[0], self.0[1], self.0[2]])
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Report({:?} {:02x})", self.opcode(), self.0[PAYLOAD])
    }
}

fn mismatch(message: impl Into<String>) -> Error {
    Error::ProtocolMismatch(message.into())
}

/// Re-label a value validation failure as a malformed response.
fn invalid(error: Error) -> Error {
    match error {
        Error::OutOfRange { feature, value } => {
            mismatch(format!("device reported {value} for {feature}"))
        }
        other => other,
    }
}

fn model(family: DongleFamily) -> &'static str {
    family.capabilities().model_name
}

/// Build a telemetry query.
///
/// # Errors
/// Returns [`Error::ProtocolMismatch`] if `family` has no such query.
pub fn encode_get(family: DongleFamily, get: GetCommand) -> Result<Report> {
    let opcode = Command::Get(get)
        .opcode(family)
        .ok_or_else(|| mismatch(format!("{} has no {get:?} query", model(family))))?;
    Ok(Report::new(opcode, None))
}

/// Build a set report carrying `value`.
///
/// # Errors
/// Returns [`Error::UnsupportedFeature`] if `family` cannot set the feature.
pub fn encode_set(family: DongleFamily, value: &FeatureValue) -> Result<Report> {
    let opcode = Command::Set(value.kind())
        .opcode(family)
        .ok_or(Error::UnsupportedFeature { model: model(family), feature: value.kind() })?;
    Ok(Report::new(opcode, Some(value.to_raw())))
}

/// Check the echoed opcode and minimum length of a response.
fn expect_response(bytes: &[u8], command: Command, family: DongleFamily, len: usize) -> Result<()> {
    let expected = command.opcode(family).ok_or_else(|| {
        mismatch(format!("{} does not understand {command:?}", model(family)))
    })?;

    if bytes.len() < len {
        return Err(mismatch(format!(
            "{command:?} response is {} bytes, expected at least {len}",
            bytes.len()
        )));
    }

    if bytes[..OPCODE_LENGTH] != expected.0 {
        return Err(mismatch(format!(
            "expected opcode {expected:?} for {command:?}, got {:02x?}",
            &bytes[..OPCODE_LENGTH]
        )));
    }

    Ok(())
}

fn read_bool(byte: u8, feature: FeatureKind) -> Result<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(mismatch(format!("device reported {byte} for {feature}, expected 0 or 1"))),
    }
}

/// Decode the response to a telemetry query.
///
/// # Errors
/// Returns [`Error::ProtocolMismatch`] on a wrong opcode, a short buffer or
/// any value the device should never report.
pub fn decode_telemetry(family: DongleFamily, get: GetCommand, bytes: &[u8]) -> Result<Telemetry> {
    let command = Command::Get(get);
    match (family, get) {
        (DongleFamily::FiioKa5, GetCommand::Version) => {
            expect_response(bytes, command, family, 5)?;
            Ok(Telemetry::FirmwareVersion(FirmwareVersion::new(bytes[3], bytes[4])))
        }
        (DongleFamily::FiioKa5, GetCommand::SampleRate) => {
            expect_response(bytes, command, family, 4)?;
            Ok(Telemetry::SampleRate(SampleRate::from_id(bytes[3]).map_err(invalid)?))
        }
        (DongleFamily::FiioKa5, GetCommand::VolumeLevel) => {
            expect_response(bytes, command, family, 5)?;
            let mode = VolumeMode::from_id(bytes[4]).map_err(invalid)?;
            let level = VolumeLevel::try_new(bytes[3], mode.range()).map_err(invalid)?;
            Ok(Telemetry::Volume { level: level.value(), mode })
        }
        (DongleFamily::FiioKa5, GetCommand::Filter) => {
            expect_response(bytes, command, family, 4)?;
            Ok(Telemetry::Filter(Filter::from_id(bytes[3]).map_err(invalid)?))
        }
        (DongleFamily::FiioKa5, GetCommand::OtherState) => {
            expect_response(bytes, command, family, 12)?;
            Ok(Telemetry::FiioKa5OtherState(FiioKa5OtherState {
                gain: Gain::from_id(bytes[3]).map_err(invalid)?,
                channel_balance: ChannelBalance::try_new(i8::from_le_bytes([bytes[4]]))
                    .map_err(invalid)?,
                dac_mode: DacMode::from_id(bytes[5]).map_err(invalid)?,
                hardware_mute: HardwareMute::new(read_bool(bytes[6], FeatureKind::HardwareMute)?),
                spdif_out: SpdifOut::new(read_bool(bytes[7], FeatureKind::SpdifOut)?),
                display_timeout: DisplayTimeout::try_new(bytes[8]).map_err(invalid)?,
                hid_mode: HidMode::from_id(bytes[9]).map_err(invalid)?,
                display_brightness: DisplayBrightness::try_new(bytes[10]).map_err(invalid)?,
                display_invert: DisplayInvert::new(read_bool(bytes[11], FeatureKind::DisplayInvert)?),
            }))
        }
        (DongleFamily::MoondropDawn, GetCommand::OtherState) => {
            expect_response(bytes, command, family, 7)?;
            Ok(Telemetry::MoondropDawnState(MoondropDawnState {
                filter: Filter::from_id(bytes[3]).map_err(invalid)?,
                gain: Gain::from_id(bytes[4]).map_err(invalid)?,
                volume_level: VolumeLevel::try_new(bytes[5], DAWN_VOLUME_RANGE).map_err(invalid)?,
                indicator_state: IndicatorState::from_id(bytes[6]).map_err(invalid)?,
            }))
        }
        (DongleFamily::MoondropDawn, _) => {
            Err(mismatch(format!("{} has no {get:?} query", model(family))))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use usbdongle_core::VolumeRange;

    use super::*;

    /// Volume levels a set report may carry, independent of the active mode.
    fn widest_volume_range(family: DongleFamily) -> VolumeRange {
        match family {
            DongleFamily::FiioKa5 => VolumeMode::S120.range(),
            DongleFamily::MoondropDawn => DAWN_VOLUME_RANGE,
        }
    }

    /// Read back the value a set report carries.
    fn decode_set(family: DongleFamily, kind: FeatureKind, bytes: &[u8]) -> Result<FeatureValue> {
        expect_response(bytes, Command::Set(kind), family, PAYLOAD + 1)?;
        let raw = bytes[PAYLOAD];

        let value = match kind {
            FeatureKind::ChannelBalance => {
                FeatureValue::ChannelBalance(ChannelBalance::try_new(i8::from_le_bytes([raw])).map_err(invalid)?)
            }
            FeatureKind::DacMode => FeatureValue::DacMode(DacMode::from_id(raw).map_err(invalid)?),
            FeatureKind::DisplayBrightness => {
                FeatureValue::DisplayBrightness(DisplayBrightness::try_new(raw).map_err(invalid)?)
            }
            FeatureKind::DisplayInvert => FeatureValue::DisplayInvert(DisplayInvert::new(read_bool(raw, kind)?)),
            FeatureKind::DisplayTimeout => {
                FeatureValue::DisplayTimeout(DisplayTimeout::try_new(raw).map_err(invalid)?)
            }
            FeatureKind::Filter => FeatureValue::Filter(Filter::from_id(raw).map_err(invalid)?),
            FeatureKind::Gain => FeatureValue::Gain(Gain::from_id(raw).map_err(invalid)?),
            FeatureKind::HardwareMute => FeatureValue::HardwareMute(HardwareMute::new(read_bool(raw, kind)?)),
            FeatureKind::HidMode => FeatureValue::HidMode(HidMode::from_id(raw).map_err(invalid)?),
            FeatureKind::IndicatorState => {
                FeatureValue::IndicatorState(IndicatorState::from_id(raw).map_err(invalid)?)
            }
            FeatureKind::SpdifOut => FeatureValue::SpdifOut(SpdifOut::new(read_bool(raw, kind)?)),
            FeatureKind::VolumeLevel => FeatureValue::VolumeLevel(
                VolumeLevel::try_new(raw, widest_volume_range(family)).map_err(invalid)?,
            ),
            FeatureKind::VolumeMode => FeatureValue::VolumeMode(VolumeMode::from_id(raw).map_err(invalid)?),
            FeatureKind::FirmwareVersion | FeatureKind::SampleRate => {
                return Err(mismatch(format!("{kind} is read-only")));
            }
        };

        Ok(value)
    }

    /// A response buffer with `opcode` followed by `values`.
    pub(crate) fn response(opcode: [u8; 3], values: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; REPORT_LENGTH];
        buf[..3].copy_from_slice(&opcode);
        buf[3..3 + values.len()].copy_from_slice(values);
        buf
    }

    #[test]
    fn test_encode_set_layout() {
        let report =
            encode_set(DongleFamily::FiioKa5, &FeatureValue::ChannelBalance(ChannelBalance::new(-2)))
                .unwrap();
        let bytes = report.as_bytes();
        assert_eq!(bytes.len(), REPORT_LENGTH);
        assert_eq!(&bytes[..4], &[0xc7, 0xa5, 0x05, 0xfe]);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_get_has_no_payload() {
        let report = encode_get(DongleFamily::MoondropDawn, GetCommand::OtherState).unwrap();
        assert_eq!(&report.as_bytes()[..4], &[0xc0, 0xa5, 0xa3, 0x00]);
        assert_matches!(
            encode_get(DongleFamily::MoondropDawn, GetCommand::Version),
            Err(Error::ProtocolMismatch(_))
        );
    }

    #[test]
    fn test_encode_set_unsupported_feature() {
        let result =
            encode_set(DongleFamily::MoondropDawn, &FeatureValue::DacMode(DacMode::ClassH));
        assert_matches!(
            result,
            Err(Error::UnsupportedFeature { model: "Dawn Pro", feature: FeatureKind::DacMode })
        );
    }

    #[test]
    fn test_decode_ka5_volume() {
        let bytes = response([0xc7, 0xa5, 0xa2], &[45, 1]);
        let telemetry = decode_telemetry(DongleFamily::FiioKa5, GetCommand::VolumeLevel, &bytes);
        assert_eq!(telemetry.unwrap(), Telemetry::Volume { level: 45, mode: VolumeMode::S60 });
    }

    #[test]
    fn test_decode_ka5_volume_beyond_mode_is_mismatch() {
        let bytes = response([0xc7, 0xa5, 0xa2], &[90, 1]);
        assert_matches!(
            decode_telemetry(DongleFamily::FiioKa5, GetCommand::VolumeLevel, &bytes),
            Err(Error::ProtocolMismatch(_))
        );
    }

    #[test]
    fn test_decode_ka5_version_and_sample_rate() {
        let version = response([0xc7, 0xa5, 0xa0], &[1, 52]);
        assert_eq!(
            decode_telemetry(DongleFamily::FiioKa5, GetCommand::Version, &version).unwrap(),
            Telemetry::FirmwareVersion(FirmwareVersion::new(1, 52))
        );

        let rate = response([0xc7, 0xa5, 0xa1], &[3]);
        assert_matches!(
            decode_telemetry(DongleFamily::FiioKa5, GetCommand::SampleRate, &rate),
            Ok(Telemetry::SampleRate(rate)) if rate.hz() == 96_000
        );
    }

    #[test]
    fn test_decode_ka5_other_state() {
        let bytes = response([0xc7, 0xa5, 0xa4], &[1, 0xfd, 0, 1, 0, 15, 1, 128, 1]);
        let Telemetry::FiioKa5OtherState(state) =
            decode_telemetry(DongleFamily::FiioKa5, GetCommand::OtherState, &bytes).unwrap()
        else {
            panic!("wrong telemetry variant");
        };

        assert_eq!(state.gain, Gain::High);
        assert_eq!(state.channel_balance.value(), -3);
        assert_eq!(state.dac_mode, DacMode::ClassH);
        assert!(state.hardware_mute.is_enabled());
        assert!(!state.spdif_out.is_enabled());
        assert_eq!(state.display_timeout.value(), 15);
        assert_eq!(state.hid_mode, HidMode::B);
        assert_eq!(state.display_brightness.value(), 128);
        assert!(state.display_invert.is_enabled());
    }

    #[test]
    fn test_decode_dawn_state() {
        let bytes = response([0xc0, 0xa5, 0xa3], &[4, 1, 20, 2]);
        let telemetry =
            decode_telemetry(DongleFamily::MoondropDawn, GetCommand::OtherState, &bytes).unwrap();
        assert_eq!(
            telemetry,
            Telemetry::MoondropDawnState(MoondropDawnState {
                filter: Filter::NonOversampling,
                gain: Gain::High,
                volume_level: VolumeLevel::new(20, DAWN_VOLUME_RANGE),
                indicator_state: IndicatorState::Disabled,
            })
        );
    }

    #[test]
    fn test_wrong_opcode_is_mismatch() {
        let bytes = response([0xc7, 0xa5, 0xa3], &[0]);
        assert_matches!(
            decode_telemetry(DongleFamily::FiioKa5, GetCommand::SampleRate, &bytes),
            Err(Error::ProtocolMismatch(message)) if message.contains("expected opcode")
        );
    }

    #[test]
    fn test_short_buffer_is_mismatch() {
        let bytes = [0xc7, 0xa5, 0xa4, 1, 0];
        assert_matches!(
            decode_telemetry(DongleFamily::FiioKa5, GetCommand::OtherState, &bytes),
            Err(Error::ProtocolMismatch(_))
        );
        assert_matches!(
            decode_set(DongleFamily::FiioKa5, FeatureKind::Gain, &[0xc7, 0xa5]),
            Err(Error::ProtocolMismatch(_))
        );
    }

    #[test]
    fn test_bad_bool_is_mismatch() {
        let bytes = response([0xc7, 0xa5, 0x08], &[2]);
        assert_matches!(
            decode_set(DongleFamily::FiioKa5, FeatureKind::SpdifOut, &bytes),
            Err(Error::ProtocolMismatch(_))
        );
    }

    #[test]
    fn test_unknown_id_is_mismatch() {
        let bytes = response([0xc0, 0xa5, 0xa3], &[7, 0, 0, 0]);
        assert_matches!(
            decode_telemetry(DongleFamily::MoondropDawn, GetCommand::OtherState, &bytes),
            Err(Error::ProtocolMismatch(message)) if message.contains("filter")
        );
    }

    fn ka5_value() -> impl Strategy<Value = FeatureValue> {
        prop_oneof![
            any::<i8>().prop_map(|v| FeatureValue::ChannelBalance(ChannelBalance::new(v))),
            (0u8..2).prop_map(|id| FeatureValue::DacMode(DacMode::from_id(id).unwrap())),
            any::<u8>().prop_map(|v| FeatureValue::DisplayBrightness(DisplayBrightness::new(v))),
            any::<bool>().prop_map(|v| FeatureValue::DisplayInvert(DisplayInvert::new(v))),
            any::<u8>().prop_map(|v| FeatureValue::DisplayTimeout(DisplayTimeout::new(v))),
            (0u8..5).prop_map(|id| FeatureValue::Filter(Filter::from_id(id).unwrap())),
            (0u8..2).prop_map(|id| FeatureValue::Gain(Gain::from_id(id).unwrap())),
            any::<bool>().prop_map(|v| FeatureValue::HardwareMute(HardwareMute::new(v))),
            (0u8..2).prop_map(|id| FeatureValue::HidMode(HidMode::from_id(id).unwrap())),
            any::<bool>().prop_map(|v| FeatureValue::SpdifOut(SpdifOut::new(v))),
            any::<u8>().prop_map(|v| FeatureValue::VolumeLevel(VolumeLevel::new(v, VolumeMode::S120.range()))),
            (0u8..2).prop_map(|id| FeatureValue::VolumeMode(VolumeMode::from_id(id).unwrap())),
        ]
    }

    fn dawn_value() -> impl Strategy<Value = FeatureValue> {
        prop_oneof![
            (0u8..5).prop_map(|id| FeatureValue::Filter(Filter::from_id(id).unwrap())),
            (0u8..2).prop_map(|id| FeatureValue::Gain(Gain::from_id(id).unwrap())),
            (0u8..3).prop_map(|id| FeatureValue::IndicatorState(IndicatorState::from_id(id).unwrap())),
            any::<u8>().prop_map(|v| FeatureValue::VolumeLevel(VolumeLevel::new(v, DAWN_VOLUME_RANGE))),
        ]
    }

    proptest! {
        #[test]
        fn prop_ka5_set_reports_decode_to_same_value(value in ka5_value()) {
            let report = encode_set(DongleFamily::FiioKa5, &value).unwrap();
            let decoded = decode_set(DongleFamily::FiioKa5, value.kind(), report.as_bytes()).unwrap();
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn prop_dawn_set_reports_decode_to_same_value(value in dawn_value()) {
            let report = encode_set(DongleFamily::MoondropDawn, &value).unwrap();
            let decoded = decode_set(DongleFamily::MoondropDawn, value.kind(), report.as_bytes()).unwrap();
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..80)) {
            for family in DongleFamily::ALL {
                for get in [GetCommand::Version, GetCommand::SampleRate, GetCommand::VolumeLevel,
                            GetCommand::Filter, GetCommand::OtherState] {
                    let _ = decode_telemetry(family, get, &bytes);
                }
            }
        }
    }
}
