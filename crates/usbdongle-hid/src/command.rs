//! Commands and their per-family opcodes.

use std::fmt;

use usbdongle_core::{DongleFamily, FeatureKind};

/// Bytes at the start of every report that identify the command.
pub const OPCODE_LENGTH: usize = 3;

const KA5_PREFIX: [u8; 2] = [0xc7, 0xa5];
const DAWN_PREFIX: [u8; 2] = [0xc0, 0xa5];

/// A three byte command identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub [u8; OPCODE_LENGTH]);

impl Opcode {
    const fn new(prefix: [u8; 2], code: u8) -> Self {
        Self([prefix[0], prefix[1], code])
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; OPCODE_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

/// Telemetry queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GetCommand {
    Version,
    SampleRate,
    VolumeLevel,
    Filter,
    /// Everything not covered by a dedicated query.
    OtherState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Get(GetCommand),
    Set(FeatureKind),
}

impl Command {
    /// Opcode for this command on `family`, or `None` if the family has no
    /// such command.
    #[must_use]
    pub fn opcode(self, family: DongleFamily) -> Option<Opcode> {
        match family {
            DongleFamily::FiioKa5 => ka5_opcode(self),
            DongleFamily::MoondropDawn => dawn_opcode(self),
        }
    }
}

fn ka5_opcode(command: Command) -> Option<Opcode> {
    let code = match command {
        Command::Get(GetCommand::Version) => 0xa0,
        Command::Get(GetCommand::SampleRate) => 0xa1,
        Command::Get(GetCommand::VolumeLevel) => 0xa2,
        Command::Get(GetCommand::Filter) => 0xa3,
        Command::Get(GetCommand::OtherState) => 0xa4,
        Command::Set(FeatureKind::Filter) => 0x01,
        Command::Set(FeatureKind::Gain) => 0x02,
        Command::Set(FeatureKind::VolumeLevel) => 0x04,
        Command::Set(FeatureKind::ChannelBalance) => 0x05,
        Command::Set(FeatureKind::DacMode) => 0x06,
        Command::Set(FeatureKind::HardwareMute) => 0x07,
        Command::Set(FeatureKind::SpdifOut) => 0x08,
        Command::Set(FeatureKind::DisplayTimeout) => 0x09,
        Command::Set(FeatureKind::HidMode) => 0x0a,
        Command::Set(FeatureKind::DisplayBrightness) => 0x0b,
        Command::Set(FeatureKind::DisplayInvert) => 0x0c,
        Command::Set(FeatureKind::VolumeMode) => 0x0d,
        Command::Set(
            FeatureKind::FirmwareVersion | FeatureKind::SampleRate | FeatureKind::IndicatorState,
        ) => return None,
    };
    Some(Opcode::new(KA5_PREFIX, code))
}

fn dawn_opcode(command: Command) -> Option<Opcode> {
    let code = match command {
        Command::Get(GetCommand::OtherState) => 0xa3,
        Command::Set(FeatureKind::Filter) => 0x01,
        Command::Set(FeatureKind::Gain) => 0x02,
        Command::Set(FeatureKind::VolumeLevel) => 0x04,
        Command::Set(FeatureKind::IndicatorState) => 0x06,
        _ => return None,
    };
    Some(Opcode::new(DAWN_PREFIX, code))
}

/// Queries issued, in order, to rebuild a family's full snapshot.
#[must_use]
pub fn refresh_sequence(family: DongleFamily) -> &'static [GetCommand] {
    match family {
        DongleFamily::FiioKa5 => &[
            GetCommand::Version,
            GetCommand::SampleRate,
            GetCommand::VolumeLevel,
            GetCommand::Filter,
            GetCommand::OtherState,
        ],
        DongleFamily::MoondropDawn => &[GetCommand::OtherState],
    }
}

/// Queries that re-read only the volume, e.g. after the hardware knob moved.
///
/// The Dawn has no dedicated volume query, so its full state read is used.
#[must_use]
pub fn volume_sequence(family: DongleFamily) -> &'static [GetCommand] {
    match family {
        DongleFamily::FiioKa5 => &[GetCommand::VolumeLevel],
        DongleFamily::MoondropDawn => &[GetCommand::OtherState],
    }
}
