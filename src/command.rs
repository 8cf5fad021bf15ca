use std::fmt;

use crate::error::{Result, WireError};

/// Command bytes understood by the thermometer module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Command {
    /// Take one temperature reading
    TestTemperature = 0x01,
    /// Calibrate the NTC (contact) sensor against ambient
    CalibrateNtc = 0x02,
    /// Calibrate the infrared sensor at the low reference point
    CalibrateLowInfrared = 0x03,
    /// Calibrate the infrared sensor at the high reference point
    CalibrateHighInfrared = 0x04,
    /// Switch the continuous auto-test loop on or off
    ToggleAutoTest = 0x05,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::TestTemperature,
        Command::CalibrateNtc,
        Command::CalibrateLowInfrared,
        Command::CalibrateHighInfrared,
        Command::ToggleAutoTest,
    ];

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x01 => Ok(Self::TestTemperature),
            0x02 => Ok(Self::CalibrateNtc),
            0x03 => Ok(Self::CalibrateLowInfrared),
            0x04 => Ok(Self::CalibrateHighInfrared),
            0x05 => Ok(Self::ToggleAutoTest),
            _ => Err(WireError::UnknownCommand { code: b }),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Static name, used in error context.
    pub fn name(self) -> &'static str {
        match self {
            Self::TestTemperature => "TestTemperature",
            Self::CalibrateNtc => "CalibrateNtc",
            Self::CalibrateLowInfrared => "CalibrateLowInfrared",
            Self::CalibrateHighInfrared => "CalibrateHighInfrared",
            Self::ToggleAutoTest => "ToggleAutoTest",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestTemperature => write!(f, "TEST"),
            Self::CalibrateNtc => write!(f, "CAL-NTC"),
            Self::CalibrateLowInfrared => write!(f, "CAL-IR-LOW"),
            Self::CalibrateHighInfrared => write!(f, "CAL-IR-HIGH"),
            Self::ToggleAutoTest => write!(f, "AUTO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for cmd in Command::ALL {
            assert_eq!(Command::from_byte(cmd.as_byte()).unwrap(), cmd);
        }
    }

    #[test]
    fn bytes_are_sequential() {
        let bytes: Vec<u8> = Command::ALL.iter().map(|c| c.as_byte()).collect();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            Command::from_byte(0x06),
            Err(WireError::UnknownCommand { code: 0x06 })
        );
        assert!(Command::from_byte(0x00).is_err());
    }
}
