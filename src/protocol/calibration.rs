//! Calibration kinds and result-code classification.

use std::fmt;

use crate::command::Command;

/// Which calibration routine to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CalibrationKind {
    Ntc,
    LowInfrared,
    HighInfrared,
}

impl CalibrationKind {
    pub fn command(self) -> Command {
        match self {
            Self::Ntc => Command::CalibrateNtc,
            Self::LowInfrared => Command::CalibrateLowInfrared,
            Self::HighInfrared => Command::CalibrateHighInfrared,
        }
    }

    pub fn from_command(command: Command) -> Option<Self> {
        match command {
            Command::CalibrateNtc => Some(Self::Ntc),
            Command::CalibrateLowInfrared => Some(Self::LowInfrared),
            Command::CalibrateHighInfrared => Some(Self::HighInfrared),
            Command::TestTemperature | Command::ToggleAutoTest => None,
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ntc => write!(f, "NTC"),
            Self::LowInfrared => write!(f, "low-temperature infrared"),
            Self::HighInfrared => write!(f, "high-temperature infrared"),
        }
    }
}

/// Classified calibration result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalibrationOutcome {
    /// 0
    Success,
    /// 1
    BelowOperatingTemperature,
    /// 2
    AboveOperatingTemperature,
    /// 3
    NtcFault,
    /// 4
    InfraredFault,
    /// 5: device and ambient temperatures differ by more than 2.5°.
    NtcCalibrationFailed,
    /// 6
    InfraredSensitivityTooHigh,
    /// 7
    InfraredSensitivityTooLow,
    /// 8
    InfraredZeroPointTooLarge,
    /// Any code outside 0-8. Reported, never fatal.
    UnknownResult(u8),
}

impl CalibrationOutcome {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::BelowOperatingTemperature,
            2 => Self::AboveOperatingTemperature,
            3 => Self::NtcFault,
            4 => Self::InfraredFault,
            5 => Self::NtcCalibrationFailed,
            6 => Self::InfraredSensitivityTooHigh,
            7 => Self::InfraredSensitivityTooLow,
            8 => Self::InfraredZeroPointTooLarge,
            other => Self::UnknownResult(other),
        }
    }

    /// Device result code (the unknown code is preserved).
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::BelowOperatingTemperature => 1,
            Self::AboveOperatingTemperature => 2,
            Self::NtcFault => 3,
            Self::InfraredFault => 4,
            Self::NtcCalibrationFailed => 5,
            Self::InfraredSensitivityTooHigh => 6,
            Self::InfraredSensitivityTooLow => 7,
            Self::InfraredZeroPointTooLarge => 8,
            Self::UnknownResult(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Human-readable description of a failure.
    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "calibration passed",
            Self::BelowOperatingTemperature => "below operating temperature",
            Self::AboveOperatingTemperature => "above operating temperature",
            Self::NtcFault => "NTC fault",
            Self::InfraredFault => "infrared fault",
            Self::NtcCalibrationFailed => {
                "NTC calibration failed, device vs ambient temperature delta > 2.5°"
            }
            Self::InfraredSensitivityTooHigh => {
                "infrared calibration failed, sensor sensitivity too high"
            }
            Self::InfraredSensitivityTooLow => {
                "infrared calibration failed, sensor sensitivity too low"
            }
            Self::InfraredZeroPointTooLarge => "infrared zero point too large",
            Self::UnknownResult(_) => "unrecognized calibration result",
        }
    }

    /// Display line for a result of the given calibration routine.
    pub fn report(self, kind: CalibrationKind) -> String {
        match self {
            Self::Success => format!("{kind} calibration passed"),
            Self::UnknownResult(code) => format!("ERR{code} {}", self.description()),
            other => format!("ERR{} {}", other.code(), other.description()),
        }
    }
}

/// Map a raw calibration result code to its outcome.
pub fn classify_calibration(code: u8) -> CalibrationOutcome {
    CalibrationOutcome::from_code(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_table() {
        let expected = [
            CalibrationOutcome::Success,
            CalibrationOutcome::BelowOperatingTemperature,
            CalibrationOutcome::AboveOperatingTemperature,
            CalibrationOutcome::NtcFault,
            CalibrationOutcome::InfraredFault,
            CalibrationOutcome::NtcCalibrationFailed,
            CalibrationOutcome::InfraredSensitivityTooHigh,
            CalibrationOutcome::InfraredSensitivityTooLow,
            CalibrationOutcome::InfraredZeroPointTooLarge,
        ];
        for (code, outcome) in expected.into_iter().enumerate() {
            assert_eq!(classify_calibration(code as u8), outcome);
            assert_eq!(outcome.code(), code as u8);
        }
    }

    #[test]
    fn code_five_names_delta() {
        let outcome = classify_calibration(5);
        assert_eq!(outcome, CalibrationOutcome::NtcCalibrationFailed);
        let text = outcome.report(CalibrationKind::Ntc);
        assert!(text.starts_with("ERR5 NTC calibration failed"), "{text}");
        assert!(text.contains("> 2.5°"), "{text}");
    }

    #[test]
    fn out_of_range_is_unknown() {
        assert_eq!(classify_calibration(9), CalibrationOutcome::UnknownResult(9));
        assert_eq!(classify_calibration(0xFF), CalibrationOutcome::UnknownResult(0xFF));
        assert_eq!(
            classify_calibration(9).report(CalibrationKind::Ntc),
            "ERR9 unrecognized calibration result"
        );
    }

    #[test]
    fn success_names_kind() {
        assert_eq!(
            CalibrationOutcome::Success.report(CalibrationKind::Ntc),
            "NTC calibration passed"
        );
        assert_eq!(
            CalibrationOutcome::Success.report(CalibrationKind::HighInfrared),
            "high-temperature infrared calibration passed"
        );
    }

    #[test]
    fn kind_command_round_trip() {
        for kind in [
            CalibrationKind::Ntc,
            CalibrationKind::LowInfrared,
            CalibrationKind::HighInfrared,
        ] {
            assert_eq!(CalibrationKind::from_command(kind.command()), Some(kind));
        }
        assert_eq!(CalibrationKind::from_command(Command::ToggleAutoTest), None);
    }
}
