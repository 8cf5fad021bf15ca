//! Message types and decode/encode dispatch.
//!
//! - [`Request`]: frames we send to the thermometer (host → device)
//! - [`Message`]: frames the thermometer sends to us (device → host)
//!
//! Every command byte is bidirectional: the device answers a request with a
//! frame carrying the same command byte and a result payload.

pub mod auto_test;
pub mod calibration;

use crate::codec::Temperature;
use crate::command::Command;
use crate::error::{Result, WireError};
use crate::frame::{Frame, hex};

pub use auto_test::AutoTestAck;
pub use calibration::{CalibrationKind, CalibrationOutcome};

// ---------------------------------------------------------------------------
// Request: frames we send to the thermometer
// ---------------------------------------------------------------------------

/// A command frame we send to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Take one reading. No payload.
    TestTemperature,
    /// Run a calibration routine against a reference temperature.
    Calibrate {
        kind: CalibrationKind,
        temperature: Temperature,
    },
    /// Ask the device to switch auto-test on (`true`) or off (`false`).
    ToggleAutoTest { enable: bool },
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::TestTemperature => Command::TestTemperature,
            Request::Calibrate { kind, .. } => kind.command(),
            Request::ToggleAutoTest { .. } => Command::ToggleAutoTest,
        }
    }

    /// Encode into a `Frame` ready for wire transmission.
    pub fn encode(&self) -> Frame {
        let payload = match self {
            Request::TestTemperature => vec![],
            Request::Calibrate { temperature, .. } => temperature.encode(),
            Request::ToggleAutoTest { enable } => vec![auto_test::request_byte(*enable)],
        };
        Frame::new(self.command(), payload)
    }

    /// Format as a hex debug line: `"host→CAL-NTC 8B | AA A5 04 02 00 FA 00 55"`.
    pub fn debug_hex(&self) -> String {
        let wire = self.encode().encode();
        format!("host→{} {}B | {}", self.command(), wire.len(), hex(&wire))
    }
}

// ---------------------------------------------------------------------------
// Message: frames the thermometer sends to us
// ---------------------------------------------------------------------------

/// A frame the device sends to us.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Reading from a `TestTemperature` request (or an auto-test cycle).
    Measurement { temperature: Temperature },
    /// Raw result code of a calibration routine. Classify with
    /// [`CalibrationOutcome::from_code`].
    CalibrationResult { kind: CalibrationKind, code: u8 },
    /// Acknowledgement of a `ToggleAutoTest` request.
    AutoTest(AutoTestAck),
}

impl Message {
    /// Decode a `Frame` into a typed `Message`.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let p = &frame.payload;
        match frame.command {
            Command::TestTemperature => {
                if p.len() != 2 {
                    return Err(WireError::unexpected_length(frame.command.name(), 2, p.len())
                        .with_raw(p));
                }
                Ok(Message::Measurement {
                    temperature: Temperature::decode(p, frame.command.name())?,
                })
            }
            Command::CalibrateNtc | Command::CalibrateLowInfrared | Command::CalibrateHighInfrared => {
                let kind = CalibrationKind::from_command(frame.command)
                    .ok_or(WireError::UnknownCommand { code: frame.command.as_byte() })?;
                match p.as_slice() {
                    [code] => Ok(Message::CalibrationResult { kind, code: *code }),
                    _ => Err(WireError::unexpected_length(frame.command.name(), 1, p.len())
                        .with_raw(p)),
                }
            }
            Command::ToggleAutoTest => Ok(Message::AutoTest(AutoTestAck::decode(p)?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
