//! Auto-test toggle request byte and acknowledgement classification.
//!
//! The device is authoritative: the local running flag only changes when an
//! acknowledgement arrives, never when a toggle request is sent.

use crate::command::Command;
use crate::error::{Result, WireError};
use crate::frame::Frame;

/// Request byte asking the device to switch auto-test on.
pub const REQUEST_ON: u8 = 0x00;
/// Request byte asking the device to switch auto-test off.
pub const REQUEST_OFF: u8 = 0x01;

pub(crate) fn request_byte(enable: bool) -> u8 {
    if enable { REQUEST_ON } else { REQUEST_OFF }
}

/// Acknowledgement of a `ToggleAutoTest` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTestAck {
    /// Fixed acknowledgement `AA A5 03 05 08 55`: the requested toggle happened.
    Toggled,
    /// Echo carrying the device's actual state.
    State { running: bool },
}

impl AutoTestAck {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        match payload {
            [] => Ok(Self::Toggled),
            [REQUEST_ON] => Ok(Self::State { running: true }),
            [REQUEST_OFF] => Ok(Self::State { running: false }),
            [other] => Err(WireError::malformed("auto-test state byte").with_raw(&[*other])),
            _ => Err(WireError::unexpected_length(
                Command::ToggleAutoTest.name(),
                1,
                payload.len(),
            )
            .with_raw(payload)),
        }
    }

    /// New running state, given the state before the acknowledgement.
    pub fn apply(self, running: bool) -> bool {
        match self {
            Self::Toggled => !running,
            Self::State { running } => running,
        }
    }
}

/// Classify a frame as an auto-test acknowledgement and return the new
/// running state, or `None` if the frame is not one.
pub fn classify_auto_test_ack(frame: &Frame, running: bool) -> Option<bool> {
    if frame.command != Command::ToggleAutoTest {
        return None;
    }
    AutoTestAck::decode(&frame.payload)
        .ok()
        .map(|ack| ack.apply(running))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ack_flips_state() {
        let frame = Frame::decode(&[0xAA, 0xA5, 0x03, 0x05, 0x08, 0x55]).unwrap();
        assert_eq!(classify_auto_test_ack(&frame, true), Some(false));
        assert_eq!(classify_auto_test_ack(&frame, false), Some(true));
    }

    #[test]
    fn echo_reports_actual_state() {
        let on = Frame::new(Command::ToggleAutoTest, vec![REQUEST_ON]);
        let off = Frame::new(Command::ToggleAutoTest, vec![REQUEST_OFF]);
        assert_eq!(classify_auto_test_ack(&on, false), Some(true));
        assert_eq!(classify_auto_test_ack(&on, true), Some(true));
        assert_eq!(classify_auto_test_ack(&off, true), Some(false));
    }

    #[test]
    fn other_frames_are_not_acks() {
        let frame = Frame::new(Command::TestTemperature, vec![0x00, 0xC8]);
        assert_eq!(classify_auto_test_ack(&frame, true), None);
        let garbage = Frame::new(Command::ToggleAutoTest, vec![0x07]);
        assert_eq!(classify_auto_test_ack(&garbage, true), None);
    }

    #[test]
    fn request_bytes() {
        assert_eq!(request_byte(true), 0x00);
        assert_eq!(request_byte(false), 0x01);
    }
}
