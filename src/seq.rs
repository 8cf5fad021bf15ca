//! Calibration sequencing around the auto-test loop.
//!
//! The firmware cannot calibrate while its auto-test loop drives the sensor.
//! [`CalibrationSeq`] serializes the two: a calibration requested while
//! auto-test runs first asks the device to stop, waits for the confirming
//! acknowledgement, then sends the real calibration.
//!
//! The sequencer does no I/O. Each step returns the [`Request`]s the caller
//! must put on the wire.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::Temperature;
use crate::protocol::calibration::classify_calibration;
use crate::protocol::{CalibrationKind, CalibrationOutcome, Request};

/// A calibration held back until auto-test is confirmed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRequest {
    pub kind: CalibrationKind,
    pub temperature: Temperature,
}

impl CalibrationRequest {
    fn to_request(self) -> Request {
        Request::Calibrate {
            kind: self.kind,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqState {
    Idle,
    WaitingForAutoTestOff(CalibrationRequest),
    AwaitingCalibrationResult(CalibrationKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeqError {
    #[error("a calibration is already in progress ({0:?})")]
    Busy(SeqState),
}

/// Calibration / auto-test state machine.
#[derive(Debug, Clone)]
pub struct CalibrationSeq {
    state: SeqState,
    auto_test_running: bool,
}

impl CalibrationSeq {
    /// `auto_test_running` is the assumed device state until the first ack.
    pub fn new(auto_test_running: bool) -> Self {
        Self {
            state: SeqState::Idle,
            auto_test_running,
        }
    }

    pub fn state(&self) -> SeqState {
        self.state
    }

    pub fn auto_test_running(&self) -> bool {
        self.auto_test_running
    }

    /// Start a calibration. Rejected unless idle.
    pub fn request_calibration(
        &mut self,
        kind: CalibrationKind,
        temperature: Temperature,
    ) -> Result<Request, SeqError> {
        if self.state != SeqState::Idle {
            return Err(SeqError::Busy(self.state));
        }
        Ok(self.begin(CalibrationRequest { kind, temperature }))
    }

    fn begin(&mut self, req: CalibrationRequest) -> Request {
        if self.auto_test_running {
            debug!(kind = %req.kind, "auto-test running, requesting it off before calibrating");
            self.state = SeqState::WaitingForAutoTestOff(req);
            Request::ToggleAutoTest { enable: false }
        } else {
            self.state = SeqState::AwaitingCalibrationResult(req.kind);
            req.to_request()
        }
    }

    /// Apply a confirmed auto-test state. Returns the held calibration if it
    /// can now be sent.
    pub fn on_auto_test_state(&mut self, running: bool) -> Option<Request> {
        self.auto_test_running = running;
        match self.state {
            SeqState::WaitingForAutoTestOff(req) if !running => {
                debug!(kind = %req.kind, "auto-test confirmed off, sending calibration");
                Some(self.begin(req))
            }
            SeqState::WaitingForAutoTestOff(_) => {
                warn!("auto-test acknowledged as running while waiting for it to stop");
                None
            }
            SeqState::Idle | SeqState::AwaitingCalibrationResult(_) => None,
        }
    }

    /// Classify a calibration result. Completes the sequence when it answers
    /// the calibration in flight.
    pub fn on_calibration_result(&mut self, kind: CalibrationKind, code: u8) -> CalibrationOutcome {
        let outcome = classify_calibration(code);
        match self.state {
            SeqState::AwaitingCalibrationResult(expected) => {
                if expected != kind {
                    warn!(%expected, got = %kind, "calibration result for a different routine");
                }
                self.state = SeqState::Idle;
            }
            state => warn!(?state, %kind, "unsolicited calibration result"),
        }
        if let CalibrationOutcome::UnknownResult(code) = outcome {
            warn!(code, %kind, "unrecognized calibration result code");
        } else {
            info!(%kind, ?outcome, "calibration finished");
        }
        outcome
    }

    /// Drop any calibration in flight (e.g. after connection loss).
    pub fn reset(&mut self) {
        self.state = SeqState::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t25() -> Temperature {
        Temperature::from_celsius(25.0).unwrap()
    }

    #[test]
    fn calibrate_immediately_when_auto_test_off() {
        let mut seq = CalibrationSeq::new(false);
        let req = seq.request_calibration(CalibrationKind::Ntc, t25()).unwrap();
        assert_eq!(
            req,
            Request::Calibrate {
                kind: CalibrationKind::Ntc,
                temperature: t25()
            }
        );
        assert_eq!(seq.state(), SeqState::AwaitingCalibrationResult(CalibrationKind::Ntc));
    }

    #[test]
    fn disable_auto_test_first() {
        let mut seq = CalibrationSeq::new(true);
        let req = seq.request_calibration(CalibrationKind::Ntc, t25()).unwrap();
        assert_eq!(req, Request::ToggleAutoTest { enable: false });
        assert!(matches!(seq.state(), SeqState::WaitingForAutoTestOff(_)));
        // Sending the toggle does not change the assumed state.
        assert!(seq.auto_test_running());

        let next = seq.on_auto_test_state(false).unwrap();
        assert_eq!(next.encode().payload, vec![0x00, 0xFA]);
        assert_eq!(seq.state(), SeqState::AwaitingCalibrationResult(CalibrationKind::Ntc));
        assert!(!seq.auto_test_running());

        let outcome = seq.on_calibration_result(CalibrationKind::Ntc, 0);
        assert!(outcome.is_success());
        assert_eq!(seq.state(), SeqState::Idle);
    }

    #[test]
    fn replays_the_requested_kind() {
        let mut seq = CalibrationSeq::new(true);
        let temp = Temperature::from_tenths(450);
        seq.request_calibration(CalibrationKind::HighInfrared, temp).unwrap();
        assert_eq!(
            seq.on_auto_test_state(false),
            Some(Request::Calibrate {
                kind: CalibrationKind::HighInfrared,
                temperature: temp
            })
        );
    }

    #[test]
    fn unexpected_on_ack_keeps_waiting() {
        let mut seq = CalibrationSeq::new(true);
        seq.request_calibration(CalibrationKind::LowInfrared, t25()).unwrap();
        assert_eq!(seq.on_auto_test_state(true), None);
        assert!(matches!(seq.state(), SeqState::WaitingForAutoTestOff(_)));
        assert!(seq.on_auto_test_state(false).is_some());
    }

    #[test]
    fn second_request_rejected_while_busy() {
        let mut seq = CalibrationSeq::new(true);
        seq.request_calibration(CalibrationKind::Ntc, t25()).unwrap();
        assert!(matches!(
            seq.request_calibration(CalibrationKind::Ntc, t25()),
            Err(SeqError::Busy(SeqState::WaitingForAutoTestOff(_)))
        ));
        seq.on_auto_test_state(false);
        assert!(matches!(
            seq.request_calibration(CalibrationKind::Ntc, t25()),
            Err(SeqError::Busy(SeqState::AwaitingCalibrationResult(_)))
        ));
    }

    #[test]
    fn idle_ack_only_updates_state() {
        let mut seq = CalibrationSeq::new(true);
        assert_eq!(seq.on_auto_test_state(false), None);
        assert_eq!(seq.state(), SeqState::Idle);
        assert!(!seq.auto_test_running());
    }

    #[test]
    fn unknown_code_completes_without_panic() {
        let mut seq = CalibrationSeq::new(false);
        seq.request_calibration(CalibrationKind::Ntc, t25()).unwrap();
        assert_eq!(
            seq.on_calibration_result(CalibrationKind::Ntc, 9),
            CalibrationOutcome::UnknownResult(9)
        );
        assert_eq!(seq.state(), SeqState::Idle);
    }

    #[test]
    fn unsolicited_result_leaves_wait_intact() {
        let mut seq = CalibrationSeq::new(true);
        seq.request_calibration(CalibrationKind::Ntc, t25()).unwrap();
        seq.on_calibration_result(CalibrationKind::Ntc, 1);
        assert!(matches!(seq.state(), SeqState::WaitingForAutoTestOff(_)));
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut seq = CalibrationSeq::new(true);
        seq.request_calibration(CalibrationKind::Ntc, t25()).unwrap();
        seq.reset();
        assert_eq!(seq.state(), SeqState::Idle);
        assert!(seq.request_calibration(CalibrationKind::Ntc, t25()).is_ok());
    }
}
