//! Protocol session: the single processing context for one device.
//!
//! Owns the receive buffer, the auto-test flag and the calibration sequencer.
//! Sends go straight to the transport; inbound bytes are fed in by the caller
//! from the transport's channel, one item at a time. Everything observable is
//! reported as an [`Event`].

use std::io;
use std::mem;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codec::Temperature;
use crate::config::SessionConfig;
use crate::conn::{ConnError, Inbound, Transport};
use crate::frame::{Frame, StreamAssembler, hex};
use crate::protocol::{CalibrationKind, CalibrationOutcome, Message, Request};
use crate::seq::{CalibrationSeq, SeqError, SeqState};

/// Something the display or control surface should know about.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "kebab-case"))]
pub enum Event {
    Connected,
    Disconnected {
        reason: String,
    },
    #[cfg_attr(feature = "serde", serde(rename = "measurement"))]
    MeasurementReceived {
        timestamp: DateTime<Local>,
        /// Degrees Celsius.
        temperature: f64,
    },
    #[cfg_attr(feature = "serde", serde(rename = "calibration-result"))]
    CalibrationOutcomeReceived {
        kind: CalibrationKind,
        outcome: CalibrationOutcome,
    },
    #[cfg_attr(feature = "serde", serde(rename = "auto-test-state"))]
    AutoTestStateChanged {
        running: bool,
    },
}

/// Errors from session commands.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("device not connected")]
    NotConnected,

    #[error("write timed out after {timeout:?}")]
    WriteTimeout { timeout: Duration },

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("a calibration is already in progress")]
    CalibrationInProgress,
}

impl From<ConnError> for SessionError {
    fn from(e: ConnError) -> Self {
        match e {
            ConnError::Io(e) => SessionError::Io(e),
            ConnError::WriteTimeout { timeout } => SessionError::WriteTimeout { timeout },
            ConnError::Closed => SessionError::NotConnected,
        }
    }
}

impl From<SeqError> for SessionError {
    fn from(e: SeqError) -> Self {
        match e {
            SeqError::Busy(_) => SessionError::CalibrationInProgress,
        }
    }
}

/// One protocol session over a transport.
///
/// Feed it from a single consumer (see
/// [`Session::pump`]).
pub struct Session<T: Transport> {
    config: SessionConfig,
    transport: Option<T>,
    assembler: StreamAssembler,
    seq: CalibrationSeq,
    events: Vec<Event>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            assembler: StreamAssembler::with_max_buffer(config.max_buffer),
            seq: CalibrationSeq::new(config.assume_auto_test_running),
            transport: None,
            events: Vec::new(),
            config,
        }
    }

    /// Start using `transport`. Any previous transport is closed first.
    pub fn attach(&mut self, transport: T) {
        if let Some(mut old) = self.transport.take() {
            old.close();
        }
        self.transport = Some(transport);
        self.assembler.clear();
        self.seq.reset();
        info!("connected");
        self.events.push(Event::Connected);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Last auto-test state confirmed by the device (or the configured assumption).
    pub fn auto_test_running(&self) -> bool {
        self.seq.auto_test_running()
    }

    pub fn calibration_state(&self) -> SeqState {
        self.seq.state()
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Ask for one temperature reading.
    pub fn send_test_temperature(&mut self) -> Result<(), SessionError> {
        self.send(Request::TestTemperature)
    }

    /// Run a calibration routine, switching auto-test off first if it runs.
    pub fn send_calibration(
        &mut self,
        kind: CalibrationKind,
        temperature: Temperature,
    ) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let req = self.seq.request_calibration(kind, temperature)?;
        self.send(req)
    }

    /// Ask the device to flip auto-test. The local state only changes on ack.
    /// Rejected while a calibration is in flight.
    pub fn toggle_auto_test(&mut self) -> Result<(), SessionError> {
        if self.seq.state() != SeqState::Idle {
            return Err(SessionError::CalibrationInProgress);
        }
        let enable = !self.seq.auto_test_running();
        self.send(Request::ToggleAutoTest { enable })
    }

    /// Release the transport. No inbound items are produced after this returns.
    pub fn close(&mut self) {
        if self.transport.is_some() {
            info!("disconnected");
            self.disconnect("closed".into());
        }
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Process raw bytes from the transport. Returns all pending events.
    ///
    /// Bytes that arrive after teardown are dropped undecoded.
    pub fn on_bytes_received(&mut self, data: &[u8]) -> Vec<Event> {
        if self.transport.is_none() {
            debug!(len = data.len(), "not connected, dropping inbound bytes");
            return self.take_events();
        }
        for result in self.assembler.feed(data) {
            match result {
                Ok(frame) => self.handle_frame(frame),
                Err(e) => warn!(error = %e, "dropping frame"),
            }
        }
        self.take_events()
    }

    /// Process one item from the transport channel. Returns all pending events.
    pub fn handle(&mut self, inbound: Inbound) -> Vec<Event> {
        match inbound {
            Inbound::Bytes(data) => self.on_bytes_received(&data),
            Inbound::Lost(reason) => {
                if self.transport.is_some() {
                    error!(%reason, "connection lost");
                    self.disconnect(format!("connection lost: {reason}"));
                }
                self.take_events()
            }
        }
    }

    /// Wait up to `timeout` for one item on `rx` and process it.
    pub fn pump(&mut self, rx: &Receiver<Inbound>, timeout: Duration) -> Vec<Event> {
        match rx.recv_timeout(timeout) {
            Ok(inbound) => self.handle(inbound),
            Err(RecvTimeoutError::Timeout) => self.take_events(),
            Err(RecvTimeoutError::Disconnected) => {
                if self.transport.is_some() {
                    error!("reader stopped");
                    self.disconnect("reader stopped".into());
                }
                self.take_events()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn send(&mut self, req: Request) -> Result<(), SessionError> {
        let timeout = self.config.write_timeout;
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        debug!(frame = %req.debug_hex(), "send");
        let wire = req.encode().encode();
        match transport.write(&wire, timeout) {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = SessionError::from(e);
                error!(error = %err, "send failed");
                self.disconnect(err.to_string());
                Err(err)
            }
        }
    }

    fn disconnect(&mut self, reason: String) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.seq.reset();
        self.assembler.clear();
        self.events.push(Event::Disconnected { reason });
    }

    fn handle_frame(&mut self, frame: Frame) {
        debug!(frame = %hex(&frame.encode()), "recv");
        let message = match Message::decode(&frame) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "dropping frame");
                return;
            }
        };

        match message {
            Message::Measurement { temperature } => {
                debug!(%temperature, "measurement");
                self.events.push(Event::MeasurementReceived {
                    timestamp: Local::now(),
                    temperature: temperature.celsius(),
                });
            }
            Message::CalibrationResult { kind, code } => {
                let outcome = self.seq.on_calibration_result(kind, code);
                self.events.push(Event::CalibrationOutcomeReceived { kind, outcome });
            }
            Message::AutoTest(ack) => {
                let running = ack.apply(self.seq.auto_test_running());
                info!(running, "auto-test state confirmed");
                self.events.push(Event::AutoTestStateChanged { running });
                if let Some(req) = self.seq.on_auto_test_state(running) {
                    if let Err(e) = self.send(req) {
                        warn!(error = %e, "could not send pending calibration");
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
