//! Frame parsing, encoding, checksum, and stream assembly.
//!
//! Wire format:
//! ```text
//! AA A5 LEN CMD PAYLOAD(0-2)... CS 55
//! ```
//!
//! `LEN` counts `CMD + PAYLOAD + CS`. `CS` is the low byte of
//! `LEN + CMD + sum(PAYLOAD)`. The device's own auto-test acknowledgement
//! (`AA A5 03 05 08 55`) counts the `LEN` byte as well; both layouts are
//! accepted on receive.

use crate::command::Command;
use crate::error::{Result, WireError};

pub const HEAD_1: u8 = 0xAA;
pub const HEAD_2: u8 = 0xA5;
pub const FOOT: u8 = 0x55;

/// Head + LEN + CMD + CS + foot.
const OVERHEAD: usize = 6;
/// Smallest legal `LEN` (no payload, length byte not counted).
const MIN_LENGTH: usize = 2;
/// Largest legal `LEN` (2-byte payload, length byte counted).
const MAX_LENGTH: usize = 5;
/// No command carries more than a 2-byte payload.
pub const MAX_PAYLOAD: usize = 2;

/// Longest possible wire frame.
pub const MAX_FRAME_LEN: usize = MAX_LENGTH + 4;

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Declared length byte, as sent or received.
    pub length: u8,
    pub command: Command,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build an outbound frame; `length` is `1 (command) + payload + 1 (checksum)`.
    pub fn new(command: Command, payload: Vec<u8>) -> Self {
        let length = (payload.len() + 2) as u8;
        Self { length, command, payload }
    }

    pub fn checksum(&self) -> u8 {
        checksum(self.length, self.command.as_byte(), &self.payload)
    }

    /// Parse a byte slice that spans exactly one frame (head marker through foot marker).
    pub fn decode(wire: &[u8]) -> Result<Self> {
        Self::decode_inner(wire).map_err(|e| e.with_raw(wire))
    }

    fn decode_inner(wire: &[u8]) -> Result<Self> {
        if wire.len() < OVERHEAD {
            return Err(WireError::malformed("frame too short"));
        }
        if wire[0] != HEAD_1 || wire[1] != HEAD_2 {
            return Err(WireError::malformed("missing head marker"));
        }
        if wire[wire.len() - 1] != FOOT {
            return Err(WireError::malformed("missing foot marker"));
        }

        let length = wire[2];
        let payload_len = wire.len() - OVERHEAD;
        if payload_len > MAX_PAYLOAD {
            return Err(WireError::malformed("payload longer than 2 bytes"));
        }
        let declared = length as usize;
        if declared != payload_len + 2 && declared != payload_len + 3 {
            return Err(WireError::malformed("length field disagrees with frame size"));
        }

        let code = wire[3];
        let payload = &wire[4..4 + payload_len];
        let received = wire[4 + payload_len];
        let computed = checksum(length, code, payload);
        if received != computed {
            return Err(WireError::ChecksumMismatch {
                expected: received,
                computed,
            });
        }

        Ok(Frame {
            length,
            command: Command::from_byte(code)?,
            payload: payload.to_vec(),
        })
    }

    /// Encode into a complete wire frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(OVERHEAD + self.payload.len());
        wire.push(HEAD_1);
        wire.push(HEAD_2);
        wire.push(self.length);
        wire.push(self.command.as_byte());
        wire.extend_from_slice(&self.payload);
        wire.push(self.checksum());
        wire.push(FOOT);
        wire
    }
}

/// Low byte of `length + command + sum(payload)`.
pub fn checksum(length: u8, command: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(length.wrapping_add(command), |acc, &b| acc.wrapping_add(b))
}

/// Format bytes as space-separated hex: `"AA A5 03 05 08 55"`.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Stream assembly
// ---------------------------------------------------------------------------

/// Default cap on bytes held while waiting for a frame to complete.
pub const DEFAULT_MAX_BUFFER: usize = 256;

/// Accumulates transport reads and yields complete frames.
///
/// Reads may split a frame or carry several frames back to back; partial
/// data stays buffered for the next call. Frame ends are located from the
/// `LEN` byte and the foot marker is verified there, so a payload byte equal
/// to `0x55` never ends a frame early.
pub struct StreamAssembler {
    buf: Vec<u8>,
    max_buffer: usize,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buf: Vec::with_capacity(64),
            max_buffer,
        }
    }

    /// Bytes currently held back waiting for more data.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Feed new data and extract every complete frame, in arrival order.
    ///
    /// Rejected candidates come back as `Err` entries so the caller can log
    /// them; the stream keeps going either way.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<Frame>> {
        self.buf.extend_from_slice(data);
        let mut out = Vec::new();

        loop {
            // Find head marker
            let start = match self.buf.windows(2).position(|w| w == [HEAD_1, HEAD_2]) {
                Some(pos) => pos,
                None => {
                    // A lone trailing 0xAA may be the first half of a head marker.
                    let keep = usize::from(self.buf.last() == Some(&HEAD_1));
                    let drop = self.buf.len() - keep;
                    self.buf.drain(..drop);
                    break;
                }
            };

            // Discard any bytes before the head marker
            if start > 0 {
                self.buf.drain(..start);
            }

            if self.buf.len() < 3 {
                break;
            }

            let declared = self.buf[2] as usize;
            if !(MIN_LENGTH..=MAX_LENGTH).contains(&declared) {
                out.push(Err(
                    WireError::malformed("length field out of range").with_raw(&self.buf[..3])
                ));
                self.buf.drain(..2);
                continue;
            }

            // Self-counting layout (device acks). A valid regular frame cannot
            // also parse this way: its checksum would have to be 0x55 and even.
            let short = declared + 3;
            if declared > MIN_LENGTH && self.buf.len() >= short && self.buf[short - 1] == FOOT {
                if let Ok(frame) = Frame::decode(&self.buf[..short]) {
                    self.buf.drain(..short);
                    out.push(Ok(frame));
                    continue;
                }
            }

            let end = declared + 4;
            if self.buf.len() < end {
                break; // incomplete frame
            }

            if self.buf[end - 1] != FOOT {
                out.push(Err(
                    WireError::malformed("foot marker not at declared length").with_raw(&self.buf[..end])
                ));
                // Resynchronise on the next head marker.
                self.buf.drain(..2);
                continue;
            }

            out.push(Frame::decode(&self.buf[..end]));
            self.buf.drain(..end);
        }

        if self.buf.len() > self.max_buffer {
            out.push(Err(WireError::BufferOverflow {
                len: self.buf.len(),
                max: self.max_buffer,
            }));
            self.buf.clear();
        }

        out
    }
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
