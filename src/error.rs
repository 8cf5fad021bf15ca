use thiserror::Error;

/// Errors arising from frame parsing, stream assembly, and field encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    #[error("malformed frame: {reason}{}", format_raw_suffix(raw))]
    MalformedFrame {
        reason: &'static str,
        /// Raw wire bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("checksum mismatch (expected 0x{expected:02X}, computed 0x{computed:02X})")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("unknown command byte 0x{code:02X}")]
    UnknownCommand { code: u8 },

    #[error("unexpected payload length for {command}: expected {expected}, got {got}{}", format_raw_suffix(raw))]
    UnexpectedLength {
        command: &'static str,
        expected: usize,
        got: usize,
        /// Raw payload bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("receive buffer overflow ({len} bytes pending, limit {max})")]
    BufferOverflow { len: usize, max: usize },

    #[error("temperature {value} is outside the encodable range")]
    TemperatureOutOfRange { value: f64 },

    #[error("invalid temperature {input:?}")]
    InvalidTemperature { input: String },
}

impl WireError {
    /// Create a `MalformedFrame` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn malformed(reason: &'static str) -> Self {
        Self::MalformedFrame { reason, raw: Vec::new() }
    }

    /// Create an `UnexpectedLength` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn unexpected_length(command: &'static str, expected: usize, got: usize) -> Self {
        Self::UnexpectedLength { command, expected, got, raw: Vec::new() }
    }

    /// Attach raw bytes to decode-phase errors for diagnostics.
    pub fn with_raw(self, bytes: &[u8]) -> Self {
        match self {
            Self::MalformedFrame { reason, .. } => Self::MalformedFrame { reason, raw: bytes.to_vec() },
            Self::UnexpectedLength { command, expected, got, .. } => {
                Self::UnexpectedLength { command, expected, got, raw: bytes.to_vec() }
            }
            other => other,
        }
    }
}

/// Format raw bytes as a suffix like " | AA A5 03 05 ..." (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    format!(" | {}", crate::frame::hex(raw))
}

pub type Result<T> = std::result::Result<T, WireError>;
