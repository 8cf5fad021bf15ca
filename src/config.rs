//! Session and serial-port settings.

use std::time::Duration;

use crate::frame::DEFAULT_MAX_BUFFER;

/// Bound on a single frame write before the connection is declared lost.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default serial line speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Protocol session settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Write timeout handed to the transport on every send.
    pub write_timeout: Duration,
    /// Cap on receive-buffer bytes held while a frame is incomplete.
    pub max_buffer: usize,
    /// Auto-test state assumed until the device acknowledges a toggle.
    /// The module powers up with auto-test on.
    pub assume_auto_test_running: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_timeout: WRITE_TIMEOUT,
            max_buffer: DEFAULT_MAX_BUFFER,
            assume_auto_test_running: true,
        }
    }
}

/// Serial port settings (8N1).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    pub baud_rate: u32,
    /// How often the reader thread wakes to check for shutdown.
    pub read_poll: Duration,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_poll: Duration::from_millis(100),
        }
    }
}
