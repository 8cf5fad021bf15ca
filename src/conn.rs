//! Transport seam between the protocol session and a byte channel.
//!
//! Outbound frames go through [`Transport::write`]. Inbound bytes arrive on
//! the transport's own thread and are handed to the session through a
//! single-consumer [`crossbeam_channel`] of [`Inbound`] items, so all decoding
//! happens on one processing thread. No application logic lives here.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// An item delivered by a transport's reader to the processing thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Raw bytes as read; may hold partial or multiple frames.
    Bytes(Vec<u8>),
    /// The reader stopped on an I/O failure. Terminal.
    Lost(String),
}

/// Errors from transport operations.
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("write timed out after {timeout:?}")]
    WriteTimeout { timeout: Duration },

    #[error("transport closed")]
    Closed,
}

impl ConnError {
    /// Map an I/O error from a bounded write, folding timeouts into `WriteTimeout`.
    pub fn from_write(e: io::Error, timeout: Duration) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnError::WriteTimeout { timeout },
            _ => ConnError::Io(e),
        }
    }
}

/// A raw duplex byte channel to the device.
pub trait Transport {
    /// Write one complete frame, failing rather than blocking past `timeout`.
    fn write(&mut self, data: &[u8], timeout: Duration) -> Result<(), ConnError>;

    /// Release the device. Once this returns no further [`Inbound`] items are
    /// produced.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8], timeout: Duration) -> Result<(), ConnError> {
        (**self).write(data, timeout)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use std::io::{self, Read, Write};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use crossbeam_channel::{Receiver, Sender};
    use serialport::{DataBits, Parity, SerialPort, StopBits};
    use tracing::{debug, error};

    use super::{ConnError, Inbound, Transport};
    use crate::config::SerialConfig;

    /// Serial port transport (8N1) with a background reader thread.
    pub struct SerialTransport {
        port: Option<Box<dyn SerialPort>>,
        write_timeout: Duration,
        stop: Arc<AtomicBool>,
        reader: Option<JoinHandle<()>>,
    }

    impl SerialTransport {
        /// Open the port and start the reader thread. The returned receiver is
        /// the single consumer of everything the device sends.
        pub fn open(
            config: &SerialConfig,
            write_timeout: Duration,
        ) -> Result<(Self, Receiver<Inbound>), ConnError> {
            let port = serialport::new(config.path.as_str(), config.baud_rate)
                .data_bits(DataBits::Eight)
                .stop_bits(StopBits::One)
                .parity(Parity::None)
                .timeout(write_timeout)
                .open()
                .map_err(io::Error::from)?;

            let mut reader = port.try_clone().map_err(io::Error::from)?;
            reader
                .set_timeout(config.read_poll)
                .map_err(io::Error::from)?;

            let (tx, rx) = crossbeam_channel::unbounded();
            let stop = Arc::new(AtomicBool::new(false));
            let handle = {
                let stop = Arc::clone(&stop);
                thread::Builder::new()
                    .name("thermocal-rx".into())
                    .spawn(move || read_loop(reader, tx, stop))?
            };
            debug!(path = %config.path, baud = config.baud_rate, "serial port open");

            Ok((
                Self {
                    port: Some(port),
                    write_timeout,
                    stop,
                    reader: Some(handle),
                },
                rx,
            ))
        }
    }

    fn read_loop(mut port: Box<dyn SerialPort>, tx: Sender<Inbound>, stop: Arc<AtomicBool>) {
        let mut buf = [0u8; 1024];
        while !stop.load(Ordering::Acquire) {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    if tx.send(Inbound::Bytes(buf[..n].to_vec())).is_err() {
                        break; // consumer gone
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "serial read failed");
                    let _ = tx.send(Inbound::Lost(e.to_string()));
                    break;
                }
            }
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8], timeout: Duration) -> Result<(), ConnError> {
            let port = self.port.as_mut().ok_or(ConnError::Closed)?;
            if timeout != self.write_timeout {
                port.set_timeout(timeout).map_err(io::Error::from)?;
                self.write_timeout = timeout;
            }
            port.write_all(data)
                .and_then(|()| port.flush())
                .map_err(|e| ConnError::from_write(e, timeout))
        }

        fn close(&mut self) {
            self.stop.store(true, Ordering::Release);
            if let Some(handle) = self.reader.take() {
                let _ = handle.join();
            }
            self.port = None;
        }
    }

    impl Drop for SerialTransport {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_kinds_map_to_write_timeout() {
        let timeout = Duration::from_secs(2);
        let err = ConnError::from_write(io::Error::from(io::ErrorKind::TimedOut), timeout);
        assert!(matches!(err, ConnError::WriteTimeout { timeout: t } if t == timeout));

        let err = ConnError::from_write(io::Error::from(io::ErrorKind::BrokenPipe), timeout);
        assert!(matches!(err, ConnError::Io(_)));
    }

    #[test]
    fn display() {
        let err = ConnError::WriteTimeout {
            timeout: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "write timed out after 2s");
    }
}
