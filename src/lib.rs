pub mod codec;
pub mod command;
pub mod config;
pub mod conn;
pub mod display;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod seq;
pub mod session;

pub use codec::Temperature;
pub use command::Command;
pub use config::{SerialConfig, SessionConfig};
pub use conn::{ConnError, Inbound, Transport};
pub use error::WireError;
pub use frame::{Frame, StreamAssembler};
pub use protocol::{CalibrationKind, CalibrationOutcome, Message, Request};
pub use session::{Event, Session, SessionError};

#[cfg(feature = "serial")]
pub use conn::SerialTransport;
