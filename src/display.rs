//! Rendering session events as display lines.

use std::fmt;

use chrono::{DateTime, Local};

use crate::session::Event;

/// Style tag attached to a display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Style {
    /// Connection and calibration status.
    Status,
    /// Data received from the device.
    Received,
}

/// One line of display output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: Option<Style>,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Something that shows text lines to a user.
pub trait DisplaySink {
    fn show(&mut self, line: Line);
}

impl DisplaySink for Vec<Line> {
    fn show(&mut self, line: Line) {
        self.push(line);
    }
}

/// Measurement timestamp format: `2026-10-19 14:03:27`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Render an event as a display line.
pub fn render(event: &Event) -> Line {
    match event {
        Event::Connected => Line {
            text: "connected".into(),
            style: Some(Style::Status),
        },
        Event::Disconnected { reason } => Line {
            text: format!("disconnected: {reason}"),
            style: Some(Style::Status),
        },
        Event::MeasurementReceived {
            timestamp,
            temperature,
        } => Line {
            text: format!("{}\t\t\t{temperature:.1}℃", format_timestamp(timestamp)),
            style: None,
        },
        Event::CalibrationOutcomeReceived { kind, outcome } => Line {
            text: outcome.report(*kind),
            style: Some(Style::Status),
        },
        Event::AutoTestStateChanged { running } => Line {
            text: format!("auto-test {}", if *running { "on" } else { "off" }),
            style: Some(Style::Received),
        },
    }
}

/// Render and show every event, in order.
pub fn show_all<'a>(sink: &mut dyn DisplaySink, events: impl IntoIterator<Item = &'a Event>) {
    for event in events {
        sink.show(render(event));
    }
}
