//! Command-line control surface for a thermometer module on a serial port.
//!
//! Usage:
//!   thermocal --port /dev/ttyUSB0 measure
//!   thermocal --port /dev/ttyUSB0 calibrate ntc 25.0
//!   thermocal --port /dev/ttyUSB0 toggle-auto-test
//!   thermocal --port /dev/ttyUSB0 --json monitor
//!
//! Events go to stdout (one per line); logs go to stderr (`RUST_LOG`).

use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use thermocal::config::DEFAULT_BAUD_RATE;
use thermocal::display::{self, DisplaySink, Line};
use thermocal::{
    CalibrationKind, Event, SerialConfig, SerialTransport, Session, SessionConfig, Temperature,
};

/// How long one `pump` call may block, so deadlines are honoured.
const POLL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "thermocal", version, about = "Measure and calibrate an NTC/infrared thermometer module")]
struct Cli {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Frame write timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    write_timeout_ms: u64,

    /// Auto-test state to assume until the device confirms a toggle
    #[arg(long, value_enum, default_value_t = Switch::On)]
    assume_auto_test: Switch,

    /// Seconds to wait for the device to answer
    #[arg(long, default_value_t = 10)]
    wait_secs: u64,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Ntc,
    LowIr,
    HighIr,
}

impl From<Kind> for CalibrationKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Ntc => CalibrationKind::Ntc,
            Kind::LowIr => CalibrationKind::LowInfrared,
            Kind::HighIr => CalibrationKind::HighInfrared,
        }
    }
}

#[derive(Clone, Copy, Subcommand)]
enum Cmd {
    /// Take one temperature reading
    Measure,
    /// Run a calibration routine against a reference temperature (°C)
    Calibrate {
        #[arg(value_enum)]
        kind: Kind,
        #[arg(allow_negative_numbers = true)]
        temperature: Temperature,
    },
    /// Flip the device's continuous auto-test mode
    ToggleAutoTest,
    /// Print everything the device sends until interrupted
    Monitor,
}

impl Cmd {
    /// Whether `event` completes this command.
    fn is_done(self, event: &Event) -> bool {
        match self {
            Cmd::Measure => matches!(event, Event::MeasurementReceived { .. }),
            Cmd::Calibrate { .. } => matches!(event, Event::CalibrationOutcomeReceived { .. }),
            Cmd::ToggleAutoTest => matches!(event, Event::AutoTestStateChanged { .. }),
            Cmd::Monitor => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

struct Stdout;

impl DisplaySink for Stdout {
    fn show(&mut self, line: Line) {
        println!("{line}");
    }
}

fn emit(events: &[Event], json: bool) -> Result<(), String> {
    if json {
        for event in events {
            let text = serde_json::to_string(event).map_err(|e| e.to_string())?;
            println!("{text}");
        }
    } else {
        display::show_all(&mut Stdout, events);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("thermocal=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let session_config = SessionConfig {
        write_timeout: Duration::from_millis(cli.write_timeout_ms),
        assume_auto_test_running: cli.assume_auto_test == Switch::On,
        ..SessionConfig::default()
    };
    let serial_config = SerialConfig {
        baud_rate: cli.baud,
        ..SerialConfig::new(cli.port.as_str())
    };

    let (transport, rx) = SerialTransport::open(&serial_config, session_config.write_timeout)
        .map_err(|e| format!("connection failed: {e}"))?;
    let mut session = Session::new(session_config);
    session.attach(transport);
    emit(&session.take_events(), cli.json)?;

    let sent = match cli.command {
        Cmd::Measure => session.send_test_temperature(),
        Cmd::Calibrate { kind, temperature } => session.send_calibration(kind.into(), temperature),
        Cmd::ToggleAutoTest => session.toggle_auto_test(),
        Cmd::Monitor => Ok(()),
    };
    emit(&session.take_events(), cli.json)?;
    sent.map_err(|e| e.to_string())?;

    let wait = Duration::from_secs(cli.wait_secs);
    let deadline = Instant::now() + wait;
    let outcome = loop {
        let timeout = match cli.command {
            Cmd::Monitor => POLL,
            _ => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    session.close();
                    return Err(format!("no answer from device within {wait:?}"));
                }
                remaining.min(POLL)
            }
        };

        let events = session.pump(&rx, timeout);
        emit(&events, cli.json)?;
        if let Some(Event::Disconnected { reason }) =
            events.iter().find(|e| matches!(e, Event::Disconnected { .. }))
        {
            return Err(reason.clone());
        }
        if let Some(done) = events.iter().find(|e| cli.command.is_done(e)) {
            break done.clone();
        }
    };

    session.close();
    match outcome {
        Event::CalibrationOutcomeReceived { kind, outcome } if !outcome.is_success() => {
            Err(format!("{kind} calibration failed: {}", outcome.description()))
        }
        _ => Ok(()),
    }
}
