//! JSON-lines ingestion adapter.
//!
//! One line is either a reading object or an operator command:
//!
//! ```text
//!   {"temperature": 46.2, "light": 310, "humidity": 41, "pressure": 1008}
//!   {"temperature": 56.0, "light": 1200, "humidity": 30, "pressure": 1007, "timestamp_ms": 1700000000000}
//!   reset | cancel | status | shutdown
//! ```
//!
//! Readings without a timestamp are stamped by the caller.

use serde::Deserialize;

use crate::app::commands::AppCommand;
use crate::fsm::context::Reading;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Reading(Reading),
    Command(AppCommand),
    /// Print engine status.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    Empty,
    /// Not a known command and not a reading object.
    Unrecognized(String),
}

impl core::fmt::Display for LineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::Unrecognized(detail) => write!(f, "unrecognized input: {detail}"),
        }
    }
}

impl std::error::Error for LineError {}

/// Wire shape of a reading.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireReading {
    temperature: f32,
    light: f32,
    #[serde(default)]
    humidity: f32,
    #[serde(default)]
    pressure: f32,
    timestamp_ms: Option<u64>,
}

/// Parse one line.  `now_ms` stamps readings that carry no timestamp.
pub fn parse_line(line: &str, now_ms: u64) -> Result<Inbound, LineError> {
    let line = line.trim();
    match line {
        "" => return Err(LineError::Empty),
        "reset" => return Ok(Inbound::Command(AppCommand::Reset)),
        "cancel" => return Ok(Inbound::Command(AppCommand::CancelSequence)),
        "shutdown" => return Ok(Inbound::Command(AppCommand::Shutdown)),
        "status" => return Ok(Inbound::Status),
        _ => {}
    }

    let wire: WireReading =
        serde_json::from_str(line).map_err(|e| LineError::Unrecognized(e.to_string()))?;
    Ok(Inbound::Reading(Reading::new(
        wire.temperature,
        wire.light,
        wire.humidity,
        wire.pressure,
        wire.timestamp_ms.unwrap_or(now_ms),
    )))
}
