//! Port traits: the hexagonal boundary between the engine and its
//! collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FireEngine (domain)
//! ```
//!
//! Driven adapters (camera agent, storage, notifier, event sink, clock)
//! implement these traits.  The [`FireEngine`](super::service::FireEngine)
//! holds them as shared trait objects, because the sequencer worker thread
//! and the ingestion caller both reach them concurrently.  Every port is
//! therefore `Send + Sync` and takes `&self`; adapters with mutable state
//! guard it internally.
//!
//! All port errors are typed and `Copy`, so they can travel inside events.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::fsm::RiskTier;
use crate::fsm::context::Reading;
use crate::sequencer::sequence::SequenceId;
use crate::verdict::Verdict;
use crate::vision::photo::{Photo, PhotoRef};

use super::events::EventRecord;

// ───────────────────────────────────────────────────────────────
// Camera port (engine → remote camera agent)
// ───────────────────────────────────────────────────────────────

/// Command channel to the remote camera agent.
///
/// One call is one capture.  The call blocks for at most `timeout`; the
/// agent may be on another network, so no latency is assumed.  The agent
/// is a single physical camera and never sees concurrent requests.
pub trait CameraPort: Send + Sync {
    fn request_capture(&self, timeout: Duration) -> Result<Photo, CaptureError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (engine → append-only record store)
// ───────────────────────────────────────────────────────────────

/// Append-only record storage with historical queries.
///
/// The engine itself only writes.  [`StoragePort::recent`] serves the
/// reporting features around it.
pub trait StoragePort: Send + Sync {
    /// Append one record.  Appends are never reordered.
    fn append(&self, record: &Record) -> Result<(), StorageError>;

    /// Up to `limit` records of `kind`, newest first.
    fn recent(&self, kind: RecordKind, limit: usize) -> Result<Vec<Record>, StorageError>;

    /// Archive an evidence photo and return its reference.
    fn store_photo(&self, photo: &Photo) -> Result<PhotoRef, StorageError>;
}

/// Unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// A validated reading with the tier the evaluator gave it.
    Reading { reading: Reading, tier: RiskTier },
    Event(EventRecord),
    Verdict(Verdict),
    /// Per-photo result of a sequence.
    Photo(PhotoRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Reading { .. } => RecordKind::Reading,
            Self::Event(_) => RecordKind::Event,
            Self::Verdict(_) => RecordKind::Verdict,
            Self::Photo(_) => RecordKind::Photo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Reading,
    Event,
    Verdict,
    Photo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub sequence_id: SequenceId,
    pub index: u8,
    pub reference: Option<PhotoRef>,
    pub score: f32,
    pub flagged: bool,
    pub received_at_ms: u64,
}

// ───────────────────────────────────────────────────────────────
// Notifier port (engine → notification channel)
// ───────────────────────────────────────────────────────────────

/// Sends the confirmed-fire alert with its evidence photos.
pub trait NotifierPort: Send + Sync {
    fn notify(&self, verdict: &Verdict, evidence: &[Arc<Photo>]) -> Result<(), NotifyError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (engine → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The engine externalizes every transition through this port.
/// Write-only from the engine's perspective.
pub trait EventSink: Send + Sync {
    fn emit(&self, record: &EventRecord);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists engine configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Returns [`EngineConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<EngineConfig, ConfigError>;

    fn save(&self, config: &EngineConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for record and event timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`CameraPort::request_capture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureError {
    /// No answer within the request timeout.
    Timeout,
    /// The agent could not be reached at all.
    Unavailable,
    /// A reply arrived but did not decode to a photo.
    Corrupt,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage.
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    /// Requested item does not exist.
    NotFound,
    /// Backing store is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored data failed to decode.
    Corrupted,
}

/// Errors from [`NotifierPort::notify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyError {
    /// The channel could not be reached.
    Unreachable,
    /// The channel refused the message.
    Rejected,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "capture timed out"),
            Self::Unavailable => write!(f, "camera agent unavailable"),
            Self::Corrupt => write!(f, "capture reply corrupt"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored data corrupted"),
        }
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "notification channel unreachable"),
            Self::Rejected => write!(f, "notification rejected"),
        }
    }
}
