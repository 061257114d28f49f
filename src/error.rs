//! Unified error types for the fire-event engine.
//!
//! Every fallible engine operation funnels into [`Error`].  The leaf enums
//! are `Copy` so they can be recorded in events and counters without
//! allocation.  Port traits return their own typed errors (see
//! [`crate::app::ports`]) which convert into `Error` via `From`.
//!
//! Errors fall into three categories:
//!
//! - **Transient external failures** ([`CaptureError`], [`StorageError`],
//!   [`NotifyError`]) are absorbed where they occur and surface as degraded
//!   events, never as a crashed engine.
//! - **Data errors** ([`DataError`]) are isolated to the single reading or
//!   photo that caused them.
//! - **Invariant violations** ([`InvariantViolation`]) are programming
//!   faults.  They are logged at `error!` and the offending request is
//!   dropped.

use core::fmt;

use serde::{Deserialize, Serialize};

pub use crate::app::ports::{CaptureError, ConfigError, NotifyError, StorageError};

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A reading or photo was malformed.
    Data(DataError),
    /// The remote camera agent did not deliver a photo.
    Capture(CaptureError),
    /// The storage collaborator rejected a write or query.
    Storage(StorageError),
    /// The notification collaborator failed to deliver.
    Notify(NotifyError),
    /// Sequencing discipline was broken.
    Invariant(InvariantViolation),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(e) => write!(f, "data: {e}"),
            Self::Capture(e) => write!(f, "capture: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::Invariant(e) => write!(f, "invariant violated: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Data errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataError {
    /// A reading carried NaN or an infinite value.
    NonFiniteReading,
    /// Pixel buffer length disagrees with the photo dimensions.
    PixelBufferMismatch,
    /// Photo has zero width or height.
    EmptyPhoto,
    /// Encoded photo could not be decoded.
    UndecodablePhoto,
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteReading => write!(f, "non-finite sensor value"),
            Self::PixelBufferMismatch => write!(f, "pixel buffer does not match dimensions"),
            Self::EmptyPhoto => write!(f, "photo has no pixels"),
            Self::UndecodablePhoto => write!(f, "photo could not be decoded"),
        }
    }
}

impl From<DataError> for Error {
    fn from(e: DataError) -> Self {
        Self::Data(e)
    }
}

// ---------------------------------------------------------------------------
// Invariant violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A sequence start was requested while another is in flight.
    SequenceAlreadyInProgress,
    /// A verdict arrived for a sequence that does not own the slot.
    StaleVerdict,
    /// A second verdict arrived for a sequence already decided.
    DuplicateVerdict,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceAlreadyInProgress => write!(f, "a sequence is already in progress"),
            Self::StaleVerdict => write!(f, "verdict for a sequence that is not active"),
            Self::DuplicateVerdict => write!(f, "verdict already reached for this sequence"),
        }
    }
}

impl From<InvariantViolation> for Error {
    fn from(e: InvariantViolation) -> Self {
        Self::Invariant(e)
    }
}

// ---------------------------------------------------------------------------
// Port error conversions
// ---------------------------------------------------------------------------

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Self::Capture(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("config not found"),
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
