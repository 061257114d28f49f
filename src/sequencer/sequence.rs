//! Confirmation sequence data model.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MAX_BATCH_SIZE;
use crate::error::DataError;
use crate::vision::photo::{Photo, PhotoRef};

/// Identifier of one confirmation sequence.  Monotonic per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

/// Lifecycle of a sequence.  Everything but `InProgress` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceStatus {
    InProgress,
    /// The batch filled up, or the deadline passed with at least one photo.
    Completed,
    /// The deadline passed without a single photo.
    TimedOut,
    /// Cancelled from outside (operator or shutdown).
    Aborted,
}

/// Why a requested photo never made it into the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingReason {
    /// The agent did not answer within the per-request timeout.
    Timeout,
    /// The agent was unreachable on every attempt.
    Unavailable,
    /// The sequence deadline left no time for the request.
    DeadlineReached,
}

/// One photo that arrived for a sequence, scored on arrival.
#[derive(Debug, Clone)]
pub struct PhotoResult {
    /// Owning sequence (lookup only).
    pub sequence_id: SequenceId,
    /// Position in the request order, starting at 0.
    pub index: u8,
    /// Archived evidence reference, when storage accepted the photo.
    pub reference: Option<PhotoRef>,
    /// The photo itself, kept for notification evidence.
    pub photo: Option<Arc<Photo>>,
    /// Fire-pixel fraction in `[0, 1]`.
    pub score: f32,
    /// Set when the photo was unreadable and scored 0.
    pub flag: Option<DataError>,
    /// Milliseconds since the Unix epoch.
    pub received_at_ms: u64,
}

/// A bounded batch of capture attempts.
///
/// Owned by the sequencer worker until it reaches a terminal status, then
/// handed to the verdict aggregator.
#[derive(Debug, Clone)]
pub struct ConfirmationSequence {
    pub id: SequenceId,
    pub started_at_ms: u64,
    pub requested: u8,
    pub received: heapless::Vec<PhotoResult, MAX_BATCH_SIZE>,
    pub missing: heapless::Vec<(u8, MissingReason), MAX_BATCH_SIZE>,
    /// Deadline as milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    pub status: SequenceStatus,
}

impl ConfirmationSequence {
    pub fn new(id: SequenceId, requested: u8, started_at_ms: u64, deadline_ms: u64) -> Self {
        Self {
            id,
            started_at_ms,
            requested: requested.min(MAX_BATCH_SIZE as u8),
            received: heapless::Vec::new(),
            missing: heapless::Vec::new(),
            deadline_ms,
            status: SequenceStatus::InProgress,
        }
    }

    /// Record an arrived photo.  Extra photos beyond the batch are dropped.
    pub fn push_photo(&mut self, result: PhotoResult) -> bool {
        if self.received.len() >= self.requested as usize {
            return false;
        }
        self.received.push(result).is_ok()
    }

    pub fn push_missing(&mut self, index: u8, reason: MissingReason) {
        let _ = self.missing.push((index, reason));
    }

    /// Close the sequence.  The status is derived from what arrived unless
    /// the sequence was aborted.
    pub fn finish(&mut self, aborted: bool) {
        self.status = if aborted {
            SequenceStatus::Aborted
        } else if self.received.is_empty() {
            SequenceStatus::TimedOut
        } else {
            SequenceStatus::Completed
        };
    }

    /// Photos kept for evidence, in arrival order.
    pub fn evidence(&self) -> Vec<Arc<Photo>> {
        self.received.iter().filter_map(|r| r.photo.clone()).collect()
    }
}
