//! Verdict aggregator.
//!
//! Combines the per-photo scores of one closed sequence into a single
//! confirmed/unconfirmed decision plus a confidence value.
//!
//! ## Majority-of-requested rule
//!
//! ```text
//!   qualifying = photos with score >= fire_score_threshold
//!   confirmed  = qualifying / requested > majority_fraction
//!   confidence = mean(score of qualifying photos), 0 if none
//! ```
//!
//! The denominator is the *requested* batch size, not the number of photos
//! that arrived.  One bright photo out of five requested is not enough
//! evidence when the other four never showed up.
//!
//! A sequence that received nothing is `Inconclusive`, which is kept apart
//! from a `Negative` verdict that had evidence and rejected it.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::VerdictConfig;
use crate::sequencer::sequence::{ConfirmationSequence, SequenceId};

/// How the verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictOutcome {
    /// Enough qualifying photos to confirm fire.
    Confirmed,
    /// Photos arrived but did not corroborate fire.
    Negative,
    /// No photo arrived at all.
    Inconclusive,
}

impl fmt::Display for VerdictOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirmed => "confirmed",
            Self::Negative => "negative",
            Self::Inconclusive => "inconclusive",
        })
    }
}

/// Outcome of aggregating one sequence.  Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub sequence_id: SequenceId,
    pub confirmed: bool,
    pub confidence: f32,
    /// Photos at or above the per-photo fire threshold.
    pub contributing_photo_count: u8,
    pub received_photo_count: u8,
    pub requested_photo_count: u8,
    pub outcome: VerdictOutcome,
}

impl Verdict {
    pub fn is_inconclusive(&self) -> bool {
        self.outcome == VerdictOutcome::Inconclusive
    }
}

/// Aggregate a closed sequence into a verdict.
pub fn aggregate(sequence: &ConfirmationSequence, config: &VerdictConfig) -> Verdict {
    let received = sequence.received.len() as u8;
    let requested = sequence.requested;

    if received == 0 {
        return Verdict {
            sequence_id: sequence.id,
            confirmed: false,
            confidence: 0.0,
            contributing_photo_count: 0,
            received_photo_count: 0,
            requested_photo_count: requested,
            outcome: VerdictOutcome::Inconclusive,
        };
    }

    let (count, sum) = sequence
        .received
        .iter()
        .filter(|r| r.score >= config.fire_score_threshold)
        .fold((0u8, 0.0f32), |(n, s), r| (n + 1, s + r.score));

    let confidence = if count == 0 { 0.0 } else { sum / f32::from(count) };
    let confirmed =
        requested > 0 && f32::from(count) / f32::from(requested) > config.majority_fraction;

    Verdict {
        sequence_id: sequence.id,
        confirmed,
        confidence,
        contributing_photo_count: count,
        received_photo_count: received,
        requested_photo_count: requested,
        outcome: if confirmed {
            VerdictOutcome::Confirmed
        } else {
            VerdictOutcome::Negative
        },
    }
}
