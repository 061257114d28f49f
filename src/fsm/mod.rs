//! Risk state machine.
//!
//! Converts the evaluator's per-reading tier into the *displayed* tier and
//! decides when a confirmation sequence must start.
//!
//! ```text
//!  NORMAL ◀──▶ ALERT ◀──▶ DANGER ──[verdict: fire]──▶ FIRE_CONFIRMED
//!                            │                              │
//!                 [entry: start sequence]          [operator reset]
//!                 [held while in flight]                    │
//!                            │                              ▼
//!                 [verdict: no fire] ──▶ re-evaluate ◀──────┘
//! ```
//!
//! Side effects are edge-triggered: every step compares the previous
//! displayed tier with the new one, and only an *entry* into Danger (or a
//! re-armed Danger after a negative verdict) asks for a sequence.
//!
//! The machine owns the single "sequence in flight" slot.  Reserving it is
//! part of [`RiskMachine::on_reading`], so as long as the caller holds one
//! lock around the machine, read-check-start is indivisible.
//!
//! The machine performs no I/O.  It returns a [`Step`] describing what
//! changed; the application service turns that into events, storage writes
//! and sequencer calls.

pub mod context;

use core::fmt;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::sequencer::sequence::SequenceId;
use crate::verdict::Verdict;

// ---------------------------------------------------------------------------
// Tier identity
// ---------------------------------------------------------------------------

/// Discrete risk level.
///
/// `Normal < Alert < Danger` follow the evaluator.  `FireConfirmed` is only
/// reachable from Danger through a confirming verdict and is left only by
/// an operator reset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum RiskTier {
    Normal = 0,
    Alert = 1,
    Danger = 2,
    FireConfirmed = 3,
}

impl RiskTier {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Alert => "Alert",
            Self::Danger => "Danger",
            Self::FireConfirmed => "FireConfirmed",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Step result
// ---------------------------------------------------------------------------

/// Outcome of feeding one input into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Displayed tier before the input.
    pub from: RiskTier,
    /// Displayed tier after the input.
    pub to: RiskTier,
    /// A sequence slot was reserved; the caller must launch it.
    pub start_sequence: Option<SequenceId>,
    /// A confirming verdict landed; the caller must notify once.
    pub notify: bool,
}

impl Step {
    fn new(from: RiskTier, to: RiskTier) -> Self {
        Self {
            from,
            to,
            start_sequence: None,
            notify: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// The risk state machine.
#[derive(Debug)]
pub struct RiskMachine {
    /// Tier shown to the outside world.
    displayed: RiskTier,
    /// Evaluator tier of the most recent reading.
    latest: RiskTier,
    /// Sequence currently owning the in-flight slot.
    in_flight: Option<SequenceId>,
    /// A Danger reading should start a sequence even without a fresh entry.
    rearmed: bool,
    /// Next sequence id to hand out.  Ids below this are issued.
    next_id: u64,
    /// Danger entries ignored because a fire is already confirmed.
    suppressed_entries: u64,
}

impl Default for RiskMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskMachine {
    pub fn new() -> Self {
        Self {
            displayed: RiskTier::Normal,
            latest: RiskTier::Normal,
            in_flight: None,
            rearmed: false,
            next_id: 1,
            suppressed_entries: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn tier(&self) -> RiskTier {
        self.displayed
    }

    pub fn latest_evaluated(&self) -> RiskTier {
        self.latest
    }

    pub fn in_flight(&self) -> Option<SequenceId> {
        self.in_flight
    }

    pub fn suppressed_entries(&self) -> u64 {
        self.suppressed_entries
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Apply the evaluator's tier for a new reading.
    pub fn on_reading(&mut self, evaluated: RiskTier) -> Step {
        let prev_latest = self.latest;
        self.latest = evaluated;
        let from = self.displayed;

        if from == RiskTier::FireConfirmed {
            if evaluated == RiskTier::Danger && prev_latest < RiskTier::Danger {
                self.suppressed_entries += 1;
                debug!("Danger re-entry suppressed while fire is confirmed");
            }
            return Step::new(from, from);
        }

        if let Some(id) = self.in_flight {
            debug!("tier held at Danger while {id} is in flight (reading: {evaluated})");
            return Step::new(from, from);
        }

        self.displayed = evaluated;
        let mut step = Step::new(from, evaluated);

        let entering = from < RiskTier::Danger || self.rearmed;
        if evaluated == RiskTier::Danger && entering {
            match self.reserve_slot() {
                Ok(id) => step.start_sequence = Some(id),
                Err(e) => error!("sequence start refused: {e}"),
            }
        } else if evaluated < RiskTier::Danger {
            self.rearmed = false;
        }

        step
    }

    /// Apply the verdict of the sequence that owns the slot.
    pub fn on_verdict(&mut self, verdict: &Verdict) -> Result<Step, InvariantViolation> {
        self.release_slot(verdict.sequence_id)?;
        let from = self.displayed;

        if verdict.confirmed {
            self.displayed = RiskTier::FireConfirmed;
            self.rearmed = false;
            info!(
                "{} confirmed fire (confidence {:.3})",
                verdict.sequence_id, verdict.confidence
            );
            let mut step = Step::new(from, RiskTier::FireConfirmed);
            step.notify = true;
            return Ok(step);
        }

        self.displayed = self.latest;
        self.rearmed = self.latest == RiskTier::Danger;
        info!(
            "{} did not confirm fire; tier re-evaluated to {}",
            verdict.sequence_id, self.displayed
        );
        Ok(Step::new(from, self.displayed))
    }

    /// Release the slot of a sequence that ended without a verdict
    /// (external cancellation).  The tier falls back to the latest reading
    /// and a still-dangerous reading may start a fresh sequence.
    pub fn on_aborted(&mut self, id: SequenceId) -> Result<Step, InvariantViolation> {
        self.release_slot(id)?;
        let from = self.displayed;
        self.displayed = self.latest;
        self.rearmed = self.latest == RiskTier::Danger;
        Ok(Step::new(from, self.displayed))
    }

    /// Cancel whatever sequence is in flight, releasing the slot at once.
    pub fn cancel(&mut self) -> Option<(SequenceId, Step)> {
        let id = self.in_flight?;
        self.on_aborted(id).ok().map(|step| (id, step))
    }

    /// Operator acknowledgment: leave FireConfirmed for the latest tier.
    ///
    /// Has no effect in any other tier.
    pub fn reset(&mut self) -> Step {
        let from = self.displayed;
        if from != RiskTier::FireConfirmed {
            return Step::new(from, from);
        }
        self.displayed = self.latest;
        self.rearmed = self.latest == RiskTier::Danger;
        info!("fire acknowledged; tier reset to {}", self.displayed);
        Step::new(from, self.displayed)
    }

    // ── Internal ──────────────────────────────────────────────

    /// Atomic check-and-set of the in-flight slot.
    fn reserve_slot(&mut self) -> Result<SequenceId, InvariantViolation> {
        if self.in_flight.is_some() {
            return Err(InvariantViolation::SequenceAlreadyInProgress);
        }
        let id = SequenceId(self.next_id);
        self.next_id += 1;
        self.in_flight = Some(id);
        self.rearmed = false;
        Ok(id)
    }

    fn release_slot(&mut self, id: SequenceId) -> Result<(), InvariantViolation> {
        match self.in_flight {
            Some(active) if active == id => {
                self.in_flight = None;
                Ok(())
            }
            _ if id.0 < self.next_id => Err(InvariantViolation::DuplicateVerdict),
            _ => Err(InvariantViolation::StaleVerdict),
        }
    }
}
