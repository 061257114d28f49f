//! Outbound application events.
//!
//! The [`FireEngine`](super::service::FireEngine) and its sequencer emit
//! these through an [`EventBus`], which stamps them, forwards them to the
//! [`EventSink`] port and appends them to storage.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::diagnostics::EngineCounters;
use crate::error::{DataError, NotifyError, StorageError};
use crate::fsm::RiskTier;
use crate::sequencer::sequence::{MissingReason, SequenceId, SequenceStatus};
use crate::verdict::Verdict;
use crate::vision::photo::PhotoRef;

use super::ports::{Clock, EventSink, Record, StoragePort};

/// Structured events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// The engine has started (carries the initial tier).
    Started(RiskTier),

    /// The displayed tier moved.
    TierChanged { from: RiskTier, to: RiskTier },

    SequenceStarted { id: SequenceId, requested: u8 },

    /// A photo arrived and was scored.  `flag` is set for unreadable photos.
    PhotoReceived {
        id: SequenceId,
        index: u8,
        score: f32,
        flag: Option<DataError>,
        reference: Option<PhotoRef>,
    },

    PhotoMissing {
        id: SequenceId,
        index: u8,
        reason: MissingReason,
    },

    SequenceFinished {
        id: SequenceId,
        status: SequenceStatus,
        received: u8,
    },

    /// Carries the full verdict, so inconclusive and negative stay distinct.
    VerdictReached(Verdict),

    NotificationSent { id: SequenceId },

    NotificationFailed { id: SequenceId, error: NotifyError },

    /// A storage write failed; the engine kept its state.
    StorageDegraded { error: StorageError },

    /// A malformed reading was dropped before evaluation.
    ReadingRejected { error: DataError },

    /// A Danger entry was ignored because fire is already confirmed.
    DangerSuppressed,

    /// Operator acknowledged the confirmed fire.
    Reset { to: RiskTier },
}

impl AppEvent {
    /// Short upper-case tag used by log-style sinks.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started(_) => "START",
            Self::TierChanged { .. } => "TIER",
            Self::SequenceStarted { .. } => "SEQ",
            Self::PhotoReceived { .. } => "PHOTO",
            Self::PhotoMissing { .. } => "MISSING",
            Self::SequenceFinished { .. } => "SEQ_END",
            Self::VerdictReached(_) => "VERDICT",
            Self::NotificationSent { .. } => "NOTIFY",
            Self::NotificationFailed { .. } => "NOTIFY_FAIL",
            Self::StorageDegraded { .. } => "STORAGE",
            Self::ReadingRejected { .. } => "REJECT",
            Self::DangerSuppressed => "SUPPRESS",
            Self::Reset { .. } => "RESET",
        }
    }
}

/// An event with its timestamp, the unit handed to sinks and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub event: AppEvent,
}

/// Fan-out for engine events: sink first, then storage.
#[derive(Clone)]
pub struct EventBus {
    sink: Arc<dyn EventSink>,
    storage: Arc<dyn StoragePort>,
    clock: Arc<dyn Clock>,
    counters: Arc<EngineCounters>,
}

impl EventBus {
    pub fn new(
        sink: Arc<dyn EventSink>,
        storage: Arc<dyn StoragePort>,
        clock: Arc<dyn Clock>,
        counters: Arc<EngineCounters>,
    ) -> Self {
        Self {
            sink,
            storage,
            clock,
            counters,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn emit(&self, event: AppEvent) {
        let record = EventRecord {
            timestamp_ms: self.clock.now_ms(),
            event,
        };
        self.sink.emit(&record);
        // A failed event write is only logged: reporting it as another
        // event would write to the same failing store.
        if let Err(e) = self.storage.append(&Record::Event(record)) {
            EngineCounters::bump(&self.counters.storage_failures);
            warn!("event not persisted: {e}");
        }
    }

    /// Emit queued events in order.
    pub fn emit_all(&self, events: impl IntoIterator<Item = AppEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Append a non-event record; failures become `StorageDegraded`.
    pub fn persist(&self, record: &Record) {
        if let Err(error) = self.storage.append(record) {
            EngineCounters::bump(&self.counters.storage_failures);
            warn!("{:?} record not persisted: {error}", record.kind());
            self.emit(AppEvent::StorageDegraded { error });
        }
    }
}
