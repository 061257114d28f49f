//! Runtime counters.
//!
//! Every counter is a relaxed atomic bumped from whichever thread observed
//! the event (ingestion caller or sequencer worker).  [`EngineCounters::snapshot`]
//! copies them into a plain serializable struct for status reports.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct EngineCounters {
    pub readings_ingested: AtomicU64,
    pub readings_rejected: AtomicU64,
    pub sequences_started: AtomicU64,
    pub sequences_aborted: AtomicU64,
    pub photos_received: AtomicU64,
    pub photos_missing: AtomicU64,
    pub photos_flagged: AtomicU64,
    pub verdicts: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_failed: AtomicU64,
    pub storage_failures: AtomicU64,
    pub invariant_violations: AtomicU64,
}

impl EngineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            readings_ingested: get(&self.readings_ingested),
            readings_rejected: get(&self.readings_rejected),
            sequences_started: get(&self.sequences_started),
            sequences_aborted: get(&self.sequences_aborted),
            photos_received: get(&self.photos_received),
            photos_missing: get(&self.photos_missing),
            photos_flagged: get(&self.photos_flagged),
            verdicts: get(&self.verdicts),
            notifications_sent: get(&self.notifications_sent),
            notifications_failed: get(&self.notifications_failed),
            storage_failures: get(&self.storage_failures),
            invariant_violations: get(&self.invariant_violations),
        }
    }
}

/// Point-in-time copy of [`EngineCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub readings_ingested: u64,
    pub readings_rejected: u64,
    pub sequences_started: u64,
    pub sequences_aborted: u64,
    pub photos_received: u64,
    pub photos_missing: u64,
    pub photos_flagged: u64,
    pub verdicts: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub storage_failures: u64,
    pub invariant_violations: u64,
}
