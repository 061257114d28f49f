//! System clock adapter.
//!
//! Implements [`Clock`] over the host wall clock.  Only timestamps come from
//! here; deadlines inside the sequencer use the monotonic `Instant`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::Clock;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    /// Milliseconds since the Unix epoch.  A clock set before 1970 reads 0.
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}
