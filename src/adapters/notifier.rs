//! Notification adapters.
//!
//! - [`LogNotifier`] writes the alert to the operator console.
//! - [`RetryingNotifier`] wraps any [`NotifierPort`] with a bounded
//!   retry/backoff policy.  The engine sees only the final outcome.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, warn};

use crate::app::ports::{NotifierPort, NotifyError};
use crate::verdict::Verdict;
use crate::vision::photo::Photo;

/// Operator console notifier.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl NotifierPort for LogNotifier {
    fn notify(&self, verdict: &Verdict, evidence: &[Arc<Photo>]) -> Result<(), NotifyError> {
        let refs: Vec<_> = evidence.iter().map(|p| p.digest()).collect();
        error!(
            "FIRE CONFIRMED | {} | confidence={:.3} | {}/{} photos corroborate",
            verdict.sequence_id,
            verdict.confidence,
            verdict.contributing_photo_count,
            verdict.requested_photo_count,
        );
        for r in refs {
            error!("FIRE CONFIRMED | evidence {}", r.as_str());
        }
        Ok(())
    }
}

/// Retry wrapper: `attempts` tries in total, `backoff` apart.
pub struct RetryingNotifier<N> {
    inner: N,
    attempts: u8,
    backoff: Duration,
}

impl<N: NotifierPort> RetryingNotifier<N> {
    pub fn new(inner: N, attempts: u8, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

impl<N: NotifierPort> NotifierPort for RetryingNotifier<N> {
    fn notify(&self, verdict: &Verdict, evidence: &[Arc<Photo>]) -> Result<(), NotifyError> {
        let mut last = NotifyError::Unreachable;
        for attempt in 1..=self.attempts {
            match self.inner.notify(verdict, evidence) {
                Ok(()) => return Ok(()),
                // The channel saw the message and said no; resending won't help.
                Err(NotifyError::Rejected) => return Err(NotifyError::Rejected),
                Err(e) => {
                    warn!(
                        "notify {}: attempt {attempt}/{} failed: {e}",
                        verdict.sequence_id, self.attempts
                    );
                    last = e;
                }
            }
            if attempt < self.attempts {
                thread::sleep(self.backoff);
            }
        }
        Err(last)
    }
}
