//! Confirmation sequencer.
//!
//! Requests a bounded batch of photos from the remote camera agent, one at
//! a time, and scores each one as it arrives.
//!
//! ```text
//!   for index in 0..batch_size:
//!       deadline passed?        ──▶ remaining indices missing (DeadlineReached)
//!       request_capture(min(per_photo, remaining))
//!         Ok(photo)             ──▶ classify, archive, PhotoReceived
//!         Corrupt               ──▶ score 0, flagged, PhotoReceived
//!         Timeout               ──▶ PhotoMissing (no retry)
//!         Unavailable           ──▶ retry with backoff, then PhotoMissing
//! ```
//!
//! Requests are serial because the agent is a single physical camera.  The
//! per-request timeout and the total deadline are both enforced, so a
//! silent agent can hold a sequence open for at most `total_deadline`.
//!
//! Cancellation is cooperative: the flag is checked between requests and
//! during backoff.  The state machine frees the in-flight slot at cancel
//! time, so the worker only has to wind down.
//!
//! A sequence runs under a [`CameraClaim`].  A cancelled worker still
//! holds the claim until its current request returns, and the next
//! sequence waits for it, so two sequences never talk to the camera at
//! once and at most one is ever `InProgress`.

pub mod sequence;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::events::{AppEvent, EventBus};
use crate::app::ports::{CameraPort, CaptureError, PhotoRecord, Record, StoragePort};
use crate::config::SequenceConfig;
use crate::diagnostics::EngineCounters;
use crate::error::DataError;
use crate::vision::FireClassifier;
use crate::vision::photo::{Photo, PhotoRef};

use sequence::{ConfirmationSequence, MissingReason, PhotoResult, SequenceId};

/// Granularity of cancellable sleeps.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Timing parameters of one sequence, fixed at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePlan {
    pub batch_size: u8,
    pub per_photo_timeout: Duration,
    pub total_deadline: Duration,
    pub capture_retries: u8,
    pub retry_backoff: Duration,
}

impl From<&SequenceConfig> for SequencePlan {
    fn from(c: &SequenceConfig) -> Self {
        Self {
            batch_size: c.batch_size,
            per_photo_timeout: Duration::from_millis(u64::from(c.per_photo_timeout_ms)),
            total_deadline: Duration::from_millis(u64::from(c.total_deadline_ms)),
            capture_retries: c.capture_retries,
            retry_backoff: Duration::from_millis(u64::from(c.retry_backoff_ms)),
        }
    }
}

/// What one photo slot ended up as.
enum Capture {
    Photo(Photo),
    Corrupt,
    Missing(MissingReason),
    Cancelled,
}

/// Exclusive use of the camera for one sequence.
///
/// Obtained from [`Sequencer::claim_camera`]; released on drop.
pub struct CameraClaim<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Collaborators a sequence needs.  Shared with the engine.
pub struct Sequencer {
    plan: SequencePlan,
    camera_lock: Mutex<()>,
    camera: Arc<dyn CameraPort>,
    classifier: Arc<dyn FireClassifier>,
    storage: Arc<dyn StoragePort>,
    events: EventBus,
    counters: Arc<EngineCounters>,
}

impl Sequencer {
    pub fn new(
        plan: SequencePlan,
        camera: Arc<dyn CameraPort>,
        classifier: Arc<dyn FireClassifier>,
        storage: Arc<dyn StoragePort>,
        events: EventBus,
        counters: Arc<EngineCounters>,
    ) -> Self {
        Self {
            plan,
            camera_lock: Mutex::new(()),
            camera,
            classifier,
            storage,
            events,
            counters,
        }
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    /// Wait until no other sequence is using the camera.
    pub fn claim_camera(&self) -> CameraClaim<'_> {
        CameraClaim {
            _guard: self.camera_lock.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Run one sequence to a terminal status.  Blocks the calling thread.
    pub fn run(
        &self,
        _claim: &CameraClaim<'_>,
        id: SequenceId,
        cancel: &AtomicBool,
    ) -> ConfirmationSequence {
        let started = Instant::now();
        let deadline = started + self.plan.total_deadline;
        let started_at_ms = self.events.now_ms();
        let mut seq = ConfirmationSequence::new(
            id,
            self.plan.batch_size,
            started_at_ms,
            started_at_ms + self.plan.total_deadline.as_millis() as u64,
        );

        EngineCounters::bump(&self.counters.sequences_started);
        self.events.emit(AppEvent::SequenceStarted {
            id,
            requested: seq.requested,
        });
        info!("{id}: requesting {} photos", seq.requested);

        let mut aborted = false;
        for index in 0..seq.requested {
            if cancel.load(Ordering::Acquire) {
                aborted = true;
                break;
            }

            match self.capture(id, index, deadline, cancel) {
                Capture::Photo(photo) => self.accept(&mut seq, index, photo),
                Capture::Corrupt => self.accept_flagged(&mut seq, index, DataError::UndecodablePhoto),
                Capture::Missing(MissingReason::DeadlineReached) => {
                    for rest in index..seq.requested {
                        self.record_missing(&mut seq, rest, MissingReason::DeadlineReached);
                    }
                    break;
                }
                Capture::Missing(reason) => self.record_missing(&mut seq, index, reason),
                Capture::Cancelled => {
                    aborted = true;
                    break;
                }
            }
        }

        if cancel.load(Ordering::Acquire) {
            aborted = true;
        }
        seq.finish(aborted);
        info!(
            "{id}: {:?} with {}/{} photos in {} ms",
            seq.status,
            seq.received.len(),
            seq.requested,
            started.elapsed().as_millis()
        );
        seq
    }

    // ── Capture with retry ────────────────────────────────────

    fn capture(&self, id: SequenceId, index: u8, deadline: Instant, cancel: &AtomicBool) -> Capture {
        let mut attempt = 0u8;
        loop {
            let Some(remaining) = time_left(deadline) else {
                return Capture::Missing(MissingReason::DeadlineReached);
            };
            let timeout = self.plan.per_photo_timeout.min(remaining);

            match self.camera.request_capture(timeout) {
                Ok(photo) => return Capture::Photo(photo),
                Err(CaptureError::Corrupt) => {
                    warn!("{id} #{index}: capture reply corrupt");
                    return Capture::Corrupt;
                }
                Err(CaptureError::Timeout) => {
                    warn!("{id} #{index}: no photo within {} ms", timeout.as_millis());
                    return Capture::Missing(MissingReason::Timeout);
                }
                Err(CaptureError::Unavailable) if attempt < self.plan.capture_retries => {
                    attempt += 1;
                    warn!(
                        "{id} #{index}: camera unavailable, retry {attempt}/{}",
                        self.plan.capture_retries
                    );
                    let Some(remaining) = time_left(deadline) else {
                        return Capture::Missing(MissingReason::DeadlineReached);
                    };
                    if !sleep_unless_cancelled(self.plan.retry_backoff.min(remaining), cancel) {
                        return Capture::Cancelled;
                    }
                }
                Err(CaptureError::Unavailable) => {
                    warn!("{id} #{index}: camera unavailable, giving up");
                    return Capture::Missing(MissingReason::Unavailable);
                }
            }
        }
    }

    // ── Result bookkeeping ────────────────────────────────────

    fn accept(&self, seq: &mut ConfirmationSequence, index: u8, photo: Photo) {
        let (score, flag) = match self.classifier.classify(&photo) {
            Ok(score) => (score.clamp(0.0, 1.0), None),
            Err(e) => {
                warn!("{} #{index}: unreadable photo ({e}), scored 0", seq.id);
                (0.0, Some(e))
            }
        };

        let reference = if flag.is_none() {
            match self.storage.store_photo(&photo) {
                Ok(r) => Some(r),
                Err(error) => {
                    EngineCounters::bump(&self.counters.storage_failures);
                    warn!("{} #{index}: evidence not archived: {error}", seq.id);
                    self.events.emit(AppEvent::StorageDegraded { error });
                    None
                }
            }
        } else {
            None
        };

        let photo = flag.is_none().then(|| Arc::new(photo));
        self.push_result(seq, index, score, flag, reference, photo);
    }

    fn accept_flagged(&self, seq: &mut ConfirmationSequence, index: u8, flag: DataError) {
        self.push_result(seq, index, 0.0, Some(flag), None, None);
    }

    fn push_result(
        &self,
        seq: &mut ConfirmationSequence,
        index: u8,
        score: f32,
        flag: Option<DataError>,
        reference: Option<PhotoRef>,
        photo: Option<Arc<Photo>>,
    ) {
        let received_at_ms = self.events.now_ms();
        EngineCounters::bump(&self.counters.photos_received);
        if flag.is_some() {
            EngineCounters::bump(&self.counters.photos_flagged);
        }
        debug!("{} #{index}: score {score:.4}", seq.id);

        self.events.persist(&Record::Photo(PhotoRecord {
            sequence_id: seq.id,
            index,
            reference: reference.clone(),
            score,
            flagged: flag.is_some(),
            received_at_ms,
        }));
        self.events.emit(AppEvent::PhotoReceived {
            id: seq.id,
            index,
            score,
            flag,
            reference: reference.clone(),
        });

        seq.push_photo(PhotoResult {
            sequence_id: seq.id,
            index,
            reference,
            photo,
            score,
            flag,
            received_at_ms,
        });
    }

    fn record_missing(&self, seq: &mut ConfirmationSequence, index: u8, reason: MissingReason) {
        EngineCounters::bump(&self.counters.photos_missing);
        seq.push_missing(index, reason);
        self.events.emit(AppEvent::PhotoMissing {
            id: seq.id,
            index,
            reason,
        });
    }
}

/// Time left before `deadline`, or `None` once it has passed.
fn time_left(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|d| !d.is_zero())
}

/// Sleep for `total`, waking early on cancellation.  Returns `false` if
/// cancelled.
fn sleep_unless_cancelled(total: Duration, cancel: &AtomicBool) -> bool {
    let until = Instant::now() + total;
    while let Some(left) = time_left(until) {
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        thread::sleep(left.min(CANCEL_POLL));
    }
    !cancel.load(Ordering::Acquire)
}
