//! Mock port adapters for integration tests.
//!
//! Every mock records the calls it receives so tests can assert on the full
//! history.  The camera is driven through a channel: tests push replies and
//! the engine's sequencer thread consumes them, waiting at most the timeout
//! it was given, exactly like a remote agent that may stay silent.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use firewatch::app::events::{AppEvent, EventRecord};
use firewatch::app::ports::{
    CameraPort, CaptureError, Clock, EventSink, NotifierPort, NotifyError, Record, RecordKind,
    StorageError, StoragePort,
};
use firewatch::adapters::memory::MemoryStore;
use firewatch::config::EngineConfig;
use firewatch::error::DataError;
use firewatch::verdict::Verdict;
use firewatch::vision::FireClassifier;
use firewatch::vision::photo::{Photo, PhotoRef};
use firewatch::{EnginePorts, FireEngine};

// ── Camera ────────────────────────────────────────────────────

/// What the mock agent answers to one capture request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// A photo the [`EncodedScoreClassifier`] scores as the given value.
    Photo(f32),
    /// A photo whose pixel buffer does not match its dimensions.
    Broken,
    Corrupt,
    Unavailable,
    Timeout,
}

pub struct ChannelCamera {
    replies: Mutex<Receiver<Reply>>,
    pub timeouts: Mutex<Vec<Duration>>,
}

#[allow(dead_code)]
impl ChannelCamera {
    pub fn new() -> (Self, Sender<Reply>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                replies: Mutex::new(rx),
                timeouts: Mutex::new(Vec::new()),
            },
            tx,
        )
    }

    pub fn requests(&self) -> usize {
        self.timeouts.lock().unwrap().len()
    }
}

impl CameraPort for ChannelCamera {
    fn request_capture(&self, timeout: Duration) -> Result<Photo, CaptureError> {
        self.timeouts.lock().unwrap().push(timeout);
        let reply = match self.replies.lock().unwrap().recv_timeout(timeout) {
            Ok(r) => r,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                return Err(CaptureError::Timeout);
            }
        };
        match reply {
            Reply::Photo(score) => Ok(photo_with_score(score)),
            Reply::Broken => Ok(Photo::new(4, 4, vec![0; 5])),
            Reply::Corrupt => Err(CaptureError::Corrupt),
            Reply::Unavailable => Err(CaptureError::Unavailable),
            Reply::Timeout => Err(CaptureError::Timeout),
        }
    }
}

/// Answers after a fixed delay and tracks how many requests overlap.
///
/// Scores cycle through `scores`, one per request.  A delay longer than
/// the request timeout makes every request time out.
pub struct SlowCamera {
    delay: Duration,
    scores: Vec<f32>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl SlowCamera {
    pub fn new(delay: Duration, scores: &[f32]) -> Self {
        Self {
            delay,
            scores: scores.to_vec(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Most requests that were ever in progress at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CameraPort for SlowCamera {
    fn request_capture(&self, timeout: Duration) -> Result<Photo, CaptureError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let n = self.calls.fetch_add(1, Ordering::SeqCst);

        thread::sleep(self.delay.min(timeout));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.delay > timeout {
            return Err(CaptureError::Timeout);
        }
        Ok(photo_with_score(self.scores[n % self.scores.len()]))
    }
}

// ── Classifier ────────────────────────────────────────────────

/// Encodes a score in the photo width: `width = score * 1000 + 1`.
pub fn photo_with_score(score: f32) -> Photo {
    Photo::solid((score * 1000.0).round() as u32 + 1, 1, [0, 0, 0])
}

/// Reads the score back out of [`photo_with_score`] photos.
pub struct EncodedScoreClassifier;

impl FireClassifier for EncodedScoreClassifier {
    fn classify(&self, photo: &Photo) -> Result<f32, DataError> {
        photo.validate()?;
        Ok((photo.width - 1) as f32 / 1000.0)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<EventRecord>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AppEvent::VerdictReached(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, record: &EventRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

// ── Notifier ──────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    /// Verdict plus number of evidence photos, per call.
    pub calls: Mutex<Vec<(Verdict, usize)>>,
    pub fail_with: Option<NotifyError>,
}

impl NotifierPort for RecordingNotifier {
    fn notify(&self, verdict: &Verdict, evidence: &[Arc<Photo>]) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((verdict.clone(), evidence.len()));
        match self.fail_with {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

/// Storage that refuses every write.
pub struct FailingStore;

impl StoragePort for FailingStore {
    fn append(&self, _: &Record) -> Result<(), StorageError> {
        Err(StorageError::IoError)
    }

    fn recent(&self, _: RecordKind, _: usize) -> Result<Vec<Record>, StorageError> {
        Err(StorageError::IoError)
    }

    fn store_photo(&self, _: &Photo) -> Result<PhotoRef, StorageError> {
        Err(StorageError::IoError)
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Ticks 1 ms per query.
#[derive(Default)]
pub struct TickClock(AtomicU64);

impl Clock for TickClock {
    fn now_ms(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Short timings so silent-agent tests finish quickly.
pub fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.sequence.per_photo_timeout_ms = 300;
    config.sequence.total_deadline_ms = 3_000;
    config.sequence.retry_backoff_ms = 5;
    config
}

#[allow(dead_code)]
pub struct Harness {
    pub engine: FireEngine,
    pub camera: Arc<ChannelCamera>,
    pub replies: Sender<Reply>,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_notifier(config, RecordingNotifier::default())
    }

    pub fn with_notifier(config: EngineConfig, notifier: RecordingNotifier) -> Self {
        let (camera, replies) = ChannelCamera::new();
        let camera = Arc::new(camera);
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(notifier);
        let store = Arc::new(MemoryStore::new());

        let engine = FireEngine::new(
            config,
            EnginePorts {
                camera: camera.clone(),
                storage: store.clone(),
                notifier: notifier.clone(),
                sink: sink.clone(),
                clock: Arc::new(TickClock::default()),
                classifier: Arc::new(EncodedScoreClassifier),
            },
        )
        .expect("valid config");
        engine.start();

        Self {
            engine,
            camera,
            replies,
            sink,
            notifier,
            store,
        }
    }

    pub fn send(&self, replies: &[Reply]) {
        for r in replies {
            self.replies.send(*r).unwrap();
        }
    }
}

/// Engine over an arbitrary camera, recording events.  Already started.
#[allow(dead_code)]
pub fn engine_with_camera(
    config: EngineConfig,
    camera: Arc<dyn CameraPort>,
) -> (FireEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let engine = FireEngine::new(
        config,
        EnginePorts {
            camera,
            storage: Arc::new(MemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            sink: sink.clone(),
            clock: Arc::new(TickClock::default()),
            classifier: Arc::new(EncodedScoreClassifier),
        },
    )
    .expect("valid config");
    engine.start();
    (engine, sink)
}
