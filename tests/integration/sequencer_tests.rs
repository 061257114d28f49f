//! Sequencer driven directly, without the engine around it.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

use firewatch::adapters::memory::MemoryStore;
use firewatch::app::events::{AppEvent, EventBus};
use firewatch::app::ports::{Record, RecordKind, StoragePort};
use firewatch::diagnostics::EngineCounters;
use firewatch::sequencer::sequence::{
    ConfirmationSequence, MissingReason, SequenceId, SequenceStatus,
};
use firewatch::sequencer::{SequencePlan, Sequencer};

use crate::mock_ports::{
    ChannelCamera, EncodedScoreClassifier, RecordingSink, Reply, SlowCamera, TickClock,
};

struct Rig {
    sequencer: Sequencer,
    camera: Arc<ChannelCamera>,
    sink: Arc<RecordingSink>,
    store: Arc<MemoryStore>,
    counters: Arc<EngineCounters>,
    replies: std::sync::mpsc::Sender<Reply>,
}

fn plan(per_photo_ms: u64, deadline_ms: u64) -> SequencePlan {
    SequencePlan {
        batch_size: 5,
        per_photo_timeout: Duration::from_millis(per_photo_ms),
        total_deadline: Duration::from_millis(deadline_ms),
        capture_retries: 1,
        retry_backoff: Duration::from_millis(5),
    }
}

fn rig(plan: SequencePlan) -> Rig {
    let (camera, replies) = ChannelCamera::new();
    let camera = Arc::new(camera);
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::new());
    let counters = Arc::new(EngineCounters::new());
    let events = EventBus::new(
        sink.clone(),
        store.clone(),
        Arc::new(TickClock::default()),
        counters.clone(),
    );
    let sequencer = Sequencer::new(
        plan,
        camera.clone(),
        Arc::new(EncodedScoreClassifier),
        store.clone(),
        events,
        counters.clone(),
    );
    Rig {
        sequencer,
        camera,
        sink,
        store,
        counters,
        replies,
    }
}

impl Rig {
    fn run(&self, id: u64, cancel: &AtomicBool) -> ConfirmationSequence {
        let claim = self.sequencer.claim_camera();
        self.sequencer.run(&claim, SequenceId(id), cancel)
    }

    fn send(&self, replies: &[Reply]) {
        for r in replies {
            self.replies.send(*r).unwrap();
        }
    }
}

#[test]
fn full_batch_completes_in_request_order() {
    let r = rig(plan(200, 2_000));
    r.send(&[
        Reply::Photo(0.1),
        Reply::Photo(0.2),
        Reply::Photo(0.3),
        Reply::Photo(0.4),
        Reply::Photo(0.5),
    ]);
    let seq = r.run(1, &AtomicBool::new(false));

    assert_eq!(seq.status, SequenceStatus::Completed);
    assert_eq!(seq.received.len(), 5);
    assert!(seq.missing.is_empty());
    assert_eq!(r.camera.requests(), 5);

    let indices: Vec<u8> = r
        .sink
        .events()
        .iter()
        .filter_map(|e| match e {
            AppEvent::PhotoReceived { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert!((seq.received[2].score - 0.3).abs() < 1e-4);
}

#[test]
fn every_photo_is_recorded_with_its_score() {
    let r = rig(plan(200, 2_000));
    r.send(&[Reply::Photo(0.25); 5]);
    r.run(3, &AtomicBool::new(false));

    let photos = r.store.recent(RecordKind::Photo, 10).unwrap();
    assert_eq!(photos.len(), 5);
    for record in photos {
        let Record::Photo(p) = record else {
            panic!("expected a photo record");
        };
        assert_eq!(p.sequence_id, SequenceId(3));
        assert!(p.reference.is_some());
        assert!(!p.flagged);
        assert!((p.score - 0.25).abs() < 1e-4);
    }
}

#[test]
fn no_request_waits_longer_than_per_photo_timeout() {
    let r = rig(plan(100, 2_000));
    let seq = r.run(1, &AtomicBool::new(false));

    assert_eq!(seq.status, SequenceStatus::TimedOut);
    let timeouts = r.camera.timeouts.lock().unwrap().clone();
    assert_eq!(timeouts.len(), 5);
    assert!(timeouts.iter().all(|t| *t <= Duration::from_millis(100)));
    assert!(
        seq.missing
            .iter()
            .all(|(_, reason)| *reason == MissingReason::Timeout)
    );
}

#[test]
fn requests_shrink_to_fit_the_deadline() {
    // Two full waits fit in the deadline; the third gets what is left.
    let r = rig(plan(200, 500));
    let t0 = Instant::now();
    let seq = r.run(1, &AtomicBool::new(false));

    assert!(t0.elapsed() < Duration::from_millis(900));
    let timeouts = r.camera.timeouts.lock().unwrap().clone();
    assert!(timeouts.len() >= 3);
    assert!(timeouts[2] < Duration::from_millis(200));

    assert_eq!(seq.status, SequenceStatus::TimedOut);
    assert_eq!(seq.missing.len(), 5);
    assert!(
        seq.missing
            .iter()
            .any(|(_, reason)| *reason == MissingReason::DeadlineReached)
    );
    assert_eq!(r.counters.snapshot().photos_missing, 5);
}

#[test]
fn photos_before_the_deadline_still_complete_the_sequence() {
    let r = rig(plan(150, 400));
    r.send(&[Reply::Photo(0.2), Reply::Photo(0.2)]);
    let seq = r.run(1, &AtomicBool::new(false));

    assert_eq!(seq.status, SequenceStatus::Completed);
    assert_eq!(seq.received.len(), 2);
    assert_eq!(seq.missing.len(), 3);
}

#[test]
fn preset_cancel_aborts_before_any_request() {
    let r = rig(plan(200, 2_000));
    let seq = r.run(9, &AtomicBool::new(true));

    assert_eq!(seq.status, SequenceStatus::Aborted);
    assert_eq!(r.camera.requests(), 0);
    assert!(seq.received.is_empty());
}

#[test]
fn cancel_mid_sequence_stops_further_requests() {
    let r = Arc::new(rig(plan(100, 5_000)));
    let cancel = Arc::new(AtomicBool::new(false));

    let worker = {
        let r = r.clone();
        let cancel = cancel.clone();
        thread::spawn(move || r.run(2, &cancel))
    };
    r.send(&[Reply::Photo(0.4)]);
    thread::sleep(Duration::from_millis(150));
    cancel.store(true, std::sync::atomic::Ordering::Release);
    let seq = worker.join().unwrap();

    assert_eq!(seq.status, SequenceStatus::Aborted);
    assert!(r.camera.requests() < 5);
    assert_eq!(
        r.sink.count(|e| matches!(e, AppEvent::SequenceStarted { .. })),
        1
    );
}

#[test]
fn corrupt_reply_counts_as_flagged_zero() {
    let r = rig(plan(200, 2_000));
    r.send(&[
        Reply::Corrupt,
        Reply::Photo(0.2),
        Reply::Photo(0.2),
        Reply::Photo(0.2),
        Reply::Photo(0.2),
    ]);
    let seq = r.run(1, &AtomicBool::new(false));

    assert_eq!(seq.received.len(), 5);
    assert_eq!(seq.received[0].score, 0.0);
    assert!(seq.received[0].flag.is_some());
    assert!(seq.received[0].photo.is_none());
    assert_eq!(seq.evidence().len(), 4);
    assert_eq!(r.counters.snapshot().photos_flagged, 1);
}

#[test]
fn claims_keep_two_sequences_off_the_camera_at_once() {
    let camera = Arc::new(SlowCamera::new(Duration::from_millis(40), &[0.2]));
    let store = Arc::new(MemoryStore::new());
    let counters = Arc::new(EngineCounters::new());
    let sequencer = Arc::new(Sequencer::new(
        plan(200, 5_000),
        camera.clone(),
        Arc::new(EncodedScoreClassifier),
        store.clone(),
        EventBus::new(
            Arc::new(RecordingSink::default()),
            store,
            Arc::new(TickClock::default()),
            counters.clone(),
        ),
        counters,
    ));

    let first_cancel = Arc::new(AtomicBool::new(false));
    let first = {
        let sequencer = sequencer.clone();
        let cancel = first_cancel.clone();
        thread::spawn(move || {
            let claim = sequencer.claim_camera();
            sequencer.run(&claim, SequenceId(1), &cancel)
        })
    };
    thread::sleep(Duration::from_millis(60));
    first_cancel.store(true, std::sync::atomic::Ordering::Release);

    let second = {
        let sequencer = sequencer.clone();
        thread::spawn(move || {
            let claim = sequencer.claim_camera();
            sequencer.run(&claim, SequenceId(2), &AtomicBool::new(false))
        })
    };

    assert_eq!(first.join().unwrap().status, SequenceStatus::Aborted);
    let second = second.join().unwrap();
    assert_eq!(second.status, SequenceStatus::Completed);
    assert_eq!(second.received.len(), 5);
    assert_eq!(camera.max_concurrent(), 1);
}
