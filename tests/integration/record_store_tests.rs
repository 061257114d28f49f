//! Engine runs against the file-backed store; history survives a reopen.

use std::sync::Arc;

use firewatch::adapters::record_log::FileRecordStore;
use firewatch::app::events::AppEvent;
use firewatch::app::ports::{Record, RecordKind, StoragePort};
use firewatch::{EnginePorts, FireEngine, Reading, RiskTier};

use crate::mock_ports::{
    ChannelCamera, EncodedScoreClassifier, RecordingNotifier, RecordingSink, Reply, TickClock,
    fast_config,
};

#[test]
fn confirmed_run_is_fully_recorded_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    let (camera, replies) = ChannelCamera::new();

    let engine = FireEngine::new(
        fast_config(),
        EnginePorts {
            camera: Arc::new(camera),
            storage: store.clone(),
            notifier: Arc::new(RecordingNotifier::default()),
            sink: Arc::new(RecordingSink::default()),
            clock: Arc::new(TickClock::default()),
            classifier: Arc::new(EncodedScoreClassifier),
        },
    )
    .unwrap();
    engine.start();

    for _ in 0..5 {
        replies.send(Reply::Photo(0.5)).unwrap();
    }
    engine.ingest(Reading::new(58.0, 900.0, 30.0, 1005.0, 1)).unwrap();
    engine.wait_idle();
    assert_eq!(engine.tier(), RiskTier::FireConfirmed);
    engine.shutdown();
    drop(engine);
    drop(store);

    let reopened = FileRecordStore::open(dir.path()).unwrap();

    let readings = reopened.recent(RecordKind::Reading, 10).unwrap();
    assert_eq!(readings.len(), 1);

    let verdicts = reopened.recent(RecordKind::Verdict, 10).unwrap();
    let [Record::Verdict(v)] = verdicts.as_slice() else {
        panic!("expected exactly one verdict, got {verdicts:?}");
    };
    assert!(v.confirmed);

    let photos = reopened.recent(RecordKind::Photo, 10).unwrap();
    assert_eq!(photos.len(), 5);
    let Record::Photo(p) = &photos[0] else {
        panic!("expected a photo record");
    };
    let reference = p.reference.clone().expect("archived");
    assert_eq!(reopened.load_photo(&reference).unwrap().width, 501);

    let events = reopened.recent(RecordKind::Event, 100).unwrap();
    assert!(events.iter().any(|r| matches!(
        r,
        Record::Event(e) if matches!(e.event, AppEvent::NotificationSent { .. })
    )));
}
