//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every engine event as one structured
//! line through the `log` facade.  A future MQTT or webhook adapter would
//! implement the same trait.

use log::{info, warn};

use crate::app::events::{AppEvent, EventRecord};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, record: &EventRecord) {
        let tag = record.event.kind();
        match &record.event {
            AppEvent::Started(tier) => {
                info!("{tag} | initial_tier={tier}");
            }
            AppEvent::TierChanged { from, to } => {
                info!("{tag} | {from} -> {to}");
            }
            AppEvent::SequenceStarted { id, requested } => {
                info!("{tag} | {id} started, requesting {requested}");
            }
            AppEvent::PhotoReceived {
                id,
                index,
                score,
                flag,
                reference,
            } => {
                let archived = reference.as_ref().map_or("-", |r| r.as_str());
                match flag {
                    Some(e) => warn!("{tag} | {id} #{index} flagged ({e}) score=0"),
                    None => info!("{tag} | {id} #{index} score={score:.3} ref={archived}"),
                }
            }
            AppEvent::PhotoMissing { id, index, reason } => {
                warn!("{tag} | {id} #{index} {reason:?}");
            }
            AppEvent::SequenceFinished {
                id,
                status,
                received,
            } => {
                info!("{tag} | {id} {status:?} received={received}");
            }
            AppEvent::VerdictReached(v) => {
                info!(
                    "{tag} | {} {} | confidence={:.3} | qualifying={}/{} received={}",
                    v.sequence_id,
                    v.outcome,
                    v.confidence,
                    v.contributing_photo_count,
                    v.requested_photo_count,
                    v.received_photo_count,
                );
            }
            AppEvent::NotificationSent { id } => {
                info!("{tag} | {id} delivered");
            }
            AppEvent::NotificationFailed { id, error } => {
                warn!("{tag} | {id} {error}");
            }
            AppEvent::StorageDegraded { error } => {
                warn!("{tag} | degraded: {error}");
            }
            AppEvent::ReadingRejected { error } => {
                warn!("{tag} | {error}");
            }
            AppEvent::DangerSuppressed => {
                info!("{tag} | Danger entry ignored while fire is confirmed");
            }
            AppEvent::Reset { to } => {
                info!("{tag} | acknowledged, tier now {to}");
            }
        }
    }
}
