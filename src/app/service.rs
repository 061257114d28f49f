//! Application service: the hexagonal core.
//!
//! [`FireEngine`] owns the risk state machine, the sequencer and the
//! shared counters.  It exposes a hardware-agnostic API; all I/O flows
//! through the port traits in [`EnginePorts`], so the whole engine runs
//! against mock adapters in tests.
//!
//! ```text
//!   Reading ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!               │          FireEngine          │ ──▶ StoragePort
//!   Command ──▶ │ Evaluator · RiskMachine ·    │ ──▶ NotifierPort
//!               │ Sequencer · Aggregator       │ ◀─▶ CameraPort
//!               └──────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Ingestion runs on the caller's thread; each confirmation sequence runs on
//! its own worker thread.  Both reach the state machine through one mutex,
//! which is what makes the "at most one sequence in flight" check and the
//! slot reservation a single indivisible step.  The lock is never held
//! across a camera request, a notification or a storage write: events are
//! queued while it is held and emitted after it is released.
//!
//! Workers take the sequencer's camera claim for their whole run, so a
//! cancelled sequence finishes its last request before the next one starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ThresholdConfig};
use crate::diagnostics::{CounterSnapshot, EngineCounters};
use crate::error::Result;
use crate::fsm::context::Reading;
use crate::fsm::{RiskMachine, RiskTier, Step};
use crate::sequencer::sequence::{ConfirmationSequence, SequenceId, SequenceStatus};
use crate::sequencer::{SequencePlan, Sequencer};
use crate::threshold::{ThresholdPolicy, TierPolicy};
use crate::verdict::{Verdict, aggregate};
use crate::vision::FireClassifier;

use super::commands::AppCommand;
use super::events::{AppEvent, EventBus};
use super::ports::{CameraPort, Clock, EventSink, NotifierPort, Record, StoragePort};

// ───────────────────────────────────────────────────────────────
// Wiring
// ───────────────────────────────────────────────────────────────

/// Every collaborator the engine talks to.
#[derive(Clone)]
pub struct EnginePorts {
    pub camera: Arc<dyn CameraPort>,
    pub storage: Arc<dyn StoragePort>,
    pub notifier: Arc<dyn NotifierPort>,
    pub sink: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
    pub classifier: Arc<dyn FireClassifier>,
}

/// Externally visible engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Tier shown to the outside world.
    pub tier: RiskTier,
    /// Evaluator tier of the latest reading (may differ while held).
    pub latest_evaluated: RiskTier,
    pub latest_reading: Option<Reading>,
    pub active_sequence: Option<SequenceId>,
    pub last_verdict: Option<Verdict>,
    pub suppressed_danger_entries: u64,
    pub thresholds: ThresholdConfig,
}

/// Mutable engine state, guarded by one lock.
struct EngineState {
    machine: RiskMachine,
    latest_reading: Option<Reading>,
    last_verdict: Option<Verdict>,
    /// Cancel flag of the sequence owning the slot.
    active: Option<(SequenceId, Arc<AtomicBool>)>,
    shut_down: bool,
}

struct Shared {
    config: EngineConfig,
    policy: Box<dyn TierPolicy>,
    state: Mutex<EngineState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    sequencer: Sequencer,
    notifier: Arc<dyn NotifierPort>,
    events: EventBus,
    counters: Arc<EngineCounters>,
}

// ───────────────────────────────────────────────────────────────
// FireEngine
// ───────────────────────────────────────────────────────────────

/// The fire-event orchestration engine.
///
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct FireEngine {
    shared: Arc<Shared>,
}

impl FireEngine {
    /// Build the engine with the default threshold policy.
    ///
    /// The configuration is validated here and frozen afterwards.
    pub fn new(config: EngineConfig, ports: EnginePorts) -> Result<Self> {
        let policy = Box::new(ThresholdPolicy::new(config.thresholds));
        Self::with_policy(config, ports, policy)
    }

    /// Build the engine with a custom tier policy.
    pub fn with_policy(
        config: EngineConfig,
        ports: EnginePorts,
        policy: Box<dyn TierPolicy>,
    ) -> Result<Self> {
        config.validate()?;

        let counters = Arc::new(EngineCounters::new());
        let events = EventBus::new(
            ports.sink,
            Arc::clone(&ports.storage),
            ports.clock,
            Arc::clone(&counters),
        );
        let sequencer = Sequencer::new(
            SequencePlan::from(&config.sequence),
            ports.camera,
            ports.classifier,
            ports.storage,
            events.clone(),
            Arc::clone(&counters),
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                policy,
                state: Mutex::new(EngineState {
                    machine: RiskMachine::new(),
                    latest_reading: None,
                    last_verdict: None,
                    active: None,
                    shut_down: false,
                }),
                workers: Mutex::new(Vec::new()),
                sequencer,
                notifier: ports.notifier,
                events,
                counters,
            }),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&self) {
        let tier = self.shared.lock_state().machine.tier();
        self.shared.events.emit(AppEvent::Started(tier));
        info!("FireEngine started in {tier}");
    }

    /// Block until every sequence worker has finished.
    pub fn wait_idle(&self) {
        loop {
            let handles: Vec<_> = {
                let mut workers = self
                    .shared
                    .workers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                workers.drain(..).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if handle.join().is_err() {
                    error!("sequence worker panicked");
                }
            }
        }
    }

    /// Abort any sequence, refuse new ones and wait for workers to exit.
    pub fn shutdown(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.shared.lock_state();
            if !state.shut_down {
                state.shut_down = true;
                self.shared.cancel_active(&mut state, &mut events);
                info!("FireEngine shutting down");
            }
        }
        self.shared.events.emit_all(events);
        self.wait_idle();
    }

    // ── Ingestion ─────────────────────────────────────────────

    /// Feed one reading.  Returns the displayed tier afterwards.
    ///
    /// A non-finite reading is rejected and the tier is retained.
    pub fn ingest(&self, reading: Reading) -> Result<RiskTier> {
        let shared = &self.shared;
        if let Err(error) = reading.validate() {
            EngineCounters::bump(&shared.counters.readings_rejected);
            warn!("reading rejected: {error}");
            shared.events.emit(AppEvent::ReadingRejected { error });
            return Err(error.into());
        }
        EngineCounters::bump(&shared.counters.readings_ingested);

        let evaluated = shared.policy.evaluate(&reading);
        shared.events.persist(&Record::Reading {
            reading,
            tier: evaluated,
        });

        let mut events = Vec::new();
        let (tier, launch) = {
            let mut state = shared.lock_state();
            state.latest_reading = Some(reading);
            let suppressed = state.machine.suppressed_entries();
            let step = state.machine.on_reading(evaluated);

            if state.machine.suppressed_entries() > suppressed {
                events.push(AppEvent::DangerSuppressed);
            }
            push_step(&step, &mut events);

            let launch = match step.start_sequence {
                Some(id) if state.shut_down => {
                    warn!("{id} not started: engine is shut down");
                    if let Ok(step) = state.machine.on_aborted(id) {
                        push_step(&step, &mut events);
                    }
                    None
                }
                Some(id) => {
                    let cancel = Arc::new(AtomicBool::new(false));
                    state.active = Some((id, Arc::clone(&cancel)));
                    Some((id, cancel))
                }
                None => None,
            };
            (state.machine.tier(), launch)
        };

        shared.events.emit_all(events);
        if let Some((id, cancel)) = launch {
            self.launch(id, cancel);
        }
        Ok(tier)
    }

    /// Spawn the worker for a slot reserved by [`Self::ingest`].  A cancel
    /// that lands before the spawn is seen by the worker through the flag.
    fn launch(&self, id: SequenceId, cancel: Arc<AtomicBool>) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("firewatch-{id}"))
            .spawn(move || {
                let claim = shared.sequencer.claim_camera();
                let sequence = shared.sequencer.run(&claim, id, &cancel);
                let notify = shared.complete(sequence, &cancel);
                drop(claim);
                if let Some((verdict, sequence)) = notify {
                    shared.send_notification(&verdict, &sequence);
                }
            });

        match spawned {
            Ok(handle) => self
                .shared
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle),
            Err(e) => {
                error!("{id}: worker spawn failed: {e}");
                let mut events = Vec::new();
                {
                    let mut state = self.shared.lock_state();
                    if state.machine.in_flight() == Some(id) {
                        state.active = None;
                        if let Ok(step) = state.machine.on_aborted(id) {
                            push_step(&step, &mut events);
                        }
                    }
                }
                self.shared.events.emit_all(events);
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Process an operator or process command.  Returns the displayed tier.
    pub fn handle_command(&self, cmd: AppCommand) -> RiskTier {
        let mut events = Vec::new();
        let tier = match cmd {
            AppCommand::Reset => {
                let mut state = self.shared.lock_state();
                let step = state.machine.reset();
                if step.from == RiskTier::FireConfirmed {
                    events.push(AppEvent::Reset { to: step.to });
                    push_step(&step, &mut events);
                } else {
                    info!("reset ignored: tier is {}", step.from);
                }
                state.machine.tier()
            }
            AppCommand::CancelSequence => {
                let mut state = self.shared.lock_state();
                if !self.shared.cancel_active(&mut state, &mut events) {
                    info!("cancel ignored: no sequence in flight");
                }
                state.machine.tier()
            }
            AppCommand::Shutdown => {
                self.shutdown();
                self.shared.lock_state().machine.tier()
            }
        };
        self.shared.events.emit_all(events);
        tier
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn tier(&self) -> RiskTier {
        self.shared.lock_state().machine.tier()
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.shared.lock_state();
        EngineStatus {
            tier: state.machine.tier(),
            latest_evaluated: state.machine.latest_evaluated(),
            latest_reading: state.latest_reading,
            active_sequence: state.machine.in_flight(),
            last_verdict: state.last_verdict.clone(),
            suppressed_danger_entries: state.machine.suppressed_entries(),
            thresholds: self.shared.config.thresholds,
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.shared.counters.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }
}

/// Queue the tier change of `step`, if any.
fn push_step(step: &Step, events: &mut Vec<AppEvent>) {
    if step.changed() {
        info!("tier {} -> {}", step.from, step.to);
        events.push(AppEvent::TierChanged {
            from: step.from,
            to: step.to,
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Shared internals
// ───────────────────────────────────────────────────────────────

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the in-flight sequence and free its slot at once.
    fn cancel_active(&self, state: &mut EngineState, events: &mut Vec<AppEvent>) -> bool {
        let Some((id, step)) = state.machine.cancel() else {
            return false;
        };
        if let Some((active, flag)) = state.active.take() {
            if active == id {
                flag.store(true, Ordering::Release);
            }
        }
        info!("{id} cancelled");
        push_step(&step, events);
        true
    }

    /// Worker completion: aggregate and apply the verdict.
    ///
    /// Returns the verdict and its evidence when a notification is due.
    /// Events and records are written after the state lock is released.
    fn complete(
        &self,
        sequence: ConfirmationSequence,
        cancel: &AtomicBool,
    ) -> Option<(Verdict, ConfirmationSequence)> {
        let id = sequence.id;
        let mut events = Vec::new();

        let (verdict, step) = {
            let mut state = self.lock_state();

            // The cancel flag is only ever set under this lock, so checking
            // it here decides between "aborted" and "verdict" exactly once.
            let aborted =
                sequence.status == SequenceStatus::Aborted || cancel.load(Ordering::Acquire);
            events.push(AppEvent::SequenceFinished {
                id,
                status: if aborted {
                    SequenceStatus::Aborted
                } else {
                    sequence.status
                },
                received: sequence.received.len() as u8,
            });

            if aborted {
                EngineCounters::bump(&self.counters.sequences_aborted);
                if state.machine.in_flight() == Some(id) {
                    state.active = None;
                    if let Ok(step) = state.machine.on_aborted(id) {
                        push_step(&step, &mut events);
                    }
                }
                drop(state);
                self.events.emit_all(events);
                return None;
            }

            let verdict = aggregate(&sequence, &self.config.verdict);
            let step = match state.machine.on_verdict(&verdict) {
                Ok(step) => step,
                Err(e) => {
                    EngineCounters::bump(&self.counters.invariant_violations);
                    error!("{id}: verdict dropped: {e}");
                    drop(state);
                    self.events.emit_all(events);
                    return None;
                }
            };
            state.active = None;
            state.last_verdict = Some(verdict.clone());
            EngineCounters::bump(&self.counters.verdicts);
            (verdict, step)
        };

        info!(
            "{id}: verdict {} ({}/{} qualifying, confidence {:.3})",
            verdict.outcome,
            verdict.contributing_photo_count,
            verdict.requested_photo_count,
            verdict.confidence
        );
        self.events.persist(&Record::Verdict(verdict.clone()));
        events.push(AppEvent::VerdictReached(verdict.clone()));
        push_step(&step, &mut events);
        self.events.emit_all(events);

        step.notify.then_some((verdict, sequence))
    }

    fn send_notification(&self, verdict: &Verdict, sequence: &ConfirmationSequence) {
        let id = verdict.sequence_id;
        match self.notifier.notify(verdict, &sequence.evidence()) {
            Ok(()) => {
                EngineCounters::bump(&self.counters.notifications_sent);
                self.events.emit(AppEvent::NotificationSent { id });
            }
            Err(error) => {
                EngineCounters::bump(&self.counters.notifications_failed);
                warn!("{id}: notification failed: {error}");
                self.events.emit(AppEvent::NotificationFailed { id, error });
            }
        }
    }
}
