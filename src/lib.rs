//! Firewatch fire-event orchestration engine.
//!
//! Turns a stream of noisy sensor readings into risk tiers, corroborates a
//! Danger tier with a bounded batch of photos from a remote camera agent,
//! and decides whether a fire is confirmed.
//!
//! ```text
//!   Reading ─▶ threshold ─▶ fsm ─▶ sequencer ─▶ vision ─▶ verdict ─▶ fsm
//!                                      │                      │
//!                                  CameraPort            NotifierPort
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod sequencer;
pub mod threshold;
pub mod verdict;
pub mod vision;

pub use app::commands::AppCommand;
pub use app::events::{AppEvent, EventRecord};
pub use app::service::{EnginePorts, EngineStatus, FireEngine};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use fsm::RiskTier;
pub use fsm::context::Reading;
