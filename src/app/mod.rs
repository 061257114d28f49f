//! Application core: domain orchestration behind port traits.
//!
//! This module wires the evaluator, risk state machine, sequencer and
//! verdict aggregator into the [`FireEngine`](service::FireEngine).  All
//! interaction with the camera agent, storage and notification channel
//! happens through the traits in [`ports`], keeping this layer testable
//! without any real collaborator.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
