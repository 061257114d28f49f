//! Inbound commands to the engine.
//!
//! These represent operator or process actions that the
//! [`FireEngine`](super::service::FireEngine) interprets.  Readings are not
//! commands; they enter through [`FireEngine::ingest`](super::service::FireEngine::ingest).

/// Commands that external adapters can send into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Operator acknowledgment: leave FireConfirmed for the tier of the
    /// latest reading.  No effect in any other tier.
    Reset,

    /// Abort the in-flight confirmation sequence, if any, and free its slot.
    CancelSequence,

    /// Abort any sequence and stop accepting new ones.
    Shutdown,
}
