//! Threshold evaluator.
//!
//! Maps a single [`Reading`] to a [`RiskTier`].  Pure, total and free of
//! side effects: the state machine calls it once per reading and decides
//! what the tier change means.
//!
//! ## Policy
//!
//! ```text
//!   temp >= temp_danger  OR  light >= light_danger   ──▶ Danger
//!   temp >= temp_alert   OR  light >= light_alert    ──▶ Alert
//!   otherwise                                        ──▶ Normal
//! ```
//!
//! Comparisons are inclusive, so a reading sitting exactly on a threshold
//! resolves to the higher tier.
//!
//! Humidity and pressure are carried on every reading but do not affect the
//! tier.  Multi-factor policies plug in through [`TierPolicy`]; the engine
//! only ever sees the trait.

use crate::config::ThresholdConfig;
use crate::fsm::RiskTier;
use crate::fsm::context::Reading;

/// Extension point for tier policies.
pub trait TierPolicy: Send + Sync {
    fn evaluate(&self, reading: &Reading) -> RiskTier;
}

/// Temperature / light threshold policy.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    config: ThresholdConfig,
}

impl ThresholdPolicy {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }
}

impl TierPolicy for ThresholdPolicy {
    fn evaluate(&self, reading: &Reading) -> RiskTier {
        evaluate(reading, &self.config)
    }
}

/// Evaluate one reading against the configured thresholds.
pub fn evaluate(reading: &Reading, config: &ThresholdConfig) -> RiskTier {
    if reading.temperature_c >= config.temp_danger_c
        || reading.light_lux >= config.light_danger_lux
    {
        return RiskTier::Danger;
    }

    if reading.temperature_c >= config.temp_alert_c || reading.light_lux >= config.light_alert_lux
    {
        return RiskTier::Alert;
    }

    RiskTier::Normal
}
