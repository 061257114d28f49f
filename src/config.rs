//! Engine configuration parameters
//!
//! All tunable parameters for the fire-event engine.  Values are loaded
//! once at startup through a [`ConfigPort`](crate::app::ports::ConfigPort)
//! and are read-only for the lifetime of the engine.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Upper bound on photos per confirmation sequence.
///
/// Sizes the fixed-capacity photo batch held by each sequence.
pub const MAX_BATCH_SIZE: usize = 16;

/// Maximum number of hue bands the classifier accepts.
pub const MAX_HUE_BANDS: usize = 4;

/// Core engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ThresholdConfig,
    pub sequence: SequenceConfig,
    pub classifier: ClassifierConfig,
    pub verdict: VerdictConfig,
    pub camera: CameraConfig,
    pub storage: StorageConfig,
}

/// Risk tier thresholds.  Comparisons are inclusive at both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Temperature (°C) at or above which the tier is at least Alert
    pub temp_alert_c: f32,
    /// Temperature (°C) at or above which the tier is Danger
    pub temp_danger_c: f32,
    /// Ambient light (lux) at or above which the tier is at least Alert
    pub light_alert_lux: f32,
    /// Ambient light (lux) at or above which the tier is Danger
    pub light_danger_lux: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temp_alert_c: 45.0,
            temp_danger_c: 55.0,
            light_alert_lux: 800.0,
            light_danger_lux: 1000.0,
        }
    }
}

/// Confirmation sequence timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Photos requested per sequence
    pub batch_size: u8,
    /// Longest wait for a single capture response (milliseconds)
    pub per_photo_timeout_ms: u32,
    /// Hard deadline for the whole sequence (milliseconds)
    pub total_deadline_ms: u32,
    /// Extra attempts when the camera agent is unreachable
    pub capture_retries: u8,
    /// Pause between attempts against an unreachable agent (milliseconds)
    pub retry_backoff_ms: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            per_photo_timeout_ms: 10_000,
            total_deadline_ms: 60_000,
            capture_retries: 1,
            retry_backoff_ms: 500,
        }
    }
}

/// An inclusive hue range in degrees (0–360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueBand {
    pub min_deg: f32,
    pub max_deg: f32,
}

impl HueBand {
    pub const fn new(min_deg: f32, max_deg: f32) -> Self {
        Self { min_deg, max_deg }
    }

    pub fn contains(&self, hue_deg: f32) -> bool {
        hue_deg >= self.min_deg && hue_deg <= self.max_deg
    }
}

/// Pixel heuristic parameters for the fire classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Fire-coloured hue bands
    pub hue_bands: heapless::Vec<HueBand, MAX_HUE_BANDS>,
    /// Minimum saturation (0–255) for a fire pixel
    pub min_saturation: u8,
    /// Minimum value/brightness (0–255) for a fire pixel
    pub min_value: u8,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let mut hue_bands = heapless::Vec::new();
        // Red through orange to yellow, then the deep reds that wrap past magenta.
        let _ = hue_bands.push(HueBand::new(0.0, 60.0));
        let _ = hue_bands.push(HueBand::new(320.0, 360.0));
        Self {
            hue_bands,
            min_saturation: 100,
            min_value: 100,
        }
    }
}

/// Verdict aggregation policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// Per-photo fire-pixel fraction that counts as fire evidence
    pub fire_score_threshold: f32,
    /// Share of the *requested* batch that must be fire evidence.
    /// Confirmation needs strictly more than this fraction.
    pub majority_fraction: f32,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            fire_score_threshold: 0.03,
            majority_fraction: 0.5,
        }
    }
}

/// Camera agent transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture command argv; the output path is appended as the last argument.
    pub command: Vec<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: vec!["firewatch-capture".into()],
        }
    }
}

/// Record storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the record log and archived photos
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "firewatch-data".into(),
        }
    }
}

impl EngineConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let all_finite = [
            t.temp_alert_c,
            t.temp_danger_c,
            t.light_alert_lux,
            t.light_danger_lux,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(ConfigError::ValidationFailed("thresholds must be finite"));
        }
        if t.temp_alert_c >= t.temp_danger_c {
            return Err(ConfigError::ValidationFailed(
                "temp_alert_c must be < temp_danger_c",
            ));
        }
        if t.light_alert_lux >= t.light_danger_lux {
            return Err(ConfigError::ValidationFailed(
                "light_alert_lux must be < light_danger_lux",
            ));
        }

        let s = &self.sequence;
        if s.batch_size == 0 || s.batch_size as usize > MAX_BATCH_SIZE {
            return Err(ConfigError::ValidationFailed("batch_size must be 1-16"));
        }
        if s.per_photo_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "per_photo_timeout_ms must be > 0",
            ));
        }
        if s.per_photo_timeout_ms > s.total_deadline_ms {
            return Err(ConfigError::ValidationFailed(
                "per_photo_timeout_ms must be <= total_deadline_ms",
            ));
        }

        let v = &self.verdict;
        if !(v.fire_score_threshold > 0.0 && v.fire_score_threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "fire_score_threshold must be in (0, 1]",
            ));
        }
        if !(0.0..1.0).contains(&v.majority_fraction) {
            return Err(ConfigError::ValidationFailed(
                "majority_fraction must be in [0, 1)",
            ));
        }

        let c = &self.classifier;
        if c.hue_bands.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "classifier needs at least one hue band",
            ));
        }
        for band in &c.hue_bands {
            if !(0.0..=360.0).contains(&band.min_deg)
                || !(0.0..=360.0).contains(&band.max_deg)
                || band.min_deg > band.max_deg
            {
                return Err(ConfigError::ValidationFailed(
                    "hue bands must satisfy 0 <= min <= max <= 360",
                ));
            }
        }

        if self.camera.command.first().is_none_or(String::is_empty) {
            return Err(ConfigError::ValidationFailed(
                "camera.command must name a program",
            ));
        }

        Ok(())
    }
}
