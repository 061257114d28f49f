//! Fire classifier.
//!
//! Scores one photo for fire-like pixel content.  The engine only sees the
//! [`FireClassifier`] trait, so a learned model can replace the heuristic
//! without touching the sequencer or the verdict aggregator.
//!
//! The reference [`HsvFireClassifier`] converts each pixel to
//! hue/saturation/value and counts the pixels whose hue falls in one of the
//! configured fire bands with enough saturation and brightness:
//!
//! ```text
//!   score = fire_pixels / total_pixels        ∈ [0, 1]
//! ```

pub mod photo;

use crate::config::{ClassifierConfig, HueBand, MAX_HUE_BANDS};
use crate::error::DataError;
use photo::Photo;

/// Stateless, deterministic photo scorer.
pub trait FireClassifier: Send + Sync {
    /// Fraction of the photo's pixels that look like fire.
    ///
    /// An unreadable photo is reported as an error; callers record it as a
    /// flagged zero score instead of failing the batch.
    fn classify(&self, photo: &Photo) -> Result<f32, DataError>;
}

/// Colour-band heuristic classifier.
#[derive(Debug, Clone)]
pub struct HsvFireClassifier {
    bands: heapless::Vec<HueBand, MAX_HUE_BANDS>,
    min_saturation: u8,
    min_value: u8,
}

impl HsvFireClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            bands: config.hue_bands.clone(),
            min_saturation: config.min_saturation,
            min_value: config.min_value,
        }
    }

    fn is_fire_pixel(&self, (r, g, b): (u8, u8, u8)) -> bool {
        let hsv = Hsv::from_rgb(r, g, b);
        hsv.saturation >= self.min_saturation
            && hsv.value >= self.min_value
            && self.bands.iter().any(|band| band.contains(hsv.hue_deg))
    }
}

impl Default for HsvFireClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl FireClassifier for HsvFireClassifier {
    fn classify(&self, photo: &Photo) -> Result<f32, DataError> {
        photo.validate()?;
        let fire = photo.pixels().filter(|p| self.is_fire_pixel(*p)).count();
        Ok((fire as f32 / photo.pixel_count() as f32).clamp(0.0, 1.0))
    }
}

// ── Colour conversion ─────────────────────────────────────────

/// Hue in degrees `[0, 360)`, saturation and value on a 0–255 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Hsv {
    hue_deg: f32,
    saturation: u8,
    value: u8,
}

impl Hsv {
    fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = f32::from(max - min);

        let saturation = if max == 0 {
            0
        } else {
            ((delta * 255.0) / f32::from(max)).round() as u8
        };

        let hue_deg = if max == min {
            0.0
        } else {
            let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
            let h = if max == r {
                60.0 * ((gf - bf) / delta)
            } else if max == g {
                60.0 * ((bf - rf) / delta) + 120.0
            } else {
                60.0 * ((rf - gf) / delta) + 240.0
            };
            if h < 0.0 { h + 360.0 } else { h }
        };

        Self {
            hue_deg,
            saturation,
            value: max,
        }
    }
}
