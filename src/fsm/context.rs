//! Sensor readings fed into the risk state machine.
//!
//! A [`Reading`] is immutable once built.  Readings arrive at an irregular
//! cadence; the engine never assumes a fixed sample rate and a missing
//! sample simply means the previous tier stands a little longer.

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// A point-in-time snapshot of every sensor on the remote node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Air temperature (°C).
    pub temperature_c: f32,
    /// Ambient light (lux).
    pub light_lux: f32,
    /// Relative humidity (%).
    pub humidity_pct: f32,
    /// Barometric pressure (hPa).
    pub pressure_hpa: f32,
    /// Milliseconds since the Unix epoch when the sample was taken.
    pub timestamp_ms: u64,
}

impl Reading {
    pub fn new(
        temperature_c: f32,
        light_lux: f32,
        humidity_pct: f32,
        pressure_hpa: f32,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            temperature_c,
            light_lux,
            humidity_pct,
            pressure_hpa,
            timestamp_ms,
        }
    }

    /// Reject NaN / infinite channels.  Ingestion normally filters these;
    /// the engine re-checks so a bad sample can never move the tier.
    pub fn validate(&self) -> Result<(), DataError> {
        let finite = self.temperature_c.is_finite()
            && self.light_lux.is_finite()
            && self.humidity_pct.is_finite()
            && self.pressure_hpa.is_finite();
        if finite {
            Ok(())
        } else {
            Err(DataError::NonFiniteReading)
        }
    }
}
