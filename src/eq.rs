//! 9-band equalizer gains
//!
//! Band centers: 63Hz, 125Hz, 250Hz, 500Hz, 1kHz, 2kHz, 4kHz, 8kHz, 16kHz.
//! All gain <-> slider conversions go through [`gain_to_percent`] and
//! [`percent_to_gain`].

pub mod response;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of equalizer bands
pub const BAND_COUNT: usize = 9;

/// Band center frequencies in Hz, ascending
pub const EQ_FREQUENCIES: [f32; BAND_COUNT] = [
    63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Lowest gain a band accepts (dB)
pub const MIN_GAIN_DB: f32 = -12.0;

/// Highest gain a band accepts (dB)
pub const MAX_GAIN_DB: f32 = 12.0;

/// Total span of the gain range (dB)
pub const GAIN_SPAN_DB: f32 = MAX_GAIN_DB - MIN_GAIN_DB;

/// Range used for suggestion fallbacks
const RANDOM_GAIN_DB: f32 = 8.0;

/// Map a gain in dB to a slider fill percentage (0..=100)
pub fn gain_to_percent(gain_db: f32) -> f32 {
    ((gain_db - MIN_GAIN_DB) / GAIN_SPAN_DB * 100.0).clamp(0.0, 100.0)
}

/// Map a slider fill percentage back to a gain in dB
pub fn percent_to_gain(percent: f32) -> f32 {
    percent.clamp(0.0, 100.0) / 100.0 * GAIN_SPAN_DB + MIN_GAIN_DB
}

/// Immutable snapshot of all band gains
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EqGains([f32; BAND_COUNT]);

impl EqGains {
    /// All bands at 0 dB
    pub const FLAT: Self = Self([0.0; BAND_COUNT]);

    /// Build from raw values, clamping each band into the valid range
    pub fn new(values: [f32; BAND_COUNT]) -> Self {
        Self(values.map(|v| v.clamp(MIN_GAIN_DB, MAX_GAIN_DB)))
    }

    /// Build from a slice coming off the wire; `None` unless it has exactly 9 values
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: [f32; BAND_COUNT] = values.try_into().ok()?;
        Some(Self::new(values))
    }

    /// Random gains in [-8, +8] dB rounded to 0.1 dB
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self(std::array::from_fn(|_| {
            let r: f32 = rng.random_range(-RANDOM_GAIN_DB..RANDOM_GAIN_DB);
            (r * 10.0).round() / 10.0
        }))
    }

    /// Copy with one band replaced (index out of range is ignored)
    pub fn with_band(mut self, band: usize, gain_db: f32) -> Self {
        if let Some(slot) = self.0.get_mut(band) {
            *slot = gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB);
        }
        self
    }

    pub fn get(&self, band: usize) -> Option<f32> {
        self.0.get(band).copied()
    }

    pub fn values(&self) -> [f32; BAND_COUNT] {
        self.0
    }

    pub fn is_flat(&self) -> bool {
        self.0.iter().all(|g| *g == 0.0)
    }
}

/// Format a band frequency label ("63", "1k", "16k")
pub fn band_label(freq: f32) -> String {
    if freq >= 1000.0 {
        format!("{}k", freq / 1000.0)
    } else {
        format!("{}", freq)
    }
}
