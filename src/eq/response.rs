//! Local magnitude response of the 9-band peaking EQ
//!
//! Used to draw the EQ curve when the backend response endpoint is
//! unreachable. The cascade matches the backend's filter bank: one RBJ
//! peaking biquad per band, all sharing the same Q.

use std::f64::consts::PI;

use super::{EQ_FREQUENCIES, EqGains};

/// Lowest frequency of the response grid (Hz)
const MIN_FREQ: f64 = 20.0;

/// Biquad filter coefficients, normalized by a0
#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    const UNITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// |H(e^jw)| at normalized angular frequency `omega`
    fn magnitude(&self, omega: f64) -> f64 {
        let (c1, s1) = (omega.cos(), omega.sin());
        let (c2, s2) = ((2.0 * omega).cos(), (2.0 * omega).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        if den <= f64::EPSILON { 1.0 } else { num / den }
    }
}

/// Peaking EQ coefficients
/// gain_db: gain in decibels (-12 to +12)
/// freq: center frequency in Hz
/// q: quality factor (bandwidth)
fn calc_peaking_eq(freq: f64, gain_db: f64, sample_rate: f64, q: f64) -> BiquadCoeffs {
    // Bands above nyquist cannot be realized, the backend skips them too
    if gain_db.abs() < 0.01 || freq >= sample_rate / 2.0 {
        return BiquadCoeffs::UNITY;
    }

    let a = 10.0_f64.powf(gain_db / 40.0);
    let omega = 2.0 * PI * freq / sample_rate;
    let alpha = omega.sin() / (2.0 * q);
    let cos_omega = omega.cos();

    let a0 = 1.0 + alpha / a;
    BiquadCoeffs {
        b0: (1.0 + alpha * a) / a0,
        b1: (-2.0 * cos_omega) / a0,
        b2: (1.0 - alpha * a) / a0,
        a1: (-2.0 * cos_omega) / a0,
        a2: (1.0 - alpha / a) / a0,
    }
}

/// Frequency response sampled on a log grid
#[derive(Debug, Clone, PartialEq)]
pub struct LocalResponse {
    pub freqs_hz: Vec<f32>,
    pub mag_db: Vec<f32>,
}

/// Compute the cascade response at `points` log-spaced frequencies from
/// 20 Hz up to min(20 kHz, nyquist)
pub fn compute(gains: &EqGains, sample_rate: u32, q: f32, points: usize) -> LocalResponse {
    let sample_rate = f64::from(sample_rate.max(1));
    let q = f64::from(q).max(0.01);
    let max_freq = (sample_rate / 2.0).min(20_000.0).max(MIN_FREQ * 2.0);
    let points = points.max(2);

    let filters: Vec<BiquadCoeffs> = EQ_FREQUENCIES
        .iter()
        .zip(gains.values())
        .map(|(&freq, gain)| calc_peaking_eq(f64::from(freq), f64::from(gain), sample_rate, q))
        .collect();

    let log_min = MIN_FREQ.log10();
    let log_max = max_freq.log10();

    let mut freqs_hz = Vec::with_capacity(points);
    let mut mag_db = Vec::with_capacity(points);
    for i in 0..points {
        let t = i as f64 / (points - 1) as f64;
        let freq = 10.0_f64.powf(log_min + t * (log_max - log_min));
        let omega = 2.0 * PI * freq / sample_rate;
        let magnitude: f64 = filters.iter().map(|f| f.magnitude(omega)).product();
        freqs_hz.push(freq as f32);
        mag_db.push((20.0 * magnitude.max(1e-9).log10()) as f32);
    }

    LocalResponse { freqs_hz, mag_db }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_at(response: &LocalResponse, freq: f32) -> f32 {
        let idx = response
            .freqs_hz
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - freq).abs().total_cmp(&(b.1 - freq).abs()))
            .map(|(i, _)| i)
            .unwrap();
        response.mag_db[idx]
    }

    #[test]
    fn test_flat_gains_give_flat_response() {
        let response = compute(&EqGains::FLAT, 44100, 1.0, 256);
        assert_eq!(response.freqs_hz.len(), 256);
        assert!(response.mag_db.iter().all(|db| db.abs() < 1e-3));
    }

    #[test]
    fn test_grid_spans_audible_range() {
        let response = compute(&EqGains::FLAT, 48000, 1.0, 100);
        assert!((response.freqs_hz[0] - 20.0).abs() < 1e-3);
        assert!((response.freqs_hz[99] - 20000.0).abs() < 1.0);
        assert!(response.freqs_hz.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_single_band_boost_peaks_near_center() {
        let gains = EqGains::FLAT.with_band(4, 6.0);
        let response = compute(&gains, 44100, 1.0, 512);
        let at_center = db_at(&response, 1000.0);
        assert!((at_center - 6.0).abs() < 0.5, "got {}", at_center);
        assert!(db_at(&response, 20.0).abs() < 0.5);
    }

    #[test]
    fn test_cut_is_negative() {
        let gains = EqGains::FLAT.with_band(2, -9.0);
        let response = compute(&gains, 44100, 1.0, 512);
        assert!(db_at(&response, 250.0) < -8.0);
    }

    #[test]
    fn test_band_above_nyquist_is_bypassed() {
        let gains = EqGains::FLAT.with_band(8, 12.0);
        let response = compute(&gains, 16000, 1.0, 64);
        assert!(response.mag_db.iter().all(|db| db.abs() < 1e-3));
    }
}
