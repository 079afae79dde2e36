//! Axis scales shared by the charts

/// Hard bounds of every spectrum display
pub const SPECTRUM_FLOOR_DB: f32 = -120.0;
pub const SPECTRUM_CEIL_DB: f32 = 20.0;

/// dB window of a spectrum plot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbRange {
    pub min: f32,
    pub max: f32,
}

impl DbRange {
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Position of `db` inside the window, clamped to 0..=1
    ///
    /// Non-finite input stays NaN so callers can skip it.
    pub fn normalize(&self, db: f32) -> f32 {
        ((db - self.min) / self.span()).clamp(0.0, 1.0)
    }

    /// Fit a window around the finite values of `values`
    ///
    /// Pads by 10% of the spread (at least 5 dB), rounds outward to whole dB
    /// and clamps to -120..+20. With no finite value the full display range
    /// is used.
    pub fn adaptive(values: &[f32]) -> Self {
        let (lo, hi) = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f32, f32)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or((SPECTRUM_FLOOR_DB, SPECTRUM_CEIL_DB));

        let pad = ((hi - lo) * 0.1).max(5.0);
        Self {
            min: (lo - pad).floor().max(SPECTRUM_FLOOR_DB),
            max: (hi + pad).ceil().min(SPECTRUM_CEIL_DB),
        }
    }

    /// Grid step: 5 x 10^(floor(log10(span)) - 1)
    pub fn grid_step(&self) -> f32 {
        5.0 * 10f32.powf(self.span().log10().floor() - 1.0)
    }

    /// Grid values from the first step multiple at or above `min` up to `max`
    pub fn grid_values(&self) -> Vec<f32> {
        let step = self.grid_step();
        if !step.is_finite() || step <= 0.0 {
            return Vec::new();
        }
        let start = (self.min / step).ceil() * step;
        (0..)
            .map(|k| start + k as f32 * step)
            .take_while(|db| *db <= self.max + step * 1e-4)
            .collect()
    }
}

/// Linear map of `value` from `[0, max]` onto `[origin, origin + length]`
pub fn linear(value: f32, max: f32, origin: f32, length: f32) -> f32 {
    origin + value / max * length
}

/// Base-10 logarithmic frequency axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogAxis {
    log_min: f32,
    log_max: f32,
    min: f32,
}

impl LogAxis {
    /// `None` if the range is empty or not positive
    pub fn new(min: f32, max: f32) -> Option<Self> {
        if !(min > 0.0 && max > min) {
            return None;
        }
        Some(Self {
            log_min: min.log10(),
            log_max: max.log10(),
            min,
        })
    }

    /// Fraction along the axis; values below the minimum pin to it
    pub fn fraction(&self, freq: f32) -> f32 {
        (freq.max(self.min).log10() - self.log_min) / (self.log_max - self.log_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_range_pads_and_rounds() {
        let range = DbRange::adaptive(&[-60.0, -20.0]);
        // spread 40, pad max(5, 4) = 5
        assert_eq!(range, DbRange { min: -65.0, max: -15.0 });

        let wide = DbRange::adaptive(&[-100.0, 0.0]);
        // pad 10
        assert_eq!(wide, DbRange { min: -110.0, max: 10.0 });
    }

    #[test]
    fn test_adaptive_range_clamps_and_ignores_non_finite() {
        let range = DbRange::adaptive(&[f32::NEG_INFINITY, -119.0, 19.0, f32::NAN]);
        assert_eq!(range.min, -120.0);
        assert_eq!(range.max, 20.0);
    }

    #[test]
    fn test_adaptive_range_without_data() {
        let range = DbRange::adaptive(&[f32::NAN]);
        assert_eq!(range, DbRange { min: -120.0, max: 20.0 });
    }

    #[test]
    fn test_grid_step_scales_with_span() {
        assert_eq!(DbRange { min: -65.0, max: -15.0 }.grid_step(), 5.0);
        assert_eq!(DbRange { min: -120.0, max: 20.0 }.grid_step(), 50.0);
        assert_eq!(DbRange { min: -10.0, max: -2.0 }.grid_step(), 0.5);
    }

    #[test]
    fn test_grid_values_cover_window() {
        let values = DbRange { min: -120.0, max: 20.0 }.grid_values();
        assert_eq!(values, vec![-100.0, -50.0, 0.0]);

        let values = DbRange { min: -63.0, max: -47.0 }.grid_values();
        assert_eq!(values, vec![-60.0, -55.0, -50.0]);
    }

    #[test]
    fn test_log_axis() {
        let axis = LogAxis::new(20.0, 20000.0).unwrap();
        assert!((axis.fraction(20.0)).abs() < 1e-6);
        assert!((axis.fraction(20000.0) - 1.0).abs() < 1e-6);
        assert!((axis.fraction(632.455_5) - 0.5).abs() < 1e-4);
        assert_eq!(axis.fraction(5.0), axis.fraction(20.0));
        assert!(LogAxis::new(20.0, 20.0).is_none());
    }
}
