//! Spectrum (FFT) bar chart

use super::scale::{DbRange, linear};
use super::{
    DrawCommand, Fill, LABEL_SIZE, OVERLAY, PlotArea, Point, Rgba, Series, Surface, TextAlign,
    axis_tick,
};
use crate::eq::band_label;

/// Frequency axis used when the series carries no usable last frequency
pub const DEFAULT_MAX_FREQ: f32 = 22050.0;

const TICK_FREQS: [f32; 7] = [0.0, 1000.0, 2000.0, 5000.0, 10000.0, 15000.0, 20000.0];

const BAR_TOP: Rgba = Rgba::rgb(0x4a, 0x90, 0xff);
const BAR_BOTTOM: Rgba = Rgba::rgb(0x7f, 0x5c, 0xff);

/// Shared axes of one spectrum chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumAxes {
    pub range: DbRange,
    pub max_freq: f32,
}

impl SpectrumAxes {
    /// Adaptive dB range over the series; frequency axis up to `max_freq`
    /// or the series' last frequency
    pub fn fit(series: Series<'_>, max_freq: Option<f32>) -> Self {
        let max_freq = max_freq
            .or_else(|| series.x.last().copied())
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(DEFAULT_MAX_FREQ);
        Self {
            range: DbRange::adaptive(&series.y[..series.len()]),
            max_freq,
        }
    }
}

/// Bars of one series; the primary gets the gradient, an overlay the gold
fn bars(plot: &PlotArea, series: Series<'_>, axes: &SpectrumAxes, overlay: bool) -> Vec<DrawCommand> {
    let count = series.len();
    let mut commands = Vec::with_capacity(count);

    for i in 0..count {
        let (freq, db) = (series.x[i], series.y[i]);
        let amp = axes.range.normalize(db) * plot.height;
        let x = linear(freq, axes.max_freq, plot.left, plot.width);
        let y = plot.bottom() - amp;

        let next_freq = if i + 1 < count { series.x[i + 1] } else { axes.max_freq };
        let next_x = linear(next_freq, axes.max_freq, plot.left, plot.width);
        let width = ((next_x - x) * 0.9).min(plot.width - (x - plot.left)).max(1.0);
        let height = amp.min(plot.bottom() - y);

        // NaN fails both comparisons
        if !(width > 0.0 && height > 0.0) {
            continue;
        }

        let fill = if overlay {
            Fill::Solid(OVERLAY)
        } else {
            Fill::VerticalGradient {
                top: BAR_TOP,
                bottom: BAR_BOTTOM,
                from_y: y,
                to_y: plot.bottom(),
            }
        };
        commands.push(DrawCommand::Rect {
            origin: Point::new(x, y),
            width,
            height,
            fill,
        });
    }

    commands
}

/// Border, dB grid and frequency ticks
fn decorations(plot: &PlotArea, axes: &SpectrumAxes) -> Vec<DrawCommand> {
    let mut commands = Vec::new();
    let border = Rgba::white(0.3);
    let (l, t, r, b) = (plot.left, plot.top, plot.right(), plot.bottom());
    for (from, to) in [
        ((l, b), (r, b)),
        ((l, t), (l, b)),
        ((l, t), (r, t)),
        ((r, t), (r, b)),
    ] {
        commands.push(DrawCommand::Line {
            from: Point::new(from.0, from.1),
            to: Point::new(to.0, to.1),
            color: border,
            width: 1.5,
        });
    }

    let label_color = Rgba::white(0.8);
    for db in axes.range.grid_values() {
        let y = plot.top + (1.0 - (db - axes.range.min) / axes.range.span()) * plot.height;
        commands.push(DrawCommand::Line {
            from: Point::new(l, y),
            to: Point::new(r, y),
            color: Rgba::white(0.25),
            width: 1.0,
        });
        commands.push(DrawCommand::Text {
            content: db_label(db),
            position: Point::new(l - 2.0, y + 4.0),
            color: label_color,
            size: LABEL_SIZE,
            align: TextAlign::Left,
        });
    }

    for freq in TICK_FREQS.into_iter().filter(|f| *f <= axes.max_freq) {
        let x = linear(freq, axes.max_freq, l, plot.width);
        axis_tick(&mut commands, plot, x, band_label(freq), Rgba::white(0.2), label_color);
    }

    commands
}

/// "+N dB" / "-N dB"
pub fn db_label(db: f32) -> String {
    let rounded = db.round() as i32;
    if db >= 0.0 {
        format!("+{} dB", rounded)
    } else {
        format!("{} dB", rounded)
    }
}

/// Draw the primary series with its axes
pub fn draw(surface: &Surface, series: Series<'_>, axes: &SpectrumAxes) -> Vec<DrawCommand> {
    if series.is_empty() {
        return Vec::new();
    }
    let plot = surface.plot();
    let mut commands = vec![DrawCommand::Clear];
    commands.extend(bars(&plot, series, axes, false));
    commands.extend(decorations(&plot, axes));
    commands
}

/// Draw an overlay series on axes fitted to the primary
pub fn draw_overlay(surface: &Surface, series: Series<'_>, axes: &SpectrumAxes) -> Vec<DrawCommand> {
    if series.is_empty() {
        return Vec::new();
    }
    bars(&surface.plot(), series, axes, true)
}

/// Full chart: primary, then the optional overlay on the primary's axes
///
/// `max_freq` overrides the frequency axis end; live analyser frames pass
/// the nyquist frequency.
pub fn chart(
    surface: &Surface,
    primary: Series<'_>,
    overlay: Option<Series<'_>>,
    max_freq: Option<f32>,
) -> Vec<DrawCommand> {
    let axes = SpectrumAxes::fit(primary, max_freq);
    let mut commands = draw(surface, primary, &axes);
    if let Some(series) = overlay {
        commands.extend(draw_overlay(surface, series, &axes));
    }
    commands
}
