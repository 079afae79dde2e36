//! Waveform chart

use super::{
    DrawCommand, LABEL_SIZE, OVERLAY, PRIMARY_LINE, Point, Rgba, Series, Surface, TextAlign,
    axis_tick, playhead_line,
};
use crate::utils::format_time;

const TIME_TICKS: usize = 6;

/// Draw one waveform series
///
/// The primary series clears the surface and adds the center line, the
/// amplitude labels and the time ticks; an overlay only adds its polyline.
pub fn draw(
    surface: &Surface,
    series: Series<'_>,
    duration: f32,
    color: Rgba,
    overlay: bool,
) -> Vec<DrawCommand> {
    if series.is_empty() {
        return Vec::new();
    }

    let plot = surface.plot();
    let center_y = plot.top + plot.height * 0.5;
    let peak = series
        .y
        .iter()
        .map(|v| v.abs())
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max);
    let scale = plot.height * 0.45 / if peak > 0.0 { peak } else { 1.0 };
    let right = surface.width - super::PADDING;

    let mut points = Vec::with_capacity(series.len() + 1);
    points.push(Point::new(plot.left, center_y));
    points.extend(series.finite_points().map(|(t, amp)| {
        let x = plot.left + t / duration * plot.width;
        let y = center_y - amp * scale;
        Point::new(clamp(x, plot.left, right), clamp(y, plot.top, plot.bottom()))
    }));

    let mut commands = Vec::new();
    if !overlay {
        commands.push(DrawCommand::Clear);
    }
    commands.push(DrawCommand::Polyline {
        points,
        color,
        width: 1.4,
    });

    if overlay {
        return commands;
    }

    commands.push(DrawCommand::Line {
        from: Point::new(plot.left, center_y),
        to: Point::new(plot.right(), center_y),
        color: Rgba::white(0.16),
        width: 1.0,
    });

    let label_color = Rgba::white(0.6);
    for (content, y) in [
        ("+1", plot.top + 10.0),
        ("0", center_y - 2.0),
        ("-1", plot.bottom() - 2.0),
    ] {
        commands.push(DrawCommand::Text {
            content: content.to_string(),
            position: Point::new(plot.left, y),
            color: label_color,
            size: LABEL_SIZE,
            align: TextAlign::Left,
        });
    }

    for i in 0..TIME_TICKS {
        let ratio = i as f32 / (TIME_TICKS - 1) as f32;
        let x = plot.left + ratio * plot.width;
        axis_tick(
            &mut commands,
            &plot,
            x,
            format_time(ratio * duration),
            Rgba::white(0.12),
            label_color,
        );
    }

    commands
}

/// Full waveform chart: primary, optional overlay, optional playhead
///
/// `playhead` is a fraction of the track (clamped to 0..=1).
pub fn chart(
    surface: &Surface,
    primary: Series<'_>,
    overlay: Option<Series<'_>>,
    duration: f32,
    playhead: Option<f32>,
) -> Vec<DrawCommand> {
    let mut commands = draw(surface, primary, duration, PRIMARY_LINE, false);
    if let Some(series) = overlay {
        commands.extend(draw(surface, series, duration, OVERLAY, true));
    }
    if let Some(fraction) = playhead.filter(|f| f.is_finite()) {
        commands.push(playhead_line(surface, fraction.clamp(0.0, 1.0) * surface.width));
    }
    commands
}

/// Like `f32::clamp`, but tolerates `lo > hi` on degenerate surfaces
fn clamp(value: f32, lo: f32, hi: f32) -> f32 {
    value.min(hi).max(lo)
}
