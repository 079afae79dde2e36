//! EQ filter response curve

use super::scale::LogAxis;
use super::{
    DrawCommand, LABEL_SIZE, PRIMARY_LINE, Point, Rgba, Series, Surface, TextAlign, axis_tick,
};
use crate::eq::{EQ_FREQUENCIES, MAX_GAIN_DB, MIN_GAIN_DB, band_label};

const MIN_FREQ: f32 = 20.0;
const DEFAULT_MAX_FREQ: f32 = 20000.0;

fn gain_y(db: f32, top: f32, height: f32) -> f32 {
    let norm = (db - MIN_GAIN_DB) / (MAX_GAIN_DB - MIN_GAIN_DB);
    top + (1.0 - norm) * height
}

/// Response curve on a log frequency axis with a fixed ±12 dB scale
pub fn draw(surface: &Surface, response: Series<'_>) -> Vec<DrawCommand> {
    if response.is_empty() {
        return Vec::new();
    }

    let max_freq = response
        .x
        .last()
        .copied()
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(DEFAULT_MAX_FREQ);
    let Some(axis) = LogAxis::new(MIN_FREQ, max_freq) else {
        return vec![DrawCommand::Clear];
    };

    let plot = surface.plot();
    let grid_color = Rgba::white(0.12);
    let label_color = Rgba::white(0.6);
    let mut commands = vec![DrawCommand::Clear];

    for db in [12, 0, -12] {
        let y = gain_y(db as f32, plot.top, plot.height);
        commands.push(DrawCommand::Line {
            from: Point::new(plot.left, y),
            to: Point::new(plot.right(), y),
            color: grid_color,
            width: 1.0,
        });
        commands.push(DrawCommand::Text {
            content: format!("{} dB", db),
            position: Point::new(plot.left, y - 2.0),
            color: label_color,
            size: LABEL_SIZE,
            align: TextAlign::Left,
        });
    }

    let points = response
        .finite_points()
        .map(|(freq, db)| {
            let x = plot.left + axis.fraction(freq) * plot.width;
            let y = gain_y(db.clamp(MIN_GAIN_DB, MAX_GAIN_DB), plot.top, plot.height);
            Point::new(x, y)
        })
        .collect();
    commands.push(DrawCommand::Polyline {
        points,
        color: PRIMARY_LINE,
        width: 2.0,
    });

    for freq in EQ_FREQUENCIES
        .into_iter()
        .filter(|f| *f >= MIN_FREQ && *f <= max_freq)
    {
        let x = plot.left + axis.fraction(freq) * plot.width;
        axis_tick(&mut commands, &plot, x, band_label(freq), grid_color, label_color);
    }

    commands
}
