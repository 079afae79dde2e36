//! Spectrogram heat map
//!
//! Cells fill the whole surface edge to edge; there is no axis padding.

use super::{DrawCommand, Fill, Point, Rgba, Surface, playhead_line};

const FLOOR_DB: f32 = -80.0;
const CEIL_DB: f32 = 0.0;

/// Cell color for a dB value
///
/// Quiet cells run orange to yellow, loud cells magenta to blue.
pub fn cell_color(db: f32) -> Rgba {
    let n = ((db - FLOOR_DB) / (CEIL_DB - FLOOR_DB)).clamp(0.0, 1.0);
    if n < 0.5 {
        Rgba::rgb(255, channel(159.0 + n * 96.0), 74)
    } else {
        Rgba::rgb(channel(255.0 - (n - 0.5) * 255.0), 74, 255)
    }
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// One rectangle per (frequency bin, time frame), row 0 at the bottom
///
/// `data` is indexed `[freq][time]`; the frame count comes from the first row.
pub fn cells(surface: &Surface, data: &[Vec<f32>]) -> Vec<DrawCommand> {
    let Some(first) = data.first() else {
        return Vec::new();
    };
    let (bins, frames) = (data.len(), first.len());
    if frames == 0 {
        return Vec::new();
    }

    let cell_w = surface.width / frames as f32;
    let cell_h = surface.height / bins as f32;
    let mut commands = Vec::with_capacity(bins * frames + 1);
    commands.push(DrawCommand::Clear);

    for (f, row) in data.iter().enumerate() {
        let y = (bins - f - 1) as f32 * cell_h;
        for (t, &db) in row.iter().take(frames).enumerate() {
            let x = t as f32 * cell_w;
            let width = cell_w.min(surface.width - x);
            let height = cell_h.min(surface.height - y);
            if width > 0.0 && height > 0.0 {
                commands.push(DrawCommand::Rect {
                    origin: Point::new(x, y),
                    width,
                    height,
                    fill: Fill::Solid(cell_color(db)),
                });
            }
        }
    }

    commands
}

/// Playhead for `current_time`, scaled against the last frame time
pub fn playhead(surface: &Surface, times: &[f32], current_time: f32) -> Option<DrawCommand> {
    let duration = times.last().copied().filter(|d| *d > 0.0)?;
    let fraction = (current_time / duration).clamp(0.0, 1.0);
    fraction
        .is_finite()
        .then(|| playhead_line(surface, fraction * surface.width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette() {
        assert_eq!(cell_color(-80.0), Rgba::rgb(255, 159, 74));
        assert_eq!(cell_color(-200.0), Rgba::rgb(255, 159, 74));
        assert_eq!(cell_color(-60.0), Rgba::rgb(255, 183, 74));
        assert_eq!(cell_color(-40.0), Rgba::rgb(255, 74, 255));
        assert_eq!(cell_color(-20.0), Rgba::rgb(191, 74, 255));
        assert_eq!(cell_color(0.0), Rgba::rgb(128, 74, 255));
        assert_eq!(cell_color(12.0), Rgba::rgb(128, 74, 255));
    }

    #[test]
    fn test_row_zero_is_bottom() {
        let data = vec![vec![-80.0, -80.0], vec![0.0, 0.0]];
        let commands = cells(&Surface::new(100.0, 50.0), &data);
        assert_eq!(commands[0], DrawCommand::Clear);
        assert_eq!(commands.len(), 5);
        assert_eq!(
            commands[1],
            DrawCommand::Rect {
                origin: Point::new(0.0, 25.0),
                width: 50.0,
                height: 25.0,
                fill: Fill::Solid(Rgba::rgb(255, 159, 74)),
            }
        );
        assert!(matches!(
            commands[3],
            DrawCommand::Rect { origin, .. } if origin == Point::new(0.0, 0.0)
        ));
    }

    #[test]
    fn test_empty_matrix() {
        assert!(cells(&Surface::new(10.0, 10.0), &[]).is_empty());
        assert!(cells(&Surface::new(10.0, 10.0), &[Vec::new()]).is_empty());
    }

    #[test]
    fn test_playhead_uses_last_time() {
        let surface = Surface::new(200.0, 50.0);
        let times = [0.0, 5.0, 10.0];
        assert_eq!(playhead(&surface, &times, 2.5), Some(playhead_line(&surface, 50.0)));
        assert_eq!(playhead(&surface, &times, 30.0), Some(playhead_line(&surface, 200.0)));
        assert_eq!(playhead(&surface, &[], 1.0), None);
        assert_eq!(playhead(&surface, &[0.0], 1.0), None);
    }
}
