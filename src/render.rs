//! Chart rendering primitives
//!
//! Every chart is a pure function from numeric series and a logical surface
//! size to a list of [`DrawCommand`]s. The UI replays the list onto a canvas
//! frame; nothing here touches shared state or performs I/O.

pub mod eq_curve;
pub mod scale;
pub mod spectrogram;
pub mod spectrum;
pub mod waveform;

/// Padding around every plot (logical px)
pub const PADDING: f32 = 12.0;

/// Extra room below the plot for axis labels
pub const LABEL_SPACE: f32 = 12.0;

/// Axis label font size
pub const LABEL_SIZE: f32 = 10.0;

/// Playhead marker color (#ff4a88)
pub const PLAYHEAD: Rgba = Rgba::rgb(0xff, 0x4a, 0x88);

/// Overlay series color (muted gold)
pub const OVERLAY: Rgba = Rgba::new(255, 215, 0, 0.6);

/// Line color of primary series (#4fb4ff)
pub const PRIMARY_LINE: Rgba = Rgba::rgb(0x4f, 0xb4, 0xff);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 8-bit RGB with float alpha, as CSS writes it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Translucent white, used for axes and labels
    pub const fn white(a: f32) -> Self {
        Self::new(255, 255, 255, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Solid(Rgba),
    /// Linear gradient from `top` at `from_y` to `bottom` at `to_y`
    VerticalGradient {
        top: Rgba,
        bottom: Rgba,
        from_y: f32,
        to_y: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Wipe the surface; only primary series emit it
    Clear,
    Polyline {
        points: Vec<Point>,
        color: Rgba,
        width: f32,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        width: f32,
    },
    Rect {
        origin: Point,
        width: f32,
        height: f32,
        fill: Fill,
    },
    /// `position` is the baseline anchor, as canvas `fillText` uses it
    Text {
        content: String,
        position: Point,
        color: Rgba,
        size: f32,
        align: TextAlign,
    },
}

/// Logical drawing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Padded plot rectangle
    pub fn plot(&self) -> PlotArea {
        PlotArea {
            left: PADDING,
            top: PADDING,
            width: (self.width - PADDING * 2.0).max(0.0),
            height: (self.height - PADDING * 2.0 - LABEL_SPACE).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PlotArea {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// A pair of parallel x/y slices
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub x: &'a [f32],
    pub y: &'a [f32],
}

impl<'a> Series<'a> {
    pub fn new(x: &'a [f32], y: &'a [f32]) -> Self {
        Self { x, y }
    }

    /// Number of usable points (the shorter slice wins)
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + 'a {
        let (x, y) = (self.x, self.y);
        x.iter().copied().zip(y.iter().copied())
    }

    /// Points with both coordinates finite; gaps in the data are skipped
    pub fn finite_points(&self) -> impl Iterator<Item = (f32, f32)> + 'a {
        self.points().filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

/// Small tick below the plot with a centered label under it
pub(crate) fn axis_tick(
    commands: &mut Vec<DrawCommand>,
    plot: &PlotArea,
    x: f32,
    label: String,
    tick_color: Rgba,
    label_color: Rgba,
) {
    commands.push(DrawCommand::Line {
        from: Point::new(x, plot.bottom()),
        to: Point::new(x, plot.bottom() + 4.0),
        color: tick_color,
        width: 1.0,
    });
    commands.push(DrawCommand::Text {
        content: label,
        position: Point::new(x, plot.bottom() + 12.0),
        color: label_color,
        size: LABEL_SIZE,
        align: TextAlign::Center,
    });
}

/// Vertical full-height marker at `x`
pub(crate) fn playhead_line(surface: &Surface, x: f32) -> DrawCommand {
    DrawCommand::Line {
        from: Point::new(x, 0.0),
        to: Point::new(x, surface.height),
        color: PLAYHEAD,
        width: 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_area_layout() {
        let plot = Surface::new(400.0, 200.0).plot();
        assert_eq!(plot.left, 12.0);
        assert_eq!(plot.top, 12.0);
        assert_eq!(plot.width, 376.0);
        assert_eq!(plot.height, 164.0);
        assert_eq!(plot.bottom(), 176.0);
    }

    #[test]
    fn test_tiny_surface_never_goes_negative() {
        let plot = Surface::new(10.0, 10.0).plot();
        assert_eq!(plot.width, 0.0);
        assert_eq!(plot.height, 0.0);
    }

    #[test]
    fn test_series_uses_shorter_slice() {
        let series = Series::new(&[1.0, 2.0, 3.0], &[4.0, 5.0]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points().collect::<Vec<_>>(), vec![(1.0, 4.0), (2.0, 5.0)]);
    }

    #[test]
    fn test_finite_points_skip_gaps() {
        let x = [1.0, 2.0, f32::NAN, 4.0];
        let y = [1.0, f32::NEG_INFINITY, 3.0, 4.0];
        let series = Series::new(&x, &y);
        assert_eq!(series.finite_points().collect::<Vec<_>>(), vec![(1.0, 1.0), (4.0, 4.0)]);
    }
}
