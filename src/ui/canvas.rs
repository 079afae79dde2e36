//! Chart canvases
//!
//! Replays the `render` command lists onto iced canvas frames. Each chart
//! asks its renderer for commands at the canvas's current size, so a window
//! resize re-lays the chart out.

use iced::widget::canvas::{self, Cache, Canvas, Frame, Geometry, Path, Stroke, Text};
use iced::{Color, Element, Fill, Length, Pixels, Rectangle, Size, Theme, mouse};

use crate::render::{
    self, DrawCommand, Rgba, Series, Surface, TextAlign, eq_curve, spectrogram, spectrum,
    waveform,
};

/// What a chart canvas shows
pub enum Chart<'a> {
    Waveform {
        primary: Series<'a>,
        overlay: Option<Series<'a>>,
        duration: f32,
        /// Scrub position as a fraction of the track
        playhead: Option<f32>,
    },
    Spectrum {
        primary: Series<'a>,
        overlay: Option<Series<'a>>,
        max_freq: Option<f32>,
    },
    /// Cells come from `cache`; only the playhead is drawn per frame
    Spectrogram {
        data: &'a [Vec<f32>],
        times: &'a [f32],
        current_time: Option<f32>,
        cache: &'a Cache,
    },
    EqCurve(Series<'a>),
    /// Placeholder while no data is loaded
    Empty,
}

impl Chart<'_> {
    fn commands(&self, surface: &Surface) -> Vec<DrawCommand> {
        match self {
            Chart::Waveform {
                primary,
                overlay,
                duration,
                playhead,
            } => waveform::chart(surface, *primary, *overlay, *duration, *playhead),
            Chart::Spectrum {
                primary,
                overlay,
                max_freq,
            } => spectrum::chart(surface, *primary, *overlay, *max_freq),
            Chart::Spectrogram {
                times,
                current_time,
                ..
            } => current_time
                .and_then(|t| spectrogram::playhead(surface, times, t))
                .into_iter()
                .collect(),
            Chart::EqCurve(series) => eq_curve::draw(surface, *series),
            Chart::Empty => vec![DrawCommand::Clear],
        }
    }
}

impl<Message> canvas::Program<Message> for Chart<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let surface = Surface::new(bounds.width, bounds.height);
        let mut layers = Vec::with_capacity(2);

        if let Chart::Spectrogram { data, cache, .. } = self {
            layers.push(cache.draw(renderer, bounds.size(), |frame| {
                replay(frame, &spectrogram::cells(&surface, data));
            }));
        }

        let mut frame = Frame::new(renderer, bounds.size());
        replay(&mut frame, &self.commands(&surface));
        layers.push(frame.into_geometry());
        layers
    }
}

/// Canvas element filling the width at a fixed height
pub fn chart<'a, Message: 'a>(chart: Chart<'a>, height: f32) -> Element<'a, Message> {
    Canvas::new(chart)
        .width(Fill)
        .height(Length::Fixed(height))
        .into()
}

fn color(rgba: Rgba) -> Color {
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}

fn point(p: render::Point) -> iced::Point {
    iced::Point::new(p.x, p.y)
}

/// Draw `commands` in order onto `frame`
fn replay(frame: &mut Frame, commands: &[DrawCommand]) {
    for command in commands {
        match command {
            DrawCommand::Clear => {
                // Frames start transparent; the panel behind shows through
            }
            DrawCommand::Polyline {
                points,
                color: c,
                width,
            } => {
                let Some((first, rest)) = points.split_first() else {
                    continue;
                };
                let path = Path::new(|builder| {
                    builder.move_to(point(*first));
                    for p in rest {
                        builder.line_to(point(*p));
                    }
                });
                frame.stroke(&path, Stroke::default().with_color(color(*c)).with_width(*width));
            }
            DrawCommand::Line {
                from,
                to,
                color: c,
                width,
            } => {
                let path = Path::line(point(*from), point(*to));
                frame.stroke(&path, Stroke::default().with_color(color(*c)).with_width(*width));
            }
            DrawCommand::Rect {
                origin,
                width,
                height,
                fill,
            } => {
                let size = Size::new(*width, *height);
                match fill {
                    render::Fill::Solid(c) => frame.fill_rectangle(point(*origin), size, color(*c)),
                    render::Fill::VerticalGradient {
                        top,
                        bottom,
                        from_y,
                        to_y,
                    } => {
                        let gradient = canvas::gradient::Linear::new(
                            iced::Point::new(origin.x, *from_y),
                            iced::Point::new(origin.x, *to_y),
                        )
                        .add_stop(0.0, color(*top))
                        .add_stop(1.0, color(*bottom));
                        frame.fill_rectangle(point(*origin), size, gradient);
                    }
                }
            }
            DrawCommand::Text {
                content,
                position,
                color: c,
                size,
                align,
            } => {
                let align_x = match align {
                    TextAlign::Left => iced::alignment::Horizontal::Left,
                    TextAlign::Center => iced::alignment::Horizontal::Center,
                };
                frame.fill_text(Text {
                    content: content.clone(),
                    position: point(*position),
                    color: color(*c),
                    size: Pixels(*size),
                    align_x: align_x.into(),
                    align_y: iced::alignment::Vertical::Bottom,
                    ..Text::default()
                });
            }
        }
    }
}
