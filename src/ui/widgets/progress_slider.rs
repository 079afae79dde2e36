//! Seek bar
//!
//! Dragging only previews the position (the waveform shows a playhead);
//! the seek is committed on release.

use iced::widget::slider;
use iced::{Color, Element, Length};

use crate::ui::theme;

/// Seek bar over the track, `position` as a fraction
pub fn seek_bar<'a, Message: Clone + 'a>(
    position: f32,
    on_preview: impl Fn(f32) -> Message + 'a,
    on_release: Message,
) -> Element<'a, Message> {
    let position = if position.is_finite() { position.clamp(0.0, 1.0) } else { 0.0 };

    slider(0.0..=1.0, position, on_preview)
        .on_release(on_release)
        .width(Length::Fill)
        .height(16)
        .step(0.001)
        .style(|iced_theme, status| {
            let handle_radius = match status {
                slider::Status::Hovered | slider::Status::Dragged => 6.0,
                _ => 0.0,
            };
            slider::Style {
                rail: slider::Rail {
                    backgrounds: (
                        iced::Background::Color(theme::ACCENT_PINK),
                        iced::Background::Color(theme::divider(iced_theme)),
                    ),
                    width: 4.0,
                    border: iced::Border {
                        radius: 2.0.into(),
                        width: 0.0,
                        color: Color::TRANSPARENT,
                    },
                },
                handle: slider::Handle {
                    shape: slider::HandleShape::Circle {
                        radius: handle_radius,
                    },
                    background: iced::Background::Color(theme::ACCENT_PINK),
                    border_width: 0.0,
                    border_color: Color::TRANSPARENT,
                },
            }
        })
        .into()
}
