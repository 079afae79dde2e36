//! Toast notification widget
//!
//! Engine notifications and upload refusals surface here for a few
//! seconds; a newer toast replaces the visible one.

use iced::widget::{button, container, row, text};
use iced::{Alignment, Color, Element, Length, Padding};

use crate::ui::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStyle {
    Success,
    Error,
}

impl ToastStyle {
    /// Accent for the indicator bar and icon
    pub fn accent_color(&self) -> iced::Color {
        match self {
            ToastStyle::Success => theme::success(&iced::Theme::Dark),
            ToastStyle::Error => theme::danger(&iced::Theme::Dark),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ToastStyle::Success => "✓",
            ToastStyle::Error => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub style: ToastStyle,
    /// Sequence number; a hide timer only clears its own toast
    pub id: u64,
}

impl Toast {
    pub fn new(id: u64, message: impl Into<String>, style: ToastStyle) -> Self {
        Self {
            message: message.into(),
            style,
            id,
        }
    }
}

/// Card tinted by the toast style, with a dismiss button
pub fn view_toast<'a, Message: Clone + 'a>(toast: &Toast, on_dismiss: Message) -> Element<'a, Message> {
    let accent = toast.style.accent_color();

    let dismiss = button(text("×").size(14))
        .padding(Padding::new(0.0).left(6.0).right(6.0))
        .style(move |theme, status| button::Style {
            background: None,
            text_color: match status {
                button::Status::Hovered => theme::text_primary(theme),
                _ => theme::text_muted(theme),
            },
            ..Default::default()
        })
        .on_press(on_dismiss);

    let content = row![
        text(toast.style.icon()).size(14).color(accent),
        text(toast.message.clone())
            .size(13)
            .width(Length::Shrink)
            .style(|theme| text::Style {
                color: Some(theme::text_primary(theme)),
            }),
        dismiss,
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .padding(Padding::new(10.0).left(14.0).right(8.0));

    container(content)
        .max_width(560.0)
        .style(move |theme| container::Style {
            background: Some(iced::Background::Color(theme::surface_elevated(theme))),
            border: iced::Border {
                radius: 6.0.into(),
                width: 1.0,
                color: Color { a: 0.6, ..accent },
            },
            shadow: iced::Shadow {
                color: theme::shadow_color(theme),
                offset: iced::Vector::new(0.0, 2.0),
                blur_radius: 8.0,
            },
            ..Default::default()
        })
        .into()
}
