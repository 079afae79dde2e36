//! Theme system for the EQ dashboard
//! Dark panels with a blue accent; light mode keeps the same layout

use iced::color;
use iced::widget::{button, container, scrollable};
use iced::{Background, Border, Color, Shadow, Theme};

// ============================================================================
// Color Palette - Dynamic based on theme
// ============================================================================

/// Check if theme is dark mode
fn is_dark(theme: &Theme) -> bool {
    matches!(
        theme,
        Theme::Dark
            | Theme::Dracula
            | Theme::Nord
            | Theme::SolarizedDark
            | Theme::GruvboxDark
            | Theme::CatppuccinMocha
            | Theme::TokyoNight
            | Theme::TokyoNightStorm
            | Theme::KanagawaWave
            | Theme::KanagawaDragon
            | Theme::Moonfly
            | Theme::Nightfly
            | Theme::Oxocarbon
    )
}

// Dark mode colors
mod dark {
    use super::*;
    pub const BACKGROUND: Color = color!(0x0b0d12);
    pub const PANEL: Color = color!(0x141821);
    pub const SURFACE: Color = color!(0x1c2130);
    pub const BORDER: Color = color!(0x2a3142);
    pub const TEXT_MUTED: Color = color!(0x7d8597);
    pub const TEXT_SECONDARY: Color = color!(0xb3b9c6);
    pub const TEXT_PRIMARY: Color = color!(0xffffff);
}

// Light mode colors
mod light {
    use super::*;
    pub const BACKGROUND: Color = color!(0xf4f5f8);
    pub const PANEL: Color = color!(0xffffff);
    pub const SURFACE: Color = color!(0xeceef3);
    pub const BORDER: Color = color!(0xd8dbe3);
    pub const TEXT_MUTED: Color = color!(0x6b7280);
    pub const TEXT_SECONDARY: Color = color!(0x4b5160);
    pub const TEXT_PRIMARY: Color = color!(0x14161c);
}

/// Accent for active controls (#4a90ff, the spectrum gradient start)
pub const ACCENT: Color = color!(0x4a90ff);

/// Accent hover
pub const ACCENT_HOVER: Color = color!(0x7f5cff);

/// Band handle while dragging (#ff4a88, the playhead color)
pub const ACCENT_PINK: Color = color!(0xff4a88);

/// Charts are drawn for a dark background
pub const CHART_BG: Color = color!(0x0f1219);

pub fn background(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::BACKGROUND
    } else {
        light::BACKGROUND
    }
}

pub fn panel_bg(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::PANEL
    } else {
        light::PANEL
    }
}

pub fn surface(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::SURFACE
    } else {
        light::SURFACE
    }
}

pub fn border_color(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::BORDER
    } else {
        light::BORDER
    }
}

pub fn text_muted(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::TEXT_MUTED
    } else {
        light::TEXT_MUTED
    }
}

pub fn text_secondary(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::TEXT_SECONDARY
    } else {
        light::TEXT_SECONDARY
    }
}

pub fn text_primary(theme: &Theme) -> Color {
    if is_dark(theme) {
        dark::TEXT_PRIMARY
    } else {
        light::TEXT_PRIMARY
    }
}

/// Surface elevated color (toasts)
pub fn surface_elevated(theme: &Theme) -> Color {
    if is_dark(theme) {
        Color::from_rgb(0.12, 0.13, 0.17)
    } else {
        Color::from_rgb(0.96, 0.96, 0.98)
    }
}

pub fn danger(theme: &Theme) -> Color {
    if is_dark(theme) {
        Color::from_rgb(0.9, 0.3, 0.3)
    } else {
        Color::from_rgb(0.8, 0.2, 0.2)
    }
}

pub fn success(_theme: &Theme) -> Color {
    Color::from_rgb(0.3, 0.8, 0.5)
}

pub fn info(_theme: &Theme) -> Color {
    Color::from_rgb(0.4, 0.7, 0.95)
}

/// Divider/separator color
pub fn divider(theme: &Theme) -> Color {
    if is_dark(theme) {
        Color::from_rgba(1.0, 1.0, 1.0, 0.1)
    } else {
        Color::from_rgba(0.0, 0.0, 0.0, 0.1)
    }
}

pub fn shadow_color(theme: &Theme) -> Color {
    if is_dark(theme) {
        Color::from_rgba(0.0, 0.0, 0.0, 0.5)
    } else {
        Color::from_rgba(0.0, 0.0, 0.0, 0.15)
    }
}

// ============================================================================
// Container Styles
// ============================================================================

pub fn main_content(theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(background(theme))),
        ..Default::default()
    }
}

/// Dashboard panel (EQ, playlist, transport)
pub fn panel(theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(panel_bg(theme))),
        border: Border {
            radius: 10.0.into(),
            width: 1.0,
            color: border_color(theme),
        },
        ..Default::default()
    }
}

/// Chart card; always dark so the chart palette reads the same
pub fn chart_card(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(CHART_BG)),
        border: Border {
            radius: 10.0.into(),
            width: 1.0,
            color: dark::BORDER,
        },
        ..Default::default()
    }
}

// ============================================================================
// Button Styles
// ============================================================================

/// Primary button style
pub fn primary_button(_theme: &Theme, status: button::Status) -> button::Style {
    let base = button::Style {
        background: Some(Background::Color(ACCENT)),
        text_color: Color::WHITE,
        border: Border {
            radius: 18.0.into(),
            ..Default::default()
        },
        ..Default::default()
    };

    match status {
        button::Status::Hovered => button::Style {
            background: Some(Background::Color(ACCENT_HOVER)),
            ..base
        },
        button::Status::Disabled => button::Style {
            background: Some(Background::Color(Color { a: 0.4, ..ACCENT })),
            ..base
        },
        _ => base,
    }
}

/// Secondary button - transparent with border
pub fn secondary_button(theme: &Theme, status: button::Status) -> button::Style {
    let base = button::Style {
        background: Some(Background::Color(Color::TRANSPARENT)),
        text_color: text_primary(theme),
        border: Border {
            radius: 18.0.into(),
            width: 1.0,
            color: border_color(theme),
        },
        ..Default::default()
    };

    match status {
        button::Status::Hovered => button::Style {
            background: Some(Background::Color(surface(theme))),
            border: Border {
                color: text_muted(theme),
                ..base.border
            },
            ..base
        },
        _ => base,
    }
}

/// Playlist row; `active` marks the loaded entry
pub fn list_item(active: bool) -> impl Fn(&Theme, button::Status) -> button::Style {
    move |theme, status| {
        let background = if active {
            Color { a: 0.25, ..ACCENT }
        } else if matches!(status, button::Status::Hovered) {
            surface(theme)
        } else {
            Color::TRANSPARENT
        };
        button::Style {
            background: Some(Background::Color(background)),
            text_color: if active { text_primary(theme) } else { text_secondary(theme) },
            border: Border {
                radius: 6.0.into(),
                ..Default::default()
            },
            shadow: Shadow::default(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Scrollable Styles
// ============================================================================

pub fn dark_scrollable(theme: &Theme, _status: scrollable::Status) -> scrollable::Style {
    let scrollbar = scrollable::Rail {
        background: Some(Background::Color(Color::TRANSPARENT)),
        border: Border::default(),
        scroller: scrollable::Scroller {
            background: Background::Color(border_color(theme)),
            border: Border {
                radius: 4.0.into(),
                ..Default::default()
            },
        },
    };

    scrollable::Style {
        container: container::Style::default(),
        vertical_rail: scrollbar.clone(),
        horizontal_rail: scrollbar,
        gap: None,
        auto_scroll: scrollable::AutoScroll {
            background: Background::Color(surface(theme)),
            border: Border::default(),
            shadow: Shadow::default(),
            icon: text_muted(theme),
        },
    }
}
