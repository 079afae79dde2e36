//! Vertical EQ band slider
//!
//! iced has no vertical slider, so this one is hand-rolled. The handle
//! position is the band's percent mapping (0 % = -12 dB, 100 % = +12 dB)
//! and the fill grows from the 0 dB line towards the handle.

use iced::advanced::layout::{self, Layout};
use iced::advanced::renderer;
use iced::advanced::widget::{self, Widget};
use iced::advanced::{Clipboard, Shell};
use iced::event::Event;
use iced::mouse;
use iced::{Background, Border, Color, Element, Length, Rectangle, Size, Theme};

use crate::eq::{gain_to_percent, percent_to_gain};
use crate::ui::theme;

/// Gains are reported on a 0.1 dB grid
const STEP_DB: f32 = 0.1;

pub struct BandSlider<'a, Message> {
    gain_db: f32,
    on_change: Box<dyn Fn(f32) -> Message + 'a>,
    width: Length,
    height: Length,
    rail_width: f32,
    handle_radius: f32,
}

impl<'a, Message> BandSlider<'a, Message> {
    /// `on_change` receives the new gain in dB
    pub fn new<F>(gain_db: f32, on_change: F) -> Self
    where
        F: Fn(f32) -> Message + 'a,
    {
        Self {
            gain_db,
            on_change: Box::new(on_change),
            width: Length::Fixed(36.0),
            height: Length::Fixed(160.0),
            rail_width: 6.0,
            handle_radius: 8.0,
        }
    }

    pub fn height(mut self, height: impl Into<Length>) -> Self {
        self.height = height.into();
        self
    }

    fn usable_height(&self, bounds: Rectangle) -> f32 {
        (bounds.height - self.handle_radius * 2.0).max(1.0)
    }

    /// Y of a percent value; 100 % sits at the top
    fn y_for_percent(&self, percent: f32, bounds: Rectangle) -> f32 {
        bounds.y + self.handle_radius + (1.0 - percent / 100.0) * self.usable_height(bounds)
    }

    fn gain_from_position(&self, y: f32, bounds: Rectangle) -> f32 {
        let usable = self.usable_height(bounds);
        let relative = (y - bounds.y - self.handle_radius).clamp(0.0, usable);
        let percent = (1.0 - relative / usable) * 100.0;
        let gain = percent_to_gain(percent);
        (gain / STEP_DB).round() * STEP_DB
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct State {
    is_dragging: bool,
}

impl<Message, Renderer> Widget<Message, Theme, Renderer> for BandSlider<'_, Message>
where
    Renderer: renderer::Renderer,
    Message: Clone,
{
    fn tag(&self) -> widget::tree::Tag {
        widget::tree::Tag::of::<State>()
    }

    fn state(&self) -> widget::tree::State {
        widget::tree::State::new(State::default())
    }

    fn size(&self) -> Size<Length> {
        Size::new(self.width, self.height)
    }

    fn layout(
        &mut self,
        _tree: &mut widget::Tree,
        _renderer: &Renderer,
        limits: &layout::Limits,
    ) -> layout::Node {
        let limits = limits.width(self.width).height(self.height);
        layout::Node::new(limits.resolve(self.width, self.height, Size::ZERO))
    }

    fn update(
        &mut self,
        tree: &mut widget::Tree,
        event: &Event,
        layout: Layout<'_>,
        cursor: mouse::Cursor,
        _renderer: &Renderer,
        _clipboard: &mut dyn Clipboard,
        shell: &mut Shell<'_, Message>,
        _viewport: &Rectangle,
    ) {
        let state = tree.state.downcast_mut::<State>();
        let bounds = layout.bounds();

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if cursor.is_over(bounds) {
                    state.is_dragging = true;
                    if let Some(position) = cursor.position() {
                        shell.publish((self.on_change)(self.gain_from_position(position.y, bounds)));
                    }
                    shell.capture_event();
                }
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.is_dragging {
                    state.is_dragging = false;
                    shell.capture_event();
                }
            }
            Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if state.is_dragging {
                    if let Some(position) = cursor.position() {
                        let gain = self.gain_from_position(position.y, bounds);
                        if (gain - self.gain_db).abs() >= STEP_DB / 2.0 {
                            shell.publish((self.on_change)(gain));
                        }
                    }
                    shell.capture_event();
                }
            }
            _ => {}
        }
    }

    fn draw(
        &self,
        tree: &widget::Tree,
        renderer: &mut Renderer,
        theme: &Theme,
        _style: &renderer::Style,
        layout: Layout<'_>,
        cursor: mouse::Cursor,
        _viewport: &Rectangle,
    ) {
        let state = tree.state.downcast_ref::<State>();
        let bounds = layout.bounds();
        let rail_x = bounds.x + (bounds.width - self.rail_width) / 2.0;

        renderer.fill_quad(
            renderer::Quad {
                bounds: Rectangle {
                    x: rail_x,
                    y: bounds.y + self.handle_radius,
                    width: self.rail_width,
                    height: self.usable_height(bounds),
                },
                border: Border::default().rounded(self.rail_width / 2.0),
                ..Default::default()
            },
            Background::Color(theme::divider(theme)),
        );

        let zero_y = self.y_for_percent(50.0, bounds);
        let handle_y = self.y_for_percent(gain_to_percent(self.gain_db), bounds);
        let (fill_top, fill_bottom) = if handle_y < zero_y {
            (handle_y, zero_y)
        } else {
            (zero_y, handle_y)
        };
        if fill_bottom - fill_top > 0.5 {
            renderer.fill_quad(
                renderer::Quad {
                    bounds: Rectangle {
                        x: rail_x,
                        y: fill_top,
                        width: self.rail_width,
                        height: fill_bottom - fill_top,
                    },
                    border: Border::default().rounded(self.rail_width / 2.0),
                    ..Default::default()
                },
                Background::Color(theme::ACCENT),
            );
        }

        let handle_color = if state.is_dragging {
            theme::ACCENT_PINK
        } else if cursor.is_over(bounds) {
            Color::WHITE
        } else {
            theme::text_secondary(theme)
        };
        renderer.fill_quad(
            renderer::Quad {
                bounds: Rectangle {
                    x: bounds.x + (bounds.width - self.handle_radius * 2.0) / 2.0,
                    y: handle_y - self.handle_radius,
                    width: self.handle_radius * 2.0,
                    height: self.handle_radius * 2.0,
                },
                border: Border::default().rounded(self.handle_radius),
                ..Default::default()
            },
            Background::Color(handle_color),
        );
    }

    fn mouse_interaction(
        &self,
        tree: &widget::Tree,
        layout: Layout<'_>,
        cursor: mouse::Cursor,
        _viewport: &Rectangle,
        _renderer: &Renderer,
    ) -> mouse::Interaction {
        let state = tree.state.downcast_ref::<State>();
        if state.is_dragging {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(layout.bounds()) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

impl<'a, Message> From<BandSlider<'a, Message>> for Element<'a, Message, Theme>
where
    Message: Clone + 'a,
{
    fn from(slider: BandSlider<'a, Message>) -> Self {
        Element::new(slider)
    }
}

pub fn band_slider<'a, Message>(
    gain_db: f32,
    on_change: impl Fn(f32) -> Message + 'a,
) -> BandSlider<'a, Message> {
    BandSlider::new(gain_db, on_change)
}
