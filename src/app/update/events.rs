// src/app/update/events.rs
//! Engine event handlers

use iced::Task;
use std::time::Duration;

use crate::app::message::Message;
use crate::app::state::App;
use crate::engine::EngineEvent;

/// How long a toast stays up
pub const TOAST_DURATION: Duration = Duration::from_secs(4);

impl App {
    /// Fold engine events into the view
    pub fn handle_events(&mut self, message: &Message) -> Option<Task<Message>> {
        match message {
            Message::Engine(event) => {
                tracing::trace!("Engine event: {:?}", event);
                if let EngineEvent::OverlayChanged(on) = event {
                    self.remember_overlay(*on);
                }
                match self.view.apply(event.clone()) {
                    Some(id) => Some(hide_toast_later(id)),
                    None => Some(Task::none()),
                }
            }

            Message::HideToast(id) => {
                self.view.hide_toast(*id);
                Some(Task::none())
            }

            Message::Noop => Some(Task::none()),

            _ => None,
        }
    }

    /// The last overlay choice becomes the default for the next launch
    fn remember_overlay(&mut self, on: bool) {
        let display = &mut self.core.settings.display;
        if display.overlay_by_default == on {
            return;
        }
        display.overlay_by_default = on;
        if let Err(e) = self.core.settings.save() {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }
}

/// Timer that hides toast `id` unless a newer one replaced it
pub fn hide_toast_later(id: u64) -> Task<Message> {
    Task::perform(
        async {
            tokio::time::sleep(TOAST_DURATION).await;
        },
        move |_| Message::HideToast(id),
    )
}
