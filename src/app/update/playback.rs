// src/app/update/playback.rs
//! Transport message handlers

use iced::Task;

use crate::app::message::Message;
use crate::app::state::App;
use crate::engine::SeekTarget;

impl App {
    /// Handle play/pause, stop and seeking
    pub fn handle_playback(&mut self, message: &Message) -> Option<Task<Message>> {
        match message {
            Message::TogglePlay => {
                if self.view.track.is_none() {
                    return Some(Task::none());
                }
                Some(self.with_engine(|engine| async move { engine.toggle_play().await }))
            }

            Message::Stop => Some(self.with_engine(|engine| async move { engine.stop().await })),

            Message::SeekPreview(fraction) => {
                self.view.scrub = Some(fraction.clamp(0.0, 1.0));
                Some(Task::none())
            }

            Message::SeekRelease => {
                let Some(fraction) = self.view.scrub.take() else {
                    return Some(Task::none());
                };
                // Keep the playhead where it was dropped until the engine reports
                self.view.position = fraction * self.view.duration;
                Some(self.with_engine(move |engine| async move {
                    engine.seek(SeekTarget::Fraction(fraction)).await
                }))
            }

            _ => None,
        }
    }
}
