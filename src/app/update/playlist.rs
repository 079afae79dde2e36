// src/app/update/playlist.rs
//! Playlist message handlers

use iced::Task;

use super::events::hide_toast_later;
use crate::app::message::Message;
use crate::app::state::App;
use crate::ui::widgets::ToastStyle;

impl App {
    pub fn handle_playlist(&mut self, message: &Message) -> Option<Task<Message>> {
        match message {
            Message::AddToPlaylist => {
                let Some(engine) = &self.core.engine else {
                    return Some(Task::none());
                };
                // The engine reports failures itself
                if engine.add_to_playlist() {
                    let id = self.view.show_toast("Added to playlist", ToastStyle::Success);
                    return Some(hide_toast_later(id));
                }
                Some(Task::none())
            }

            Message::LoadEntry(id) => {
                if self.view.active_entry.as_deref() == Some(id.as_str()) && self.view.track.is_some()
                {
                    return Some(Task::none());
                }
                tracing::info!("Loading playlist entry {}", id);
                let id = id.clone();
                Some(self.with_engine(move |engine| async move { engine.load_entry(&id).await }))
            }

            _ => None,
        }
    }
}
