//! Message update handlers - thin dispatcher delegating to submodules

mod equalizer;
mod events;
mod playback;
mod playlist;
mod upload;
mod window;

use std::future::Future;

use iced::Task;

use super::{App, Message};
use crate::api::HttpBackend;
use crate::engine::Engine;

impl App {
    /// Handle messages by delegating to appropriate submodule handlers
    pub fn update(&mut self, message: Message) -> Task<Message> {
        if let Some(task) = self.handle_events(&message) {
            return task;
        }
        if let Some(task) = self.handle_upload(&message) {
            return task;
        }
        if let Some(task) = self.handle_playback(&message) {
            return task;
        }
        if let Some(task) = self.handle_equalizer(&message) {
            return task;
        }
        if let Some(task) = self.handle_playlist(&message) {
            return task;
        }
        if let Some(task) = self.handle_window(&message) {
            return task;
        }

        // Default: no task
        Task::none()
    }

    /// Run an engine operation in the background
    ///
    /// Results come back as engine events, so the task itself maps to
    /// `Noop`. Without an engine nothing runs.
    fn with_engine<F, Fut>(&self, op: F) -> Task<Message>
    where
        F: FnOnce(Engine<HttpBackend>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match &self.core.engine {
            Some(engine) => Task::perform(op(engine.clone()), |_| Message::Noop),
            None => {
                tracing::debug!("Ignoring request: engine unavailable");
                Task::none()
            }
        }
    }
}
