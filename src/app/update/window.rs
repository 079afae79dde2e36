// src/app/update/window.rs
//! Window message handlers

use iced::Task;

use crate::app::message::Message;
use crate::app::state::App;

impl App {
    pub fn handle_window(&mut self, message: &Message) -> Option<Task<Message>> {
        match message {
            Message::WindowClosed => {
                tracing::info!("Main window closed, exiting");
                if let Some(engine) = self.core.engine.take() {
                    return Some(Task::perform(
                        async move { engine.stop().await },
                        |_| Message::Noop,
                    )
                    .chain(iced::exit()));
                }
                Some(iced::exit())
            }

            _ => None,
        }
    }
}
