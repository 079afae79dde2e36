// src/app/update/equalizer.rs
//! EQ band and toggle handlers

use iced::Task;

use crate::app::message::Message;
use crate::app::state::App;
use crate::eq::EqGains;

impl App {
    pub fn handle_equalizer(&mut self, message: &Message) -> Option<Task<Message>> {
        match message {
            Message::BandChanged(band, gain_db) => {
                let (band, gain_db) = (*band, *gain_db);
                // Move the slider now; the engine echoes the clamped value
                self.view.gains = self.view.gains.with_band(band, gain_db);
                Some(self.with_engine(move |engine| async move {
                    engine.set_band_gain(band, gain_db).await
                }))
            }

            Message::ResetEq => {
                self.view.gains = EqGains::FLAT;
                Some(self.with_engine(|engine| async move {
                    engine.set_gains(EqGains::FLAT).await
                }))
            }

            Message::ToggleOverlay => {
                Some(self.with_engine(|engine| async move { engine.toggle_overlay().await }))
            }

            Message::ToggleAutoEq => {
                Some(self.with_engine(|engine| async move { engine.toggle_auto_eq().await }))
            }

            _ => None,
        }
    }
}
