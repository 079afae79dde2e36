//! Main application module

mod message;
mod state;
mod update;
mod view;

use std::sync::Arc;

use iced::{Task, Theme};

use crate::api::HttpBackend;
use crate::audio::{AudioOutput, RodioElement};
use crate::engine::{Engine, EngineConfig, EventReceiver};
use crate::features::{PlaylistStore, Settings};
use crate::ui::widgets::ToastStyle;
pub use message::Message;
pub use state::App;
use state::{CoreState, ViewState};

impl App {
    /// Create new application instance
    pub fn new() -> (Self, Task<Message>) {
        // 1. Load settings first; engine timings come from them
        let settings = Settings::load();

        // 2. Start the engine
        let mut view = ViewState::default();
        let (engine, events) = match start_engine(&settings) {
            Ok((engine, events)) => (Some(engine), Some(Arc::new(tokio::sync::Mutex::new(events)))),
            Err(e) => {
                tracing::error!("Failed to start audio engine: {:#}", e);
                view.show_toast(format!("Audio engine unavailable: {}", e), ToastStyle::Error);
                (None, None)
            }
        };

        let app = Self {
            core: CoreState { engine, settings },
            view,
        };

        // 3. Open main window
        let (window_id, open_window) = iced::window::open(iced::window::Settings {
            size: iced::Size::new(1400.0, 900.0),
            min_size: Some(iced::Size::new(960.0, 640.0)),
            #[cfg(target_os = "linux")]
            platform_specific: iced::window::settings::PlatformSpecific {
                application_id: "eqscope".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        tracing::info!("Opening main window with id: {:?}", window_id);

        // 4. Forward engine events into the update loop
        let event_task = match events {
            Some(rx) => Task::run(
                async_stream::stream! {
                    loop {
                        let event = rx.lock().await.recv().await;
                        if let Some(event) = event {
                            yield event;
                        } else {
                            break;
                        }
                    }
                },
                Message::Engine,
            ),
            None => Task::none(),
        };

        (app, Task::batch([open_window.discard(), event_task]))
    }

    pub fn theme(&self, _window_id: iced::window::Id) -> Theme {
        Theme::Dark
    }

    /// Window title with the loaded track
    pub fn title(&self, _window_id: iced::window::Id) -> String {
        match &self.view.track {
            Some(track) => format!("EQ Scope - {}", track.name),
            None => "EQ Scope".to_string(),
        }
    }

    pub fn subscription(&self) -> iced::Subscription<Message> {
        iced::window::close_events().map(|_id| Message::WindowClosed)
    }
}

/// Backend client, audio output and stored playlist wired into an engine
fn start_engine(settings: &Settings) -> anyhow::Result<(Engine<HttpBackend>, EventReceiver)> {
    let backend = HttpBackend::new(&settings.backend.base_url, settings.backend.timeout())?;
    let output = AudioOutput::open_default()?;
    let element = Box::new(RodioElement::new(output));
    let playlist = PlaylistStore::open(PlaylistStore::default_path());
    tracing::info!(
        "Engine ready: backend {}, {} playlist entries",
        settings.backend.base_url,
        playlist.entries().len()
    );
    Ok(Engine::new(
        backend,
        element,
        playlist,
        EngineConfig::from(settings),
    ))
}
