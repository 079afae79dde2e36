//! EQ Scope - a desktop equalizer dashboard
//! Upload a track, shape it with a 9-band EQ and compare processed and
//! original spectra while it plays.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod api;
mod app;
mod audio;
mod engine;
mod eq;
mod features;
mod render;
mod session;
mod ui;
mod utils;

fn main() -> iced::Result {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    // Daemon: the window is opened by `App::new`, closing it exits
    iced::daemon(app::App::new, app::App::update, app::App::view)
        .title(app::App::title)
        .theme(app::App::theme)
        .subscription(app::App::subscription)
        .antialiasing(true)
        .run()
}
