//! Application state definitions

use iced::widget::canvas;

use crate::api::HttpBackend;
use crate::audio::SpectrumFrame;
use crate::engine::{Engine, EngineEvent, EqCurve, LiveSpectrum};
use crate::eq::EqGains;
use crate::features::{PlaylistEntry, Settings};
use crate::session::{AudioSession, NO_MODE};
use crate::ui::widgets::{Toast, ToastStyle};

/// Main application state
pub struct App {
    /// Engine services and settings
    pub core: CoreState,
    /// What the dashboard shows, folded from engine events
    pub view: ViewState,
}

pub struct CoreState {
    /// `None` when the backend client or audio output failed at startup
    pub engine: Option<Engine<HttpBackend>>,
    pub settings: Settings,
}

/// Dashboard view model
#[derive(Default)]
pub struct ViewState {
    pub track: Option<AudioSession>,
    pub gains: EqGains,
    pub curve: Option<EqCurve>,
    /// Latest live spectrum; cleared when playback stops
    pub live: Option<LiveSpectrum>,
    pub playing: bool,
    /// Seconds
    pub position: f32,
    pub duration: f32,
    /// Seek bar fraction while dragging
    pub scrub: Option<f32>,
    pub overlay: bool,
    pub auto_eq: bool,
    pub busy: Option<String>,
    pub playlist: Vec<PlaylistEntry>,
    pub active_entry: Option<String>,
    pub toast: Option<Toast>,
    toast_seq: u64,
    /// Spectrogram cells; cleared whenever the matrix changes
    pub spectrogram_cache: canvas::Cache,
}

impl ViewState {
    /// Fold one engine event into the view
    ///
    /// Returns the id of a newly shown toast so the caller can schedule
    /// its hide timer.
    pub fn apply(&mut self, event: EngineEvent) -> Option<u64> {
        match event {
            EngineEvent::Busy(message) => self.busy = message,
            EngineEvent::TrackLoaded(track) => {
                self.duration = track.duration;
                self.position = 0.0;
                self.scrub = None;
                self.live = None;
                self.set_track(track);
            }
            EngineEvent::VisualsUpdated(track) => {
                if track.duration > 0.0 {
                    self.duration = self.duration.max(track.duration);
                }
                self.set_track(track);
            }
            EngineEvent::GainsChanged(gains) => self.gains = gains,
            EngineEvent::CurveUpdated(curve) => self.curve = Some(curve),
            EngineEvent::Transport { playing } => {
                self.playing = playing;
                if !playing {
                    self.live = None;
                }
            }
            EngineEvent::Position { position, duration } => {
                self.position = position;
                if duration > 0.0 {
                    self.duration = duration;
                }
            }
            EngineEvent::Spectrum(spectrum) => {
                if self.playing {
                    self.position = spectrum.position;
                    self.live = Some(spectrum);
                }
            }
            EngineEvent::StaticRedraw => self.live = None,
            EngineEvent::Ended => {
                self.playing = false;
                self.position = 0.0;
                self.live = None;
            }
            EngineEvent::OverlayChanged(on) => self.overlay = on,
            EngineEvent::AutoEqChanged(on) => self.auto_eq = on,
            EngineEvent::PlaylistChanged { entries, active } => {
                self.playlist = entries;
                self.active_entry = active;
            }
            EngineEvent::Notification(message) => {
                return Some(self.show_toast(message, ToastStyle::Error));
            }
        }
        None
    }

    pub fn show_toast(&mut self, message: impl Into<String>, style: ToastStyle) -> u64 {
        self.toast_seq += 1;
        self.toast = Some(Toast::new(self.toast_seq, message, style));
        self.toast_seq
    }

    pub fn hide_toast(&mut self, id: u64) {
        if self.toast.as_ref().is_some_and(|t| t.id == id) {
            self.toast = None;
        }
    }

    fn set_track(&mut self, track: AudioSession) {
        let old = self.track.as_ref().map(|t| &t.processed.spectrogram);
        if old != Some(&track.processed.spectrogram) {
            self.spectrogram_cache.clear();
        }
        self.track = Some(track);
    }

    pub fn mode_label(&self) -> &str {
        self.track.as_ref().map(|t| t.mode.as_str()).unwrap_or(NO_MODE)
    }

    /// Playhead as a fraction of the track
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Original-audio frame for the live FFT, when the overlay is on
    pub fn live_overlay(&self) -> Option<&SpectrumFrame> {
        if !self.overlay {
            return None;
        }
        self.live.as_ref()?.overlay.as_ref()
    }
}
