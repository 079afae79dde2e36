//! Engine communication types
//!
//! The engine never touches the UI; everything the dashboard needs to
//! render arrives as an `EngineEvent` on an unbounded channel.
//!
//! ## Architecture
//! ```text
//! UI (Engine handle) --[async calls]--> Engine tasks
//! UI                 <--[EngineEvent]-- Engine tasks (coordinator, samplers)
//! ```

use tokio::sync::mpsc;

use crate::audio::SpectrumFrame;
use crate::eq::EqGains;
use crate::features::PlaylistEntry;
use crate::session::AudioSession;

/// Filter response points for the EQ curve
#[derive(Debug, Clone, PartialEq)]
pub struct EqCurve {
    pub freqs_hz: Vec<f32>,
    pub mag_db: Vec<f32>,
    /// Computed locally because the backend did not answer
    pub local: bool,
}

/// One live spectrum read
#[derive(Clone, PartialEq)]
pub struct LiveSpectrum {
    /// Analyser on the audible element
    pub primary: SpectrumFrame,
    /// Shadow analyser over the original audio, when the overlay is on
    pub overlay: Option<SpectrumFrame>,
    /// Frequency axis end for both frames
    pub nyquist: f32,
    /// Element position in seconds, for the spectrogram playhead
    pub position: f32,
}

impl std::fmt::Debug for LiveSpectrum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSpectrum")
            .field("bins", &self.primary.frequencies.len())
            .field("overlay", &self.overlay.is_some())
            .field("nyquist", &self.nyquist)
            .field("position", &self.position)
            .finish()
    }
}

// ============ Events (Engine -> UI) ============

#[derive(Clone)]
pub enum EngineEvent {
    /// Loading indicator; `None` once nothing is pending
    Busy(Option<String>),
    /// A new track replaced the session
    TrackLoaded(AudioSession),
    /// Analyze or process results landed
    VisualsUpdated(AudioSession),
    GainsChanged(EqGains),
    CurveUpdated(EqCurve),
    /// Transport state changed
    Transport { playing: bool },
    /// Position in seconds
    Position { position: f32, duration: f32 },
    Spectrum(LiveSpectrum),
    /// Live visuals stopped; redraw the cached payloads
    StaticRedraw,
    /// Playback reached the end
    Ended,
    OverlayChanged(bool),
    AutoEqChanged(bool),
    PlaylistChanged {
        entries: Vec<PlaylistEntry>,
        active: Option<String>,
    },
    /// Message for the user
    Notification(String),
}

impl std::fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy(message) => f.debug_tuple("Busy").field(message).finish(),
            Self::TrackLoaded(session) => f
                .debug_tuple("TrackLoaded")
                .field(&session.filename)
                .finish(),
            Self::VisualsUpdated(session) => f
                .debug_tuple("VisualsUpdated")
                .field(&session.filename)
                .finish(),
            Self::GainsChanged(gains) => f.debug_tuple("GainsChanged").field(gains).finish(),
            Self::CurveUpdated(curve) => f
                .debug_struct("CurveUpdated")
                .field("points", &curve.freqs_hz.len())
                .field("local", &curve.local)
                .finish(),
            Self::Transport { playing } => {
                f.debug_struct("Transport").field("playing", playing).finish()
            }
            Self::Position { position, duration } => f
                .debug_struct("Position")
                .field("position", position)
                .field("duration", duration)
                .finish(),
            Self::Spectrum(spectrum) => f.debug_tuple("Spectrum").field(spectrum).finish(),
            Self::StaticRedraw => write!(f, "StaticRedraw"),
            Self::Ended => write!(f, "Ended"),
            Self::OverlayChanged(on) => f.debug_tuple("OverlayChanged").field(on).finish(),
            Self::AutoEqChanged(on) => f.debug_tuple("AutoEqChanged").field(on).finish(),
            Self::PlaylistChanged { entries, active } => f
                .debug_struct("PlaylistChanged")
                .field("entries", &entries.len())
                .field("active", active)
                .finish(),
            Self::Notification(message) => {
                f.debug_tuple("Notification").field(message).finish()
            }
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
