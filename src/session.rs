//! Session state
//!
//! Everything the dashboard knows about the loaded track: identity,
//! metadata, current gains and the cached visualization payloads. The
//! engine owns one `SessionState` and resets it on every new upload.

use rand::seq::IndexedRandom;

use crate::api::{AnalyzeResponse, FftData, ProcessResponse, SpectrogramData, UploadResponse, WaveformData};
use crate::eq::EqGains;

/// Labels picked when the backend does not report a mode
pub const MODE_LABELS: [&str; 6] = ["Music", "Vocal", "Podcast", "EDM", "Rock", "Classical"];

/// Mode label shown before any track is loaded
pub const NO_MODE: &str = "None";

/// Tag given to tracks added from the dashboard
pub const DEFAULT_TAG: &str = "Custom";

pub fn random_mode() -> String {
    MODE_LABELS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(MODE_LABELS[0])
        .to_string()
}

/// Cached payloads for one rendition of the track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualSet {
    pub waveform: Option<WaveformData>,
    pub fft: Option<FftData>,
    pub spectrogram: Option<SpectrogramData>,
}

impl VisualSet {
    /// Fill only the slots that are still empty
    fn fill_missing(&mut self, other: VisualSet) {
        if self.waveform.is_none() {
            self.waveform = other.waveform;
        }
        if self.fft.is_none() {
            self.fft = other.fft;
        }
        if self.spectrogram.is_none() {
            self.spectrogram = other.spectrogram;
        }
    }

    /// Replace the slots the new payload carries
    fn overwrite(&mut self, other: VisualSet) {
        if other.waveform.is_some() {
            self.waveform = other.waveform;
        }
        if other.fft.is_some() {
            self.fft = other.fft;
        }
        if other.spectrogram.is_some() {
            self.spectrogram = other.spectrogram;
        }
    }
}

/// The loaded track
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSession {
    /// Server-side file name, the key for every backend call
    pub filename: String,
    pub name: String,
    pub tag: String,
    /// Seconds
    pub duration: f32,
    pub sample_rate: Option<u32>,
    pub mode: String,
    /// Latest EQ-processed payloads
    pub processed: VisualSet,
    /// Unprocessed payloads, captured once per upload
    pub original: VisualSet,
}

impl AudioSession {
    /// Session for a fresh upload; `name` is the local file name
    pub fn from_upload(name: impl Into<String>, reply: UploadResponse) -> Self {
        let mode = reply
            .detected_mode
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(random_mode);
        let waveform = reply.waveform;
        Self {
            filename: reply.filename,
            name: name.into(),
            tag: DEFAULT_TAG.to_string(),
            duration: if reply.duration.is_finite() { reply.duration.max(0.0) } else { 0.0 },
            sample_rate: reply.sample_rate,
            mode,
            processed: VisualSet {
                waveform: waveform.clone(),
                ..VisualSet::default()
            },
            original: VisualSet {
                waveform,
                ..VisualSet::default()
            },
        }
    }

    /// Session for a stored playlist entry; payloads arrive with analyze
    pub fn from_stored(filename: &str, name: &str, tag: &str, mode: Option<&str>) -> Self {
        Self {
            filename: filename.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
            duration: 0.0,
            sample_rate: None,
            mode: mode
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(random_mode),
            processed: VisualSet::default(),
            original: VisualSet::default(),
        }
    }

    /// Store an analyze reply; the first one also becomes the original
    pub fn apply_analysis(&mut self, reply: AnalyzeResponse) {
        let set = VisualSet {
            waveform: None,
            fft: reply.fft,
            spectrogram: reply.spectrogram,
        };
        self.original.fill_missing(set.clone());
        self.processed.overwrite(set);
    }

    /// Store a process reply; the original set is never touched
    pub fn apply_processed(&mut self, reply: ProcessResponse) {
        if let Some(last) = reply.waveform.as_ref().and_then(WaveformData::last_time) {
            self.duration = self.duration.max(last);
        }
        self.processed.overwrite(VisualSet {
            waveform: reply.waveform,
            fft: reply.fft,
            spectrogram: reply.spectrogram,
        });
    }

    /// Media metadata is authoritative once known
    pub fn apply_media_duration(&mut self, seconds: f32) {
        if seconds.is_finite() && seconds > 0.0 {
            self.duration = seconds;
        }
    }
}

/// Engine-wide state behind the session lock
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub track: Option<AudioSession>,
    pub gains: EqGains,
    pub auto_eq: bool,
    /// Playlist entry the track was loaded from, if any
    pub active_entry: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            track: None,
            gains: EqGains::FLAT,
            auto_eq: false,
            active_entry: None,
        }
    }
}

impl SessionState {
    /// Drop the track and flatten gains; user toggles survive
    pub fn reset(&mut self) {
        *self = Self {
            auto_eq: self.auto_eq,
            ..Self::default()
        };
    }

    pub fn filename(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.filename.as_str())
    }

    pub fn mode_label(&self) -> &str {
        self.track.as_ref().map(|t| t.mode.as_str()).unwrap_or(NO_MODE)
    }
}
