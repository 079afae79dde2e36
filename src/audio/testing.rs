//! Test doubles for the audio layer

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::analyzer::TapSlot;
use super::element::{ElementId, MediaElement, MediaError, PreparedMedia};

/// Encode mono 16-bit PCM samples as a WAV file
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// A 440 Hz tone at 8 kHz
pub fn tone_wav(seconds: f32) -> Vec<u8> {
    let sample_rate = 8000;
    let len = (seconds * sample_rate as f32) as usize;
    let samples: Vec<f32> = (0..len)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    wav_bytes(&samples, sample_rate)
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub url: Option<String>,
    pub loads: Vec<String>,
    pub duration: Duration,
    /// Position accumulated before the current play stretch
    pub base: Duration,
    pub playing_since: Option<Instant>,
    pub fail_play: bool,
    pub fail_load: bool,
    pub seeks: Vec<Duration>,
}

impl FakeState {
    fn position(&self) -> Duration {
        let pos = match self.playing_since {
            Some(since) => self.base + since.elapsed(),
            None => self.base,
        };
        pos.min(self.duration)
    }
}

/// Clock-driven fake element; clones share state and tap
///
/// `url` is per-clone so the boxed element can hand out `&str`; inspect
/// loads through `state`.
#[derive(Clone)]
pub struct FakeElement {
    id: ElementId,
    url: Option<String>,
    pub state: Arc<Mutex<FakeState>>,
    tap: TapSlot,
}

impl FakeElement {
    pub fn new(duration: Duration) -> Self {
        Self {
            id: ElementId::next(),
            url: None,
            state: Arc::new(Mutex::new(FakeState {
                duration,
                ..FakeState::default()
            })),
            tap: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_tapped(&self) -> bool {
        self.tap.lock().is_some()
    }
}

impl MediaElement for FakeElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn source_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn load(&mut self, url: &str, _media: PreparedMedia) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if state.fail_load {
            return Err(MediaError::Decode("scripted failure".to_string()));
        }
        state.url = Some(url.to_string());
        state.loads.push(url.to_string());
        state.base = Duration::ZERO;
        state.playing_since = None;
        drop(state);
        self.url = Some(url.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if state.fail_play {
            return Err(MediaError::Output("scripted failure".to_string()));
        }
        if state.url.is_none() {
            return Err(MediaError::NoSource);
        }
        if state.position() >= state.duration {
            state.base = Duration::ZERO;
            state.playing_since = None;
        }
        if state.playing_since.is_none() {
            state.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.base = state.position();
        state.playing_since = None;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().playing_since.is_none()
    }

    fn ended(&self) -> bool {
        let state = self.state.lock();
        state.url.is_some() && state.position() >= state.duration
    }

    fn position(&self) -> Duration {
        self.state.lock().position()
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.state.lock().duration)
    }

    fn seek(&mut self, position: Duration) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        state.seeks.push(position);
        state.base = position.min(state.duration);
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn tap(&self) -> TapSlot {
        self.tap.clone()
    }
}
