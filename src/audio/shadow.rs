//! Shadow analysis graph
//!
//! Holds the decoded original audio and an analyser that is never routed to
//! the output. While started it reads the window at `offset + elapsed`,
//! following the audible element's clock without producing sound.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, Source};
use tokio::time::Instant;

use super::analyzer::{Analyser, AnalyserConfig, SpectrumFrame};
use super::element::MediaError;

/// Decoded mono PCM
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate.max(1)))
    }
}

/// Decode a whole file into mono samples (blocking)
pub fn decode_mono(bytes: Arc<[u8]>) -> Result<DecodedAudio, MediaError> {
    let decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| MediaError::Decode(e.to_string()))?;
    let channels = usize::from(decoder.channels().max(1));
    let sample_rate = decoder.sample_rate();
    let interleaved: Vec<f32> = decoder.collect();

    let samples: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(DecodedAudio {
        samples: samples.into(),
        sample_rate,
    })
}

/// Decode on the blocking pool
pub async fn decode_mono_async(bytes: Arc<[u8]>) -> Result<DecodedAudio, MediaError> {
    tokio::task::spawn_blocking(move || decode_mono(bytes))
        .await
        .map_err(|e| MediaError::Decode(format!("Decode task failed: {}", e)))?
}

pub struct ShadowGraph {
    audio: DecodedAudio,
    analyser: Analyser,
    /// (start instant, offset) while running
    running: Option<(Instant, Duration)>,
}

impl ShadowGraph {
    pub fn new(audio: DecodedAudio, config: AnalyserConfig) -> Self {
        Self {
            audio,
            analyser: Analyser::new(config),
            running: None,
        }
    }

    /// (Re)start reading at `offset`
    pub fn start(&mut self, offset: Duration) {
        self.analyser.reset();
        self.running = Some((Instant::now(), offset));
    }

    pub fn stop(&mut self) {
        self.running = None;
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Offset the shadow was last started at
    #[cfg(test)]
    pub fn start_offset(&self) -> Option<Duration> {
        self.running.map(|(_, offset)| offset)
    }

    /// Current read position, `None` when stopped
    pub fn read_position(&self) -> Option<Duration> {
        self.running
            .map(|(started, offset)| offset + started.elapsed())
    }

    /// Analyser frame at the current read position; `None` when stopped
    ///
    /// Past the end of the buffer the window is silence.
    pub fn sample(&self) -> Option<SpectrumFrame> {
        let position = self.read_position()?;
        let index = (position.as_secs_f64() * f64::from(self.audio.sample_rate)) as usize;
        let samples = &self.audio.samples;
        let window: &[f32] = if index > samples.len() {
            &[]
        } else {
            &samples[..index]
        };
        self.analyser.load_window(window, self.audio.sample_rate);
        Some(self.analyser.frame())
    }
}
