//! Real-time audio spectrum analyser
//!
//! Mirrors a browser analyser node:
//! - 2048-point FFT, bins linear from 0 Hz to nyquist
//! - Per-bin magnitude smoothing between reads (time constant 0.8)
//! - Byte-quantized dB, re-expanded onto a -120..+20 dB display range

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rodio::Source;
use spectrum_analyzer::scaling::divide_by_N;
use spectrum_analyzer::windows::hann_window;
use spectrum_analyzer::{FrequencyLimit, samples_fft_to_spectrum};

/// FFT size used by both the playback and the shadow analyser
pub const FFT_SIZE: usize = 2048;

/// Default smoothing time constant
pub const SMOOTHING: f32 = 0.8;

/// Quantization window (dB) before re-expanding to the display range
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Display range every frame value falls into
pub const DISPLAY_MIN_DB: f32 = -120.0;
pub const DISPLAY_MAX_DB: f32 = 20.0;

/// Frames buffered by [`AnalyzingSource`] before taking the analyser lock
const CHUNK_FRAMES: usize = 256;

/// One analyser read: linear bins with display dB values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumFrame {
    pub frequencies: Vec<f32>,
    pub magnitude_db: Vec<f32>,
}

/// Analyser settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    pub smoothing: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: FFT_SIZE,
            smoothing: SMOOTHING,
        }
    }
}

/// Shared analyser state, cheap to clone
#[derive(Clone)]
pub struct Analyser {
    inner: Arc<Mutex<AnalyserInner>>,
}

struct AnalyserInner {
    fft_size: usize,
    smoothing: f32,
    /// Most recent mono samples, oldest first, always `fft_size` long
    window: VecDeque<f32>,
    /// Smoothed linear magnitudes, `fft_size / 2` bins
    smoothed: Vec<f32>,
    sample_rate: u32,
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Analyser")
            .field("fft_size", &inner.fft_size)
            .field("smoothing", &inner.smoothing)
            .field("sample_rate", &inner.sample_rate)
            .finish()
    }
}

impl Analyser {
    pub fn new(config: AnalyserConfig) -> Self {
        // The FFT needs a power of two
        let fft_size = config.fft_size.max(32).next_power_of_two();
        Self {
            inner: Arc::new(Mutex::new(AnalyserInner {
                fft_size,
                smoothing: config.smoothing.clamp(0.0, 0.99),
                window: VecDeque::from(vec![0.0; fft_size]),
                smoothed: vec![0.0; fft_size / 2],
                sample_rate: 44100,
            })),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().sample_rate
    }

    /// Feed interleaved samples; channels are averaged to mono
    pub fn push_interleaved(&self, samples: &[f32], channels: u16, sample_rate: u32) {
        let channels = usize::from(channels.max(1));
        let mut inner = self.inner.lock();
        inner.sample_rate = sample_rate;
        for frame in samples.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            inner.push(mono);
        }
    }

    /// Replace the analysis window with the samples ending at the read position
    ///
    /// Shorter input is zero-padded at the front.
    pub fn load_window(&self, samples: &[f32], sample_rate: u32) {
        let mut inner = self.inner.lock();
        inner.sample_rate = sample_rate;
        let fft_size = inner.fft_size;
        let tail = &samples[samples.len().saturating_sub(fft_size)..];
        inner.window.clear();
        inner
            .window
            .extend(std::iter::repeat_n(0.0, fft_size - tail.len()));
        inner.window.extend(tail.iter().copied());
    }

    /// Run the FFT over the current window and return a display frame
    pub fn frame(&self) -> SpectrumFrame {
        let mut inner = self.inner.lock();
        inner.analyze();

        let bins = inner.smoothed.len();
        let bin_hz = inner.sample_rate as f32 / inner.fft_size as f32;
        SpectrumFrame {
            frequencies: (0..bins).map(|i| i as f32 * bin_hz).collect(),
            magnitude_db: inner
                .smoothed
                .iter()
                .map(|&mag| to_display_db(20.0 * mag.log10()))
                .collect(),
        }
    }

    /// Forget buffered audio and smoothing history (after a seek)
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.window.iter_mut().for_each(|s| *s = 0.0);
        inner.smoothed.fill(0.0);
    }
}

impl AnalyserInner {
    fn push(&mut self, sample: f32) {
        if self.window.len() >= self.fft_size {
            self.window.pop_front();
        }
        self.window.push_back(if sample.is_finite() { sample } else { 0.0 });
    }

    fn analyze(&mut self) {
        let samples: Vec<f32> = self.window.iter().copied().collect();
        let windowed = hann_window(&samples);

        match samples_fft_to_spectrum(
            &windowed,
            self.sample_rate,
            FrequencyLimit::All,
            Some(&divide_by_N),
        ) {
            Ok(spectrum) => {
                let smoothing = self.smoothing;
                for (slot, (_, mag)) in self.smoothed.iter_mut().zip(spectrum.data().iter()) {
                    *slot = smoothing * *slot + (1.0 - smoothing) * mag.val();
                }
            }
            Err(e) => {
                tracing::debug!("Spectrum analysis skipped: {:?}", e);
            }
        }
    }
}

/// Quantize like a byte frequency read, then spread over the display range
pub fn to_display_db(db: f32) -> f32 {
    let normalized = if db.is_nan() {
        0.0
    } else {
        ((db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS)).clamp(0.0, 1.0)
    };
    let byte = (normalized * 255.0).floor();
    DISPLAY_MIN_DB + byte / 255.0 * (DISPLAY_MAX_DB - DISPLAY_MIN_DB)
}

/// Slot an element's tap writes into; `None` while the graph is disconnected
pub type TapSlot = Arc<Mutex<Option<Analyser>>>;

/// Source wrapper feeding every sample to the connected analyser
pub struct AnalyzingSource<S>
where
    S: Source<Item = f32>,
{
    source: S,
    tap: TapSlot,
    pending: Vec<f32>,
}

impl<S> AnalyzingSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, tap: TapSlot) -> Self {
        let capacity = CHUNK_FRAMES * usize::from(source.channels().max(1));
        Self {
            source,
            tap,
            pending: Vec::with_capacity(capacity),
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Some(analyser) = self.tap.lock().as_ref() {
            analyser.push_interleaved(
                &self.pending,
                self.source.channels(),
                self.source.sample_rate(),
            );
        }
        self.pending.clear();
    }
}

impl<S> Iterator for AnalyzingSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(sample) = self.source.next() else {
            self.flush();
            return None;
        };
        self.pending.push(sample);
        if self.pending.len() >= CHUNK_FRAMES * usize::from(self.source.channels().max(1)) {
            self.flush();
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

impl<S> Source for AnalyzingSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.source.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.source.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        self.source.total_duration()
    }

    fn try_seek(&mut self, pos: std::time::Duration) -> Result<(), rodio::source::SeekError> {
        // Samples from before the seek must not leak into the next frame
        self.pending.clear();
        if let Some(analyser) = self.tap.lock().as_ref() {
            analyser.reset();
        }
        self.source.try_seek(pos)
    }
}
