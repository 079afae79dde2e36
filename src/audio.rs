//! Audio playback and analysis module
//!
//! - `MediaElement` / `RodioElement`: the single audible element
//! - `PlaybackGraph`: analyser tap bound to one element and source
//! - `ShadowGraph`: silent analyser over the decoded original audio
//! - `Analyser`: FFT frames for the live spectrum display

pub mod analyzer;
pub mod element;
pub mod graph;
pub mod shadow;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::{Analyser, AnalyserConfig, SpectrumFrame};
pub use element::{AudioOutput, MediaElement, MediaError, PreparedMedia, RodioElement};
pub use graph::{GraphError, PlaybackGraph};
pub use shadow::{DecodedAudio, ShadowGraph};
