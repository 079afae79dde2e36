//! Output-bound media element
//!
//! `MediaElement` is the transport surface the playback controller drives.
//! `RodioElement` implements it over a rodio `Sink` fed from an in-memory
//! copy of the downloaded audio, with an analyser tap in the source chain.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};

use super::analyzer::{AnalyzingSource, TapSlot};

/// Identity of a media element, unique per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Playback failures surfaced to the user
#[derive(Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Nothing has been loaded yet
    NoSource,
    /// The bytes could not be decoded
    Decode(String),
    /// The output device could not be opened
    Output(String),
    /// The source refused to seek
    Seek(String),
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::NoSource => write!(f, "No audio loaded"),
            MediaError::Decode(e) => write!(f, "Failed to decode audio: {}", e),
            MediaError::Output(e) => write!(f, "Audio output error: {}", e),
            MediaError::Seek(e) => write!(f, "Seek failed: {}", e),
        }
    }
}

impl std::error::Error for MediaError {}

/// Transport surface of the single audible element
pub trait MediaElement: Send + Sync {
    fn id(&self) -> ElementId;

    /// URL of the currently assigned source
    fn source_url(&self) -> Option<&str>;

    /// Assign a new source whose decoder is already open
    ///
    /// The element is left paused at position zero.
    fn load(&mut self, url: &str, media: PreparedMedia) -> Result<(), MediaError>;

    /// Start or resume; restarts from zero after the end was reached
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// True once the source has played to its end
    fn ended(&self) -> bool;

    fn position(&self) -> Duration;

    fn duration(&self) -> Option<Duration>;

    fn seek(&mut self, position: Duration) -> Result<(), MediaError>;

    /// Slot the element's analyser tap writes into
    fn tap(&self) -> TapSlot;
}

type MediaDecoder = Decoder<Cursor<Arc<[u8]>>>;

/// Downloaded audio with its decoder already opened
pub struct PreparedMedia {
    bytes: Arc<[u8]>,
    decoder: MediaDecoder,
}

impl PreparedMedia {
    /// Open the decoder for `bytes` on the blocking pool
    pub async fn prepare(bytes: Arc<[u8]>) -> Result<Self, MediaError> {
        tokio::task::spawn_blocking(move || Self::open_decoder(bytes))
            .await
            .map_err(|e| MediaError::Decode(format!("Decode task failed: {}", e)))?
    }

    pub(crate) fn open_decoder(bytes: Arc<[u8]>) -> Result<Self, MediaError> {
        let decoder =
            Decoder::new(Cursor::new(bytes.clone())).map_err(|e| MediaError::Decode(e.to_string()))?;
        Ok(Self { bytes, decoder })
    }

    pub fn duration(&self) -> Option<Duration> {
        self.decoder.total_duration()
    }
}

/// Default output stream kept alive on its own thread
///
/// The stream handle is not `Send` on every platform; only its mixer leaves
/// the thread.
pub struct AudioOutput {
    mixer: Mixer,
    shutdown: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioOutput {
    pub fn open_default() -> Result<Self, MediaError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<Mixer, String>>();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(stream.mixer().clone()));
                    // Blocks until the sender is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| MediaError::Output(format!("Failed to spawn output thread: {}", e)))?;

        let mixer = ready_rx
            .recv()
            .map_err(|e| MediaError::Output(e.to_string()))?
            .map_err(MediaError::Output)?;

        tracing::info!("Audio output opened");
        Ok(Self {
            mixer,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// rodio-backed [`MediaElement`]
pub struct RodioElement {
    id: ElementId,
    output: AudioOutput,
    sink: Option<Sink>,
    bytes: Option<Arc<[u8]>>,
    url: Option<String>,
    duration: Option<Duration>,
    tap: TapSlot,
}

impl RodioElement {
    pub fn new(output: AudioOutput) -> Self {
        Self {
            id: ElementId::next(),
            output,
            sink: None,
            bytes: None,
            url: None,
            duration: None,
            tap: Arc::new(Mutex::new(None)),
        }
    }

    /// Fresh paused sink over `decoder`
    fn build_sink(&self, decoder: MediaDecoder) -> Sink {
        let source = AnalyzingSource::new(decoder, self.tap.clone());
        let sink = Sink::connect_new(self.output.mixer());
        sink.pause();
        sink.append(source);
        sink
    }

    /// Rebuild the sink from the loaded bytes, keeping the paused state
    ///
    /// The bytes were validated on load, so this only re-reads headers.
    fn rebuild(&mut self) -> Result<(), MediaError> {
        let bytes = self.bytes.clone().ok_or(MediaError::NoSource)?;
        let media = PreparedMedia::open_decoder(bytes)?;
        let was_paused = self.is_paused();
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let duration = media.duration();
        let sink = self.build_sink(media.decoder);
        if !was_paused {
            sink.play();
        }
        self.sink = Some(sink);
        self.duration = duration.or(self.duration);
        Ok(())
    }
}

impl MediaElement for RodioElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn source_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn load(&mut self, url: &str, media: PreparedMedia) -> Result<(), MediaError> {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.url = None;
        self.bytes = None;
        self.duration = None;

        let duration = media.duration();
        let sink = self.build_sink(media.decoder);
        tracing::debug!("Loaded {} ({:?})", url, duration);
        self.sink = Some(sink);
        self.bytes = Some(media.bytes);
        self.url = Some(url.to_string());
        self.duration = duration;
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.sink.is_none() {
            return Err(MediaError::NoSource);
        }
        if self.ended() {
            self.rebuild()?;
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn is_paused(&self) -> bool {
        self.sink.as_ref().map(|s| s.is_paused()).unwrap_or(true)
    }

    fn ended(&self) -> bool {
        self.sink.as_ref().map(|s| s.empty()).unwrap_or(false)
    }

    fn position(&self) -> Duration {
        match &self.sink {
            Some(_) if self.ended() => self.duration.unwrap_or_default(),
            Some(sink) => sink.get_pos(),
            None => Duration::ZERO,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn seek(&mut self, position: Duration) -> Result<(), MediaError> {
        if self.sink.is_none() {
            return Err(MediaError::NoSource);
        }
        if self.ended() {
            self.rebuild()?;
        }

        let first = match &self.sink {
            Some(sink) => sink.try_seek(position),
            None => return Err(MediaError::NoSource),
        };
        if first.is_ok() {
            return Ok(());
        }

        // Some decoders only seek from a fresh start
        tracing::debug!("Direct seek failed: {:?}, reloading source", first);
        self.rebuild()?;
        match &self.sink {
            Some(sink) => sink
                .try_seek(position)
                .map_err(|e| MediaError::Seek(format!("{:?}", e))),
            None => Err(MediaError::NoSource),
        }
    }

    fn tap(&self) -> TapSlot {
        self.tap.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::tone_wav;

    #[tokio::test]
    async fn test_prepare_reads_duration_off_task() {
        let media = PreparedMedia::prepare(Arc::from(tone_wav(2.0))).await.unwrap();
        let seconds = media.duration().map(|d| d.as_secs_f32()).unwrap_or_default();
        assert!((seconds - 2.0).abs() < 0.01, "duration {}", seconds);
    }

    #[tokio::test]
    async fn test_prepare_rejects_garbage() {
        let result = PreparedMedia::prepare(Arc::from(vec![7u8; 64])).await;
        assert!(matches!(result, Err(MediaError::Decode(_))));
    }
}
