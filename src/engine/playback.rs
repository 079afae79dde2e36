//! Playback controller
//!
//! Owns the single output-bound media element, the playback graph bound to
//! it and the optional shadow graph over the original audio. All transport
//! goes through here so the shadow can follow the element's clock.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::api::{Backend, PlayRequest};
use crate::audio::shadow::decode_mono_async;
use crate::audio::{
    Analyser, AnalyserConfig, DecodedAudio, MediaElement, MediaError, PlaybackGraph,
    PreparedMedia, ShadowGraph, SpectrumFrame,
};
use crate::eq::EqGains;

/// Result of [`PlaybackController::load_audio`]
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub url: String,
    /// The element already held this source
    pub reused: bool,
}

pub struct PlaybackController {
    element: Box<dyn MediaElement>,
    graph: PlaybackGraph,
    shadow: Option<ShadowGraph>,
    analyser_config: AnalyserConfig,
    overlay: bool,
    playing: bool,
    /// The element's source belongs to the current track
    source_ready: bool,
    /// Seek requested before any source was assigned
    pending_seek: Option<Duration>,
}

impl PlaybackController {
    pub fn new(element: Box<dyn MediaElement>, analyser_config: AnalyserConfig, overlay: bool) -> Self {
        Self {
            element,
            graph: PlaybackGraph::new(analyser_config),
            shadow: None,
            analyser_config,
            overlay,
            playing: false,
            source_ready: false,
            pending_seek: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn overlay_enabled(&self) -> bool {
        self.overlay
    }

    pub fn has_source(&self) -> bool {
        self.source_ready && self.element.source_url().is_some()
    }

    pub fn has_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    #[cfg(test)]
    pub fn shadow_running(&self) -> bool {
        self.shadow.as_ref().is_some_and(ShadowGraph::is_running)
    }

    /// Offset the shadow was last started at
    #[cfg(test)]
    pub fn shadow_offset(&self) -> Option<Duration> {
        self.shadow.as_ref().and_then(ShadowGraph::start_offset)
    }

    pub fn ended(&self) -> bool {
        self.has_source() && self.element.ended()
    }

    pub fn position(&self) -> Duration {
        if self.has_source() {
            self.element.position()
        } else {
            self.pending_seek.unwrap_or_default()
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.has_source().then(|| self.element.duration()).flatten()
    }

    pub fn analyser(&self) -> &Analyser {
        self.graph.analyser()
    }

    /// Make the element play the rendition for `gains`
    ///
    /// A new URL replaces the source (pausing first) and keeps the playhead;
    /// the same URL reuses the element. `None` when the backend or the media
    /// fails; the failure is logged.
    pub async fn load_audio<B: Backend>(
        &mut self,
        backend: &B,
        filename: &str,
        gains: &EqGains,
    ) -> Option<Loaded> {
        let url = match backend.play_url(filename, PlayRequest::Gains(*gains)).await {
            Ok(url) => url,
            Err(e) => {
                error!("Error loading audio: {}", e);
                return None;
            }
        };

        if self.has_source() && self.element.source_url() == Some(url.as_str()) {
            if !self.graph.is_bound_to(self.element.as_ref()) {
                self.graph.disconnect();
                if let Err(e) = self.graph.connect(self.element.as_ref()) {
                    warn!("Failed to connect playback graph: {}", e);
                }
            }
            return Some(Loaded { url, reused: true });
        }

        let keep_at = if self.ended() { Duration::ZERO } else { self.position() };
        self.pause();
        self.graph.disconnect();

        let bytes = match backend.fetch_audio(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Error downloading audio {}: {}", url, e);
                return None;
            }
        };
        let media = match PreparedMedia::prepare(Arc::from(bytes)).await {
            Ok(media) => media,
            Err(e) => {
                error!("Error decoding audio {}: {}", url, e);
                self.source_ready = false;
                return None;
            }
        };
        if let Err(e) = self.element.load(&url, media) {
            error!("Error loading audio {}: {}", url, e);
            self.source_ready = false;
            return None;
        }
        self.source_ready = true;
        self.pending_seek = None;

        if let Err(e) = self.graph.connect(self.element.as_ref()) {
            warn!("Failed to connect playback graph: {}", e);
        }
        if !keep_at.is_zero() {
            if let Err(e) = self.element.seek(keep_at) {
                warn!("Failed to restore position {:?}: {}", keep_at, e);
            }
        }

        debug!(
            "Audio loaded: {} (duration {:?})",
            url,
            self.element.duration()
        );
        Some(Loaded { url, reused: false })
    }

    /// Start the element; the shadow follows when the overlay is on
    ///
    /// On failure transport is left not-playing.
    pub fn play(&mut self) -> Result<(), MediaError> {
        if !self.has_source() {
            return Err(MediaError::NoSource);
        }
        if let Err(e) = self.element.play() {
            self.playing = false;
            self.stop_shadow();
            return Err(e);
        }
        self.playing = true;
        self.start_shadow();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.has_source() {
            self.element.pause();
        }
        self.playing = false;
        self.stop_shadow();
    }

    /// Pause and rewind to zero
    pub fn stop(&mut self) {
        self.pause();
        self.pending_seek = None;
        if self.has_source() {
            if let Err(e) = self.element.seek(Duration::ZERO) {
                warn!("Failed to rewind: {}", e);
            }
        }
    }

    /// Move the playhead; never changes the transport state
    pub fn seek(&mut self, position: Duration) -> Result<(), MediaError> {
        if !self.has_source() {
            self.pending_seek = Some(position);
            return Ok(());
        }
        let position = match self.element.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.element.seek(position)?;
        if self.playing && self.overlay {
            if let Some(shadow) = &mut self.shadow {
                shadow.start(position);
            }
        }
        Ok(())
    }

    /// Playback ran off the end
    pub fn mark_ended(&mut self) {
        self.playing = false;
        self.stop_shadow();
    }

    /// Detach everything from the previous track
    pub fn reset_track(&mut self) {
        self.pause();
        self.graph.disconnect();
        self.shadow = None;
        self.source_ready = false;
        self.pending_seek = None;
    }

    /// Toggle the original-audio overlay
    ///
    /// Off releases the shadow graph at once. On rebuilds it from
    /// `filename` (when a track is loaded) without touching the element.
    pub async fn set_overlay<B: Backend>(
        &mut self,
        enabled: bool,
        backend: &B,
        filename: Option<&str>,
    ) {
        self.overlay = enabled;
        if !enabled {
            if self.shadow.take().is_some() {
                debug!("Shadow graph released");
            }
            return;
        }
        if let Some(filename) = filename {
            self.load_shadow(backend, filename).await;
        }
    }

    /// Fetch and decode the original audio into a fresh shadow graph
    pub async fn load_shadow<B: Backend>(&mut self, backend: &B, filename: &str) -> bool {
        self.shadow = None;
        if !self.overlay {
            return false;
        }

        let result: anyhow::Result<DecodedAudio> = async {
            let url = backend.play_url(filename, PlayRequest::Original).await?;
            let bytes = backend.fetch_audio(&url).await?;
            Ok(decode_mono_async(Arc::from(bytes)).await?)
        }
        .await;

        match result {
            Ok(audio) => {
                info!(
                    "Original audio buffer loaded ({:.1}s)",
                    audio.duration().as_secs_f32()
                );
                self.shadow = Some(ShadowGraph::new(audio, self.analyser_config));
                self.start_shadow();
                true
            }
            Err(e) => {
                error!("Error loading original audio buffer: {}", e);
                false
            }
        }
    }

    /// Shadow analyser frame, only while the overlay is on and running
    pub fn sample_shadow(&self) -> Option<SpectrumFrame> {
        if !self.overlay {
            return None;
        }
        self.shadow.as_ref()?.sample()
    }

    fn start_shadow(&mut self) {
        if !(self.overlay && self.playing) {
            return;
        }
        let position = self.element.position();
        if let Some(shadow) = &mut self.shadow {
            shadow.start(position);
        }
    }

    fn stop_shadow(&mut self) {
        if let Some(shadow) = &mut self.shadow {
            shadow.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakeElement;
    use crate::engine::testing::ScriptedBackend;

    fn controller(overlay: bool) -> (PlaybackController, FakeElement) {
        let element = FakeElement::new(Duration::from_secs(10));
        let controller =
            PlaybackController::new(Box::new(element.clone()), AnalyserConfig::default(), overlay);
        (controller, element)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_audio_assigns_and_reuses() {
        let backend = ScriptedBackend::new();
        let (mut playback, element) = controller(false);

        let first = playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        assert!(!first.reused);
        assert!(playback.has_source());
        assert!(element.is_tapped());

        let again = playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        assert!(again.reused);
        assert_eq!(element.state.lock().loads.len(), 1);

        let boosted = EqGains::FLAT.with_band(0, 6.0);
        let swapped = playback.load_audio(&backend, "a.wav", &boosted).await.unwrap();
        assert!(!swapped.reused);
        assert_eq!(element.state.lock().loads.len(), 2);
        assert!(element.is_tapped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_audio_failure_returns_none() {
        let backend = ScriptedBackend::new();
        backend.script().fail_play_url = true;
        let (mut playback, _) = controller(false);
        assert!(playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.is_none());

        let backend = ScriptedBackend::new();
        let (mut playback, element) = controller(false);
        element.state.lock().fail_load = true;
        assert!(playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.is_none());
        assert!(!playback.has_source());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_download_never_reaches_element() {
        let backend = ScriptedBackend::new();
        backend.script().corrupt_audio = true;
        let (mut playback, element) = controller(false);
        assert!(playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.is_none());
        assert!(element.state.lock().loads.is_empty());
        assert!(!playback.has_source());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_swap_keeps_playhead() {
        let backend = ScriptedBackend::new();
        let (mut playback, element) = controller(false);
        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        playback.seek(Duration::from_secs(4)).unwrap();

        playback
            .load_audio(&backend, "a.wav", &EqGains::FLAT.with_band(1, 3.0))
            .await
            .unwrap();
        assert_eq!(element.state.lock().seeks.last(), Some(&Duration::from_secs(4)));
        assert_eq!(playback.position(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_failure_resets_transport() {
        let backend = ScriptedBackend::new();
        let (mut playback, element) = controller(false);
        assert_eq!(playback.play(), Err(MediaError::NoSource));

        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        element.state.lock().fail_play = true;
        assert!(playback.play().is_err());
        assert!(!playback.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_paused_stays_paused() {
        let backend = ScriptedBackend::new();
        let (mut playback, element) = controller(true);
        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        playback.load_shadow(&backend, "a.wav").await;

        playback.seek(Duration::from_secs(3)).unwrap();
        assert!(!playback.is_playing());
        assert!(element.is_paused());
        assert!(!playback.shadow_running());
        assert_eq!(playback.position(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_playing_restarts_shadow() {
        let backend = ScriptedBackend::new();
        let (mut playback, _) = controller(true);
        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        playback.load_shadow(&backend, "a.wav").await;
        playback.play().unwrap();
        assert_eq!(playback.shadow_offset(), Some(Duration::ZERO));

        playback.seek(Duration::from_millis(1500)).unwrap();
        assert_eq!(playback.shadow_offset(), Some(Duration::from_millis(1500)));
        assert!(playback.shadow_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_off_releases_and_on_rebuilds() {
        let backend = ScriptedBackend::new();
        let (mut playback, element) = controller(true);
        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        playback.load_shadow(&backend, "a.wav").await;
        playback.play().unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(playback.sample_shadow().is_some());

        playback.set_overlay(false, &backend, Some("a.wav")).await;
        assert!(!playback.has_shadow());
        assert!(playback.sample_shadow().is_none());

        let position = playback.position();
        let loads = element.state.lock().loads.len();
        playback.set_overlay(true, &backend, Some("a.wav")).await;
        assert!(playback.has_shadow());
        assert!(playback.shadow_running());
        assert_eq!(element.state.lock().loads.len(), loads);
        assert!(playback.position() >= position);
        assert_eq!(
            backend.log().plays.last(),
            Some(&("a.wav".to_string(), PlayRequest::Original))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_seek_before_source() {
        let (mut playback, _) = controller(false);
        playback.seek(Duration::from_secs(2)).unwrap();
        assert_eq!(playback.position(), Duration::from_secs(2));

        let backend = ScriptedBackend::new();
        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        assert_eq!(playback.position(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_rewinds() {
        let backend = ScriptedBackend::new();
        let (mut playback, _) = controller(false);
        playback.load_audio(&backend, "a.wav", &EqGains::FLAT).await.unwrap();
        playback.play().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        playback.stop();
        assert!(!playback.is_playing());
        assert_eq!(playback.position(), Duration::ZERO);
    }
}
