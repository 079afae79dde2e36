//! Dashboard engine
//!
//! Owns the session, the playback controller and the playlist, and turns
//! user operations into backend calls. The UI holds a cheap [`Engine`]
//! handle and listens to [`EngineEvent`]s; it never sees the locks.

mod coordinator;
mod events;
mod playback;
mod sampler;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

pub use coordinator::CoordinatorPhase;
pub use events::{EngineEvent, EqCurve, EventReceiver, LiveSpectrum};

use crate::api::Backend;
use crate::audio::{AnalyserConfig, MediaElement};
use crate::eq::EqGains;
use crate::features::{PlaylistEntry, PlaylistStore, Settings};
use crate::session::{AudioSession, SessionState};
use coordinator::{CoordinatorState, RunCounter};
use events::EventSender;
use playback::PlaybackController;
use sampler::SamplerHandles;

/// Timing and analyser knobs, taken from [`Settings`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub apply_debounce: Duration,
    pub curve_debounce: Duration,
    pub response_sample_rate: u32,
    pub response_q: f32,
    pub position_interval: Duration,
    pub spectrum_interval: Duration,
    pub analyser: AnalyserConfig,
    pub overlay_by_default: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for EngineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            apply_debounce: Duration::from_millis(settings.eq.apply_debounce_ms),
            curve_debounce: Duration::from_millis(settings.eq.curve_debounce_ms),
            response_sample_rate: settings.eq.response_sample_rate,
            response_q: settings.eq.response_q,
            position_interval: Duration::from_millis(settings.display.position_interval_ms.max(1)),
            spectrum_interval: Duration::from_millis(settings.display.spectrum_interval_ms.max(1)),
            analyser: settings.display.analyser(),
            overlay_by_default: settings.display.overlay_by_default,
        }
    }
}

/// Where a seek should land
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Fraction of the track, 0.0..=1.0
    Fraction(f32),
    Seconds(f32),
}

pub(crate) struct EngineInner<B: Backend> {
    backend: B,
    config: EngineConfig,
    session: Mutex<SessionState>,
    playback: tokio::sync::Mutex<PlaybackController>,
    coordinator: Mutex<CoordinatorState>,
    samplers: Mutex<SamplerHandles>,
    runs: RunCounter,
    playlist: Mutex<PlaylistStore>,
    busy: AtomicUsize,
    events: EventSender,
}

/// Clears the loading indicator when the last pending operation ends
pub(crate) struct BusyGuard<'a> {
    count: &'a AtomicUsize,
    events: &'a EventSender,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.events.send(EngineEvent::Busy(None));
        }
    }
}

impl<B: Backend> EngineInner<B> {
    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            debug!("Event dropped, no listener");
        }
    }

    fn busy(&self, message: &str) -> BusyGuard<'_> {
        self.busy.fetch_add(1, Ordering::SeqCst);
        self.emit(EngineEvent::Busy(Some(message.to_string())));
        BusyGuard {
            count: &self.busy,
            events: &self.events,
        }
    }

    fn playlist_changed(&self) {
        let entries = self.playlist.lock().entries().to_vec();
        let active = self.session.lock().active_entry.clone();
        self.emit(EngineEvent::PlaylistChanged { entries, active });
    }

    /// Detach playback and pending work from the previous track
    async fn release_track(&self) {
        self.stop_samplers();
        self.coordinator.lock().clear();
        self.playback.lock().await.reset_track();
    }

    /// Analyze the loaded track and store the payloads
    async fn analyze(&self, filename: &str) {
        let _busy = self.busy("Analyzing...");
        let reply = match self.backend.analyze(filename).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Analyze error: {}", e);
                return;
            }
        };
        let snapshot = {
            let mut session = self.session.lock();
            match session.track.as_mut() {
                Some(track) if track.filename == filename => {
                    track.apply_analysis(reply);
                    Some(track.clone())
                }
                _ => None,
            }
        };
        if let Some(snapshot) = snapshot {
            self.emit(EngineEvent::VisualsUpdated(snapshot));
        }
    }

    /// Shared tail of every gain change: preview, pause, debounce
    async fn change_gains(self: &Arc<Self>, gains: EqGains) {
        self.session.lock().gains = gains;
        self.emit(EngineEvent::GainsChanged(gains));
        self.schedule_curve_refresh(gains);

        let resume = {
            let mut playback = self.playback.lock().await;
            if playback.is_playing() {
                let position = playback.position();
                playback.pause();
                Some(position)
            } else {
                None
            }
        };
        if resume.is_some() {
            self.stop_samplers();
            self.emit(EngineEvent::Transport { playing: false });
        }

        self.schedule_apply(gains, resume);
    }
}

/// Handle to the dashboard engine, cheap to clone
pub struct Engine<B: Backend> {
    inner: Arc<EngineInner<B>>,
}

impl<B: Backend> Clone for Engine<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> Engine<B> {
    /// Build the engine; the receiver yields every event it emits
    ///
    /// The initial playlist and overlay state are queued on the channel
    /// right away.
    pub fn new(
        backend: B,
        element: Box<dyn MediaElement>,
        playlist: PlaylistStore,
        config: EngineConfig,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = events::channel();
        let inner = Arc::new(EngineInner {
            backend,
            config,
            session: Mutex::new(SessionState::default()),
            playback: tokio::sync::Mutex::new(PlaybackController::new(
                element,
                config.analyser,
                config.overlay_by_default,
            )),
            coordinator: Mutex::new(CoordinatorState::default()),
            samplers: Mutex::new(SamplerHandles::default()),
            runs: RunCounter::new(),
            playlist: Mutex::new(playlist),
            busy: AtomicUsize::new(0),
            events,
        });
        inner.emit(EngineEvent::OverlayChanged(config.overlay_by_default));
        inner.playlist_changed();
        (Self { inner }, receiver)
    }

    #[cfg(test)]
    pub fn session(&self) -> SessionState {
        self.inner.session.lock().clone()
    }

    pub fn phase(&self) -> CoordinatorPhase {
        self.inner.coordinator.lock().phase()
    }

    #[cfg(test)]
    pub async fn is_playing(&self) -> bool {
        self.inner.playback.lock().await.is_playing()
    }

    /// Upload a local file and make it the current track
    ///
    /// Gains reset to flat; the original payloads are analyzed once and
    /// a flat process run fills the processed set. Nothing starts playing.
    pub async fn upload(&self, name: String, bytes: Vec<u8>) {
        let inner = &self.inner;
        let reply = {
            let _busy = inner.busy("Uploading...");
            match inner.backend.upload(&name, bytes).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Upload error: {}", e);
                    inner.emit(EngineEvent::Notification(format!("Upload failed: {}", e)));
                    return;
                }
            }
        };

        inner.release_track().await;
        let track = AudioSession::from_upload(name, reply);
        let filename = track.filename.clone();
        let duration = track.duration;
        info!("Track uploaded: {} ({:.1}s)", filename, duration);
        {
            let mut session = inner.session.lock();
            session.reset();
            session.track = Some(track.clone());
        }
        inner.emit(EngineEvent::Transport { playing: false });
        inner.emit(EngineEvent::GainsChanged(EqGains::FLAT));
        inner.emit(EngineEvent::TrackLoaded(track));
        inner.emit(EngineEvent::Position {
            position: 0.0,
            duration,
        });
        inner.playlist_changed();
        inner.schedule_curve_refresh(EqGains::FLAT);

        inner.analyze(&filename).await;
        {
            let mut playback = inner.playback.lock().await;
            if playback.overlay_enabled() {
                playback.load_shadow(&inner.backend, &filename).await;
            }
        }
        inner.apply_now(EqGains::FLAT).await;
    }

    /// Play or pause
    ///
    /// Play always asks the backend for the rendition of the current
    /// gains; an unchanged URL reuses the loaded element.
    pub async fn toggle_play(&self) {
        let inner = &self.inner;
        let (filename, gains) = {
            let session = inner.session.lock();
            (session.filename().map(str::to_string), session.gains)
        };
        let Some(filename) = filename else {
            inner.emit(EngineEvent::Notification("Upload an audio file first".to_string()));
            return;
        };

        let mut playback = inner.playback.lock().await;
        if playback.is_playing() {
            playback.pause();
            drop(playback);
            inner.stop_samplers();
            inner.emit(EngineEvent::Transport { playing: false });
            inner.emit(EngineEvent::StaticRedraw);
            return;
        }

        let loaded = {
            let _busy = inner.busy("Loading audio...");
            playback.load_audio(&inner.backend, &filename, &gains).await
        };
        if loaded.is_none() {
            drop(playback);
            inner.emit(EngineEvent::Notification("Could not load audio, try again".to_string()));
            return;
        }
        if playback.overlay_enabled() && !playback.has_shadow() {
            playback.load_shadow(&inner.backend, &filename).await;
        }

        let played = playback.play();
        drop(playback);
        match played {
            Ok(()) => {
                inner.emit(EngineEvent::Transport { playing: true });
                inner.start_samplers();
            }
            Err(e) => {
                error!("Error playing audio: {}", e);
                inner.emit(EngineEvent::Notification(format!("Playback failed: {}", e)));
                inner.emit(EngineEvent::Transport { playing: false });
            }
        }
    }

    /// Pause and rewind to zero
    pub async fn stop(&self) {
        let inner = &self.inner;
        if inner.session.lock().track.is_none() {
            return;
        }
        inner.playback.lock().await.stop();
        inner.stop_samplers();
        let duration = inner
            .session
            .lock()
            .track
            .as_ref()
            .map(|t| t.duration)
            .unwrap_or_default();
        inner.emit(EngineEvent::Transport { playing: false });
        inner.emit(EngineEvent::Position {
            position: 0.0,
            duration,
        });
        inner.emit(EngineEvent::StaticRedraw);
    }

    /// Move the playhead; never changes the transport state
    pub async fn seek(&self, target: SeekTarget) {
        let inner = &self.inner;
        let Some(session_duration) = inner.session.lock().track.as_ref().map(|t| t.duration) else {
            return;
        };

        let mut playback = inner.playback.lock().await;
        let duration = playback
            .duration()
            .map(|d| d.as_secs_f32())
            .filter(|d| *d > 0.0)
            .unwrap_or(session_duration);
        let seconds = match target {
            SeekTarget::Fraction(fraction) => fraction.clamp(0.0, 1.0) * duration,
            SeekTarget::Seconds(seconds) => seconds.clamp(0.0, duration.max(0.0)),
        };
        if !seconds.is_finite() {
            return;
        }
        if let Err(e) = playback.seek(Duration::from_secs_f32(seconds)) {
            warn!("Seek failed: {}", e);
            return;
        }
        drop(playback);
        inner.emit(EngineEvent::Position {
            position: seconds,
            duration,
        });
    }

    /// Set one band from a slider drag
    pub async fn set_band_gain(&self, band: usize, gain_db: f32) {
        let gains = self.inner.session.lock().gains.with_band(band, gain_db);
        self.inner.change_gains(gains).await;
    }

    /// Replace all bands at once
    pub async fn set_gains(&self, gains: EqGains) {
        self.inner.change_gains(gains).await;
    }

    pub async fn toggle_overlay(&self) {
        let inner = &self.inner;
        let filename = inner.session.lock().filename().map(str::to_string);
        let mut playback = inner.playback.lock().await;
        let enabled = !playback.overlay_enabled();
        playback
            .set_overlay(enabled, &inner.backend, filename.as_deref())
            .await;
        let playing = playback.is_playing();
        drop(playback);
        info!("Original overlay {}", if enabled { "on" } else { "off" });
        inner.emit(EngineEvent::OverlayChanged(enabled));
        if !playing {
            inner.emit(EngineEvent::StaticRedraw);
        }
    }

    /// Flip auto-EQ; turning it on with a track loaded applies a suggestion
    pub async fn toggle_auto_eq(&self) {
        let inner = &self.inner;
        let (enabled, filename) = {
            let mut session = inner.session.lock();
            session.auto_eq = !session.auto_eq;
            (session.auto_eq, session.filename().map(str::to_string))
        };
        inner.emit(EngineEvent::AutoEqChanged(enabled));

        let Some(filename) = filename.filter(|_| enabled) else {
            debug!("Auto-EQ {}", if enabled { "enabled" } else { "disabled" });
            return;
        };

        let gains = {
            let _busy = inner.busy("Suggesting EQ...");
            match inner.backend.suggest_eq(&filename).await {
                Ok(gains) => {
                    info!("EQ suggested by model: {:?}", gains.values());
                    gains
                }
                Err(e) => {
                    warn!("EQ suggestion failed, using random EQ: {}", e);
                    EqGains::random()
                }
            }
        };

        let still_wanted = {
            let session = inner.session.lock();
            session.auto_eq && session.filename() == Some(filename.as_str())
        };
        if !still_wanted {
            debug!("Dropping EQ suggestion for {}", filename);
            return;
        }
        inner.change_gains(gains).await;
    }

    /// Save the current track with its gains
    ///
    /// Returns whether an entry was created.
    pub fn add_to_playlist(&self) -> bool {
        let inner = &self.inner;
        let entry = {
            let session = inner.session.lock();
            session.track.as_ref().map(|track| {
                PlaylistEntry::new(
                    &track.filename,
                    &track.name,
                    &track.tag,
                    session.gains,
                    session.mode_label(),
                )
            })
        };
        let Some(entry) = entry else {
            inner.emit(EngineEvent::Notification(
                "Open an audio file before adding it to the playlist".to_string(),
            ));
            return false;
        };

        let id = entry.id.clone();
        if let Err(e) = inner.playlist.lock().add(entry) {
            error!("Cannot save playlist: {}", e);
        }
        inner.session.lock().active_entry = Some(id);
        inner.playlist_changed();
        true
    }

    /// Make a stored entry the current track
    ///
    /// Uses the entry's gains when it has them, the current gains
    /// otherwise; the element ends up loaded and paused at zero.
    pub async fn load_entry(&self, id: &str) {
        let inner = &self.inner;
        let Some(entry) = inner.playlist.lock().get(id).cloned() else {
            warn!("Playlist entry {} not found", id);
            return;
        };
        if entry.filename.is_empty() {
            return;
        }

        inner.release_track().await;
        let track = AudioSession::from_stored(
            &entry.filename,
            entry.display_name(),
            &entry.tag,
            entry.detected_mode.as_deref(),
        );
        let gains = {
            let mut session = inner.session.lock();
            let gains = entry.eq_gains.unwrap_or(session.gains);
            session.track = Some(track.clone());
            session.gains = gains;
            session.active_entry = Some(entry.id.clone());
            gains
        };
        info!("Loading playlist entry {} ({})", entry.id, entry.filename);
        inner.emit(EngineEvent::Transport { playing: false });
        inner.emit(EngineEvent::GainsChanged(gains));
        inner.emit(EngineEvent::TrackLoaded(track));
        inner.emit(EngineEvent::Position {
            position: 0.0,
            duration: 0.0,
        });
        inner.playlist_changed();

        inner.analyze(&entry.filename).await;
        inner.apply_now(gains).await;
        {
            let _busy = inner.busy("Loading audio...");
            let mut playback = inner.playback.lock().await;
            if playback
                .load_audio(&inner.backend, &entry.filename, &gains)
                .await
                .is_some()
            {
                if let Some(seconds) = playback.duration().map(|d| d.as_secs_f32()) {
                    if let Some(track) = inner.session.lock().track.as_mut() {
                        track.apply_media_duration(seconds);
                    }
                }
                if playback.overlay_enabled() {
                    playback.load_shadow(&inner.backend, &entry.filename).await;
                }
            }
        }
        inner.schedule_curve_refresh(gains);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PlayRequest;
    use crate::audio::testing::FakeElement;
    use testing::ScriptedBackend;

    struct Harness {
        engine: Engine<ScriptedBackend>,
        backend: ScriptedBackend,
        element: FakeElement,
        events: EventReceiver,
    }

    impl Harness {
        fn new(overlay: bool) -> Self {
            let backend = ScriptedBackend::new();
            let element = FakeElement::new(Duration::from_secs(10));
            let config = EngineConfig {
                overlay_by_default: overlay,
                ..EngineConfig::default()
            };
            let (engine, events) = Engine::new(
                backend.clone(),
                Box::new(element.clone()),
                PlaylistStore::in_memory(),
                config,
            );
            Self {
                engine,
                backend,
                element,
                events,
            }
        }

        fn drain(&mut self) -> Vec<EngineEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }

        async fn uploaded(overlay: bool) -> Self {
            let harness = Self::new(overlay);
            harness.engine.upload("track.wav".to_string(), vec![0; 16]).await;
            settle().await;
            harness
        }
    }

    /// Let timers and spawned runs finish on the paused clock
    async fn settle() {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    fn filename() -> String {
        ScriptedBackend::stored_name("track.wav")
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_flow() {
        let mut h = Harness::new(false);
        h.engine.upload("track.wav".to_string(), vec![0; 16]).await;

        let log = h.backend.log();
        assert_eq!(log.uploads, vec!["track.wav".to_string()]);
        assert_eq!(log.analyzes, vec![filename()]);
        assert_eq!(log.processes, vec![(filename(), EqGains::FLAT)]);
        assert!(log.plays.is_empty());

        tokio::time::sleep(Duration::from_millis(201)).await;
        assert_eq!(h.backend.log().eq_responses, vec![EqGains::FLAT]);

        let session = h.engine.session();
        let track = session.track.unwrap();
        assert_eq!(track.duration, 10.0);
        assert_eq!(track.mode, "Music");
        assert!(track.original.fft.is_some());
        assert!(track.processed.fft.is_some());
        assert!(!h.engine.is_playing().await);
        assert!(h.element.state.lock().loads.is_empty());

        let events = h.drain();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::TrackLoaded(_))));
        assert!(events.iter().any(|e| matches!(e, EngineEvent::CurveUpdated(c) if !c.local)));
        assert!(matches!(events.last(), Some(EngineEvent::CurveUpdated(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_keeps_session() {
        let mut h = Harness::new(false);
        h.backend.script().fail_upload = true;
        h.engine.upload("track.wav".to_string(), vec![0; 16]).await;

        assert!(h.engine.session().track.is_none());
        assert!(h.backend.log().analyzes.is_empty());
        assert!(h.drain().iter().any(|e| matches!(e, EngineEvent::Notification(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_within_debounce_coalesce() {
        let h = Harness::uploaded(false).await;
        let before = h.backend.log().processes.len();

        h.engine.set_band_gain(0, 2.0).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.engine.set_band_gain(0, 4.0).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.engine.set_band_gain(1, -3.0).await;
        assert_eq!(h.engine.phase(), CoordinatorPhase::PendingDebounce);
        settle().await;

        let processes = h.backend.log().processes;
        assert_eq!(processes.len(), before + 1);
        let expected = EqGains::FLAT.with_band(0, 4.0).with_band(1, -3.0);
        assert_eq!(processes.last(), Some(&(filename(), expected)));
        assert_eq!(h.engine.phase(), CoordinatorPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_run_never_commits() {
        let h = Harness::uploaded(false).await;
        h.backend
            .script()
            .process_delays
            .extend([Duration::from_secs(5), Duration::ZERO]);

        // Run A: slow process
        h.engine.set_band_gain(0, -6.0).await;
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(h.engine.phase(), CoordinatorPhase::Applying);

        // Run B: scheduled while A is in flight
        h.engine.set_band_gain(0, 6.0).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        let processes = h.backend.log().processes;
        assert_eq!(
            processes.last(),
            Some(&(filename(), EqGains::FLAT.with_band(0, 6.0)))
        );
        let session = h.engine.session();
        assert_eq!(session.gains, EqGains::FLAT.with_band(0, 6.0));
        let fft = session.track.unwrap().processed.fft.unwrap();
        assert_eq!(fft.magnitude_db[0], -24.0);
        assert_eq!(h.engine.phase(), CoordinatorPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_while_playing_resumes_at_position() {
        let mut h = Harness::uploaded(false).await;
        h.engine.toggle_play().await;
        assert!(h.engine.is_playing().await);
        tokio::time::sleep(Duration::from_secs(3)).await;
        h.drain();

        h.engine.set_band_gain(0, 6.0).await;
        assert!(!h.engine.is_playing().await);
        let paused_at = h.element.state.lock().base;
        assert_eq!(paused_at, Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(350)).await;

        let gains = EqGains::FLAT.with_band(0, 6.0);
        let processes = h.backend.log().processes;
        assert_eq!(processes.iter().filter(|(_, g)| *g == gains).count(), 1);
        assert!(h.engine.is_playing().await);
        assert_eq!(h.element.state.lock().seeks.last(), Some(&paused_at));
        assert_eq!(
            h.backend.log().plays.last(),
            Some(&(filename(), PlayRequest::Gains(gains)))
        );

        let events = h.drain();
        let resumed = events
            .iter()
            .position(|e| matches!(e, EngineEvent::Transport { playing: true }));
        assert!(resumed.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_drag_keeps_resume_intent() {
        let h = Harness::uploaded(false).await;
        h.engine.toggle_play().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        h.engine.set_band_gain(0, 3.0).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.engine.set_band_gain(0, 5.0).await;
        settle().await;

        assert!(h.engine.is_playing().await);
        assert_eq!(
            h.element.state.lock().seeks.last(),
            Some(&Duration::from_secs(2))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_resume_during_debounce_keeps_playhead() {
        let h = Harness::uploaded(false).await;
        h.engine.toggle_play().await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        h.engine.set_band_gain(0, 6.0).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.engine.toggle_play().await;
        assert!(h.engine.is_playing().await);
        settle().await;

        assert!(h.engine.is_playing().await);
        let last_seek = h.element.state.lock().seeks.last().copied();
        assert!(last_seek.is_some_and(|at| at > Duration::from_secs(3)), "{:?}", last_seek);
        assert_eq!(
            h.backend.log().plays.last(),
            Some(&(filename(), PlayRequest::Gains(EqGains::FLAT.with_band(0, 6.0))))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_uses_current_gains() {
        let h = Harness::uploaded(false).await;
        h.engine.set_band_gain(2, 4.0).await;
        settle().await;

        h.engine.toggle_play().await;
        assert_eq!(
            h.backend.log().plays.last(),
            Some(&(filename(), PlayRequest::Gains(EqGains::FLAT.with_band(2, 4.0))))
        );
        assert!(h.engine.is_playing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_failure_notifies() {
        let mut h = Harness::uploaded(false).await;
        h.element.state.lock().fail_play = true;
        h.drain();

        h.engine.toggle_play().await;
        assert!(!h.engine.is_playing().await);
        let events = h.drain();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Notification(_))));
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::Transport { playing: false })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_to_end_stops_samplers() {
        let mut h = Harness::uploaded(false).await;
        h.engine.toggle_play().await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(!h.engine.is_playing().await);
        let events = h.drain();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Ended)));
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Spectrum(_))));
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::Position { position, .. } if *position > 0.0)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_rewinds_and_redraws() {
        let mut h = Harness::uploaded(false).await;
        h.engine.toggle_play().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        h.drain();

        h.engine.stop().await;
        assert!(!h.engine.is_playing().await);
        let events = h.drain();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::StaticRedraw)));
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::Position { position, .. } if *position == 0.0)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_paused_stays_paused() {
        let h = Harness::uploaded(false).await;
        h.engine.seek(SeekTarget::Fraction(0.5)).await;
        assert!(!h.engine.is_playing().await);

        h.engine.toggle_play().await;
        assert!(h.engine.is_playing().await);
        assert_eq!(h.element.state.lock().base, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_toggle() {
        let mut h = Harness::uploaded(true).await;
        h.engine.toggle_play().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let with_overlay = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Spectrum(s) => Some(s),
                _ => None,
            })
            .last();
        assert!(with_overlay.is_some_and(|s| s.overlay.is_some()));

        h.engine.toggle_overlay().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let events = h.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::OverlayChanged(false))));
        assert!(events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Spectrum(s) => Some(s),
                _ => None,
            })
            .all(|s| s.overlay.is_none()));

        let position = h.element.state.lock().base;
        let loads = h.element.state.lock().loads.len();
        h.engine.toggle_overlay().await;
        assert_eq!(h.element.state.lock().loads.len(), loads);
        assert_eq!(h.element.state.lock().base, position);
        assert_eq!(
            h.backend.log().plays.last(),
            Some(&(filename(), PlayRequest::Original))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_eq_falls_back_to_random() {
        let h = Harness::uploaded(false).await;
        h.backend.script().fail_suggest = true;

        h.engine.toggle_auto_eq().await;
        let session = h.engine.session();
        assert!(session.auto_eq);
        assert!(!session.gains.is_flat());
        assert!(session.gains.values().iter().all(|g| (-8.0..=8.0).contains(g)));

        settle().await;
        assert_eq!(
            h.backend.log().processes.last(),
            Some(&(filename(), session.gains))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_eq_applies_suggestion() {
        let h = Harness::uploaded(false).await;
        let suggestion = h.backend.script().suggestion;

        h.engine.toggle_auto_eq().await;
        assert_eq!(h.engine.session().gains, suggestion);

        h.engine.toggle_auto_eq().await;
        assert!(!h.engine.session().auto_eq);
        assert_eq!(h.backend.log().suggests.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestion_for_replaced_track_is_dropped() {
        let h = Harness::uploaded(false).await;
        h.backend.script().suggest_delay = Some(Duration::from_secs(3));

        let engine = h.engine.clone();
        let pending = tokio::spawn(async move { engine.toggle_auto_eq().await });
        tokio::time::sleep(Duration::from_millis(500)).await;
        h.engine.upload("other.wav".to_string(), vec![0; 16]).await;
        pending.await.unwrap();
        settle().await;

        let other = ScriptedBackend::stored_name("other.wav");
        let session = h.engine.session();
        assert_eq!(session.filename(), Some(other.as_str()));
        assert!(session.gains.is_flat());
        let suggestion = h.backend.script().suggestion;
        assert!(!h
            .backend
            .log()
            .processes
            .iter()
            .any(|(name, gains)| *name == other && *gains == suggestion));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestion_dropped_when_auto_eq_turned_off() {
        let h = Harness::uploaded(false).await;
        h.backend.script().suggest_delay = Some(Duration::from_secs(3));

        let engine = h.engine.clone();
        let pending = tokio::spawn(async move { engine.toggle_auto_eq().await });
        tokio::time::sleep(Duration::from_millis(500)).await;
        h.engine.toggle_auto_eq().await;
        pending.await.unwrap();

        assert!(!h.engine.session().auto_eq);
        assert!(h.engine.session().gains.is_flat());
    }

    #[tokio::test(start_paused = true)]
    async fn test_curve_falls_back_to_local() {
        let mut h = Harness::uploaded(false).await;
        h.backend.script().fail_eq_response = true;
        h.drain();

        h.engine.set_band_gain(4, 6.0).await;
        settle().await;
        let curve = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::CurveUpdated(c) => Some(c),
                _ => None,
            })
            .last();
        let curve = curve.unwrap();
        assert!(curve.local);
        assert!(curve.mag_db.iter().any(|db| *db > 5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playlist_add_then_load() {
        let mut h = Harness::uploaded(false).await;
        let gains = EqGains::FLAT.with_band(3, 2.5);
        h.engine.set_gains(gains).await;
        settle().await;

        assert!(h.engine.add_to_playlist());
        let entries = match h.drain().into_iter().rev().find_map(|e| match e {
            EngineEvent::PlaylistChanged { entries, active } => Some((entries, active)),
            _ => None,
        }) {
            Some((entries, active)) => {
                assert_eq!(active.as_deref(), Some(entries[0].id.as_str()));
                entries
            }
            None => panic!("no playlist event"),
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].eq_gains, Some(gains));
        assert_eq!(entries[0].detected_mode.as_deref(), Some("Music"));

        h.engine.set_gains(EqGains::FLAT).await;
        settle().await;
        h.engine.load_entry(&entries[0].id).await;

        let session = h.engine.session();
        assert_eq!(session.gains, gains);
        assert_eq!(session.active_entry.as_deref(), Some(entries[0].id.as_str()));
        assert_eq!(session.track.unwrap().name, "track.wav");
        assert!(!h.engine.is_playing().await);
        assert_eq!(
            h.backend.log().plays.last(),
            Some(&(filename(), PlayRequest::Gains(gains)))
        );
        assert_eq!(h.backend.log().processes.last(), Some(&(filename(), gains)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_without_track_notifies() {
        let mut h = Harness::new(false);
        h.drain();
        assert!(!h.engine.add_to_playlist());
        assert!(h.drain().iter().any(|e| matches!(e, EngineEvent::Notification(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_clears_when_idle() {
        let mut h = Harness::uploaded(false).await;
        let events = h.drain();
        let busy: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Busy(message) => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(busy.first(), Some(&Some("Uploading...".to_string())));
        assert_eq!(busy.last(), Some(&None));
    }
}
