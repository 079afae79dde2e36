//! Visualization refresh loop
//!
//! Two periodic tasks while playing: transport position every 100 ms and
//! live spectra every 50 ms. A tick that finds the playback controller busy
//! (a reload is in progress) is skipped.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use super::EngineInner;
use super::events::{EngineEvent, LiveSpectrum};
use crate::api::Backend;

#[derive(Default)]
pub(super) struct SamplerHandles {
    position: Option<JoinHandle<()>>,
    spectrum: Option<JoinHandle<()>>,
}

impl SamplerHandles {
    pub fn is_running(&self) -> bool {
        [&self.position, &self.spectrum]
            .into_iter()
            .flatten()
            .any(|task| !task.is_finished())
    }

    fn abort(&mut self) {
        for task in [self.position.take(), self.spectrum.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl Drop for SamplerHandles {
    fn drop(&mut self) {
        self.abort();
    }
}

impl<B: Backend> EngineInner<B> {
    /// Start both samplers, replacing any running ones
    pub(super) fn start_samplers(self: &Arc<Self>) {
        let mut handles = self.samplers.lock();
        handles.abort();

        let inner = Arc::clone(self);
        let spectrum = tokio::spawn(async move { inner.spectrum_loop().await });
        let abort_spectrum = spectrum.abort_handle();
        handles.spectrum = Some(spectrum);

        let inner = Arc::clone(self);
        handles.position = Some(tokio::spawn(async move {
            inner.position_loop().await;
            abort_spectrum.abort();
        }));
        debug!("Samplers started");
    }

    pub(super) fn stop_samplers(&self) {
        let mut handles = self.samplers.lock();
        if handles.is_running() {
            debug!("Samplers stopped");
        }
        handles.abort();
    }

    /// Returns once the element has ended
    async fn position_loop(&self) {
        let mut ticker = interval(self.config.position_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Ok(mut playback) = self.playback.try_lock() else {
                continue;
            };

            if playback.ended() {
                let duration = playback.duration().map(|d| d.as_secs_f32()).unwrap_or_default();
                playback.mark_ended();
                drop(playback);
                debug!("Playback ended");
                self.emit(EngineEvent::Transport { playing: false });
                self.emit(EngineEvent::Position {
                    position: 0.0,
                    duration,
                });
                self.emit(EngineEvent::Ended);
                self.emit(EngineEvent::StaticRedraw);
                return;
            }

            let position = playback.position().as_secs_f32();
            let media_duration = playback.duration().map(|d| d.as_secs_f32());
            drop(playback);

            let duration = {
                let mut session = self.session.lock();
                match session.track.as_mut() {
                    Some(track) => {
                        if let Some(seconds) = media_duration {
                            track.apply_media_duration(seconds);
                        }
                        track.duration
                    }
                    None => media_duration.unwrap_or_default(),
                }
            };
            self.emit(EngineEvent::Position { position, duration });
        }
    }

    async fn spectrum_loop(&self) {
        let mut ticker = interval(self.config.spectrum_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Ok(playback) = self.playback.try_lock() else {
                continue;
            };
            if !playback.is_playing() {
                continue;
            }
            let analyser = playback.analyser();
            let spectrum = LiveSpectrum {
                primary: analyser.frame(),
                overlay: playback.sample_shadow(),
                nyquist: analyser.sample_rate() as f32 / 2.0,
                position: playback.position().as_secs_f32(),
            };
            drop(playback);
            self.emit(EngineEvent::Spectrum(spectrum));
        }
    }
}
