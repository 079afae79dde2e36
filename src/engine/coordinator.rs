//! EQ update coordinator
//!
//! Turns a stream of gain changes into backend work:
//!
//! ```text
//! Idle --change--> PendingDebounce --quiet 300 ms--> Applying --done--> Idle
//!                   ^      |                             |
//!                   +------+ change (timer restarts)     +-- timer fired while busy: dropped
//! ```
//!
//! Every change takes a fresh [`RunToken`]; a run re-checks its token after
//! each await and silently abandons the rest once a newer change exists.
//! A timer that fires while another run is applying is dropped, not queued.
//! When the busy run finishes it re-arms the latest dropped change with a
//! fresh debounce, so the last change always gets applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::{EngineEvent, EqCurve};
use super::EngineInner;
use crate::api::Backend;
use crate::eq::{self, EqGains};

/// Issues monotonically increasing run ids
#[derive(Debug, Clone, Default)]
pub struct RunCounter(Arc<AtomicU64>);

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token; every earlier token stops being current
    pub fn issue(&self) -> RunToken {
        let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        RunToken {
            id,
            latest: Arc::clone(&self.0),
        }
    }
}

/// Ticket of one EQ update run
#[derive(Debug, Clone)]
pub struct RunToken {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl RunToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True until a later token is issued
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

/// Externally visible coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    Idle,
    PendingDebounce,
    Applying,
}

/// Immutable snapshot of one gain change
#[derive(Debug, Clone)]
pub(super) struct PendingChange {
    pub gains: EqGains,
    /// Playhead to resume from after reload, if the change paused playback
    pub resume: Option<Duration>,
    pub token: RunToken,
}

#[derive(Default)]
pub(super) struct CoordinatorState {
    timer: Option<JoinHandle<()>>,
    applying: bool,
    /// Most recent change not yet committed
    latest: Option<PendingChange>,
    /// A timer fired while `applying` was held
    dropped: bool,
    curve_timer: Option<JoinHandle<()>>,
}

impl CoordinatorState {
    pub fn phase(&self) -> CoordinatorPhase {
        if self.applying {
            CoordinatorPhase::Applying
        } else if self.timer.as_ref().is_some_and(|t| !t.is_finished()) {
            CoordinatorPhase::PendingDebounce
        } else {
            CoordinatorPhase::Idle
        }
    }

    /// Resume intent of the gesture still waiting to commit
    pub fn pending_resume(&self) -> Option<Duration> {
        self.latest.as_ref().and_then(|change| change.resume)
    }

    /// Abort timers and forget pending work (new track)
    pub fn clear(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.latest = None;
        self.dropped = false;
    }
}

impl Drop for CoordinatorState {
    fn drop(&mut self) {
        for timer in [self.timer.take(), self.curve_timer.take()].into_iter().flatten() {
            timer.abort();
        }
    }
}

impl<B: Backend> EngineInner<B> {
    /// Debounced apply of `gains`
    ///
    /// `resume` is the playhead to come back to if this change paused
    /// playback; a change arriving while an earlier one is still pending
    /// inherits the earlier intent.
    pub(super) fn schedule_apply(self: &Arc<Self>, gains: EqGains, resume: Option<Duration>) {
        let mut state = self.coordinator.lock();
        let resume = resume.or_else(|| state.pending_resume());
        let change = PendingChange {
            gains,
            resume,
            token: self.runs.issue(),
        };
        debug!("EQ run {} scheduled", change.token.id());
        state.latest = Some(change.clone());
        self.arm_timer(&mut state, change, self.config.apply_debounce);
    }

    /// Undebounced apply, used when a track is (re)loaded
    pub(super) async fn apply_now(self: &Arc<Self>, gains: EqGains) {
        let change = {
            let mut state = self.coordinator.lock();
            state.clear();
            let change = PendingChange {
                gains,
                resume: None,
                token: self.runs.issue(),
            };
            state.latest = Some(change.clone());
            change
        };
        Arc::clone(self).perform_update(change).await;
    }

    fn arm_timer(self: &Arc<Self>, state: &mut CoordinatorState, change: PendingChange, delay: Duration) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let inner = Arc::clone(self);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later abort of this timer cannot cancel the run
            tokio::spawn(inner.perform_update(change));
        }));
    }

    /// Timer body: run `change` unless stale or another run is applying
    async fn perform_update(self: Arc<Self>, change: PendingChange) {
        if !change.token.is_current() {
            debug!("EQ run {} superseded before start", change.token.id());
            return;
        }
        {
            let mut state = self.coordinator.lock();
            if state.applying {
                debug!("EQ run {} dropped: another run is applying", change.token.id());
                state.dropped = true;
                return;
            }
            state.applying = true;
        }

        self.apply_run(&change).await;

        let mut state = self.coordinator.lock();
        state.applying = false;
        if change.token.is_current() {
            state.latest = None;
        }
        if std::mem::take(&mut state.dropped) {
            let timer_idle = state.timer.as_ref().is_none_or(|t| t.is_finished());
            let rearm = state
                .latest
                .clone()
                .filter(|latest| latest.token.is_current() && timer_idle);
            if let Some(latest) = rearm {
                debug!("Re-arming EQ run {}", latest.token.id());
                self.arm_timer(&mut state, latest, self.config.apply_debounce);
            }
        }
    }

    /// process -> commit -> (reload -> seek -> play -> samplers)
    async fn apply_run(self: &Arc<Self>, change: &PendingChange) {
        let Some(filename) = self.session.lock().filename().map(str::to_string) else {
            return;
        };

        let _busy = self.busy("Processing EQ...");
        let reply = match self.backend.process(&filename, &change.gains).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Process error: {}", e);
                return;
            }
        };
        if !change.token.is_current() {
            debug!("EQ run {} superseded after process", change.token.id());
            return;
        }

        let snapshot = {
            let mut session = self.session.lock();
            match session.track.as_mut() {
                Some(track) if track.filename == filename => {
                    track.apply_processed(reply);
                    Some(track.clone())
                }
                _ => None,
            }
        };
        let Some(snapshot) = snapshot else {
            return;
        };
        self.emit(EngineEvent::VisualsUpdated(snapshot));
        self.schedule_curve_refresh(change.gains);
        info!("EQ run {} committed", change.token.id());

        let Some(paused_at) = change.resume else {
            return;
        };
        if !change.token.is_current() {
            return;
        }

        self.stop_samplers();
        let mut playback = self.playback.lock().await;
        // Play pressed while the change was pending owns the playhead now
        let position = if playback.is_playing() {
            playback.position()
        } else {
            paused_at
        };
        if playback
            .load_audio(&self.backend, &filename, &change.gains)
            .await
            .is_none()
        {
            return;
        }
        if !change.token.is_current() {
            debug!("EQ run {} superseded after reload", change.token.id());
            return;
        }
        if let Err(e) = playback.seek(position) {
            warn!("Failed to restore position {:?}: {}", position, e);
        }
        let played = playback.play();
        drop(playback);

        match played {
            Ok(()) => {
                self.emit(EngineEvent::Transport { playing: true });
                self.start_samplers();
            }
            Err(e) => {
                error!("Error playing audio: {}", e);
                self.emit(EngineEvent::Notification(format!("Playback failed: {}", e)));
                self.emit(EngineEvent::Transport { playing: false });
            }
        }
    }

    /// Debounced refresh of the filter response curve
    ///
    /// Independent of the apply state machine. Falls back to the local
    /// biquad cascade when the backend cannot answer.
    pub(super) fn schedule_curve_refresh(self: &Arc<Self>, gains: EqGains) {
        let mut state = self.coordinator.lock();
        if let Some(timer) = state.curve_timer.take() {
            timer.abort();
        }
        let inner = Arc::clone(self);
        let delay = self.config.curve_debounce;
        state.curve_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let curve = inner.compute_curve(&gains).await;
            inner.emit(EngineEvent::CurveUpdated(curve));
        }));
    }

    async fn compute_curve(&self, gains: &EqGains) -> EqCurve {
        let sample_rate = self
            .session
            .lock()
            .track
            .as_ref()
            .and_then(|t| t.sample_rate)
            .unwrap_or(self.config.response_sample_rate);
        let q = self.config.response_q;

        match self.backend.eq_response(gains, sample_rate, q).await {
            Ok(reply) if !reply.freqs_hz.is_empty() && !reply.mag_db.is_empty() => EqCurve {
                freqs_hz: reply.freqs_hz,
                mag_db: reply.mag_db,
                local: false,
            },
            Ok(_) => {
                warn!("Empty EQ response, computing locally");
                local_curve(gains, sample_rate, q)
            }
            Err(e) => {
                warn!("EQ response error, computing locally: {}", e);
                local_curve(gains, sample_rate, q)
            }
        }
    }
}

fn local_curve(gains: &EqGains, sample_rate: u32, q: f32) -> EqCurve {
    let response = eq::response::compute(gains, sample_rate, q, 256);
    EqCurve {
        freqs_hz: response.freqs_hz,
        mag_db: response.mag_db,
        local: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_token_is_current() {
        let counter = RunCounter::new();
        let first = counter.issue();
        assert!(first.is_current());

        let second = counter.issue();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());

        let cloned = counter.clone();
        let third = cloned.issue();
        assert!(!second.is_current());
        assert!(third.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_follows_timer() {
        let mut state = CoordinatorState::default();
        assert_eq!(state.phase(), CoordinatorPhase::Idle);

        state.timer = Some(tokio::spawn(tokio::time::sleep(Duration::from_millis(300))));
        assert_eq!(state.phase(), CoordinatorPhase::PendingDebounce);

        state.applying = true;
        assert_eq!(state.phase(), CoordinatorPhase::Applying);

        state.applying = false;
        state.clear();
        assert_eq!(state.phase(), CoordinatorPhase::Idle);
    }
}
