//! Clock-driven stand-in for a real playback widget
//!
//! The playhead advances with tokio time while playing and stops at the end
//! of the video, so it behaves under paused test clocks as well.

use super::scheduler::{PlaybackWidget, WidgetError};
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

#[derive(Debug)]
struct PlayerState {
    ready: bool,
    duration: f64,
    /// Position at `playing_since` (or the frozen position while paused)
    position: f64,
    playing_since: Option<Instant>,
}

impl PlayerState {
    fn position_at(&self, now: Instant) -> f64 {
        match self.playing_since {
            Some(since) => (self.position + (now - since).as_secs_f64()).min(self.duration),
            None => self.position,
        }
    }

    /// Fold elapsed playback into `position`, ending playback at the end
    fn settle(&mut self, now: Instant) {
        self.position = self.position_at(now);
        if self.playing_since.is_some() {
            self.playing_since = if self.position >= self.duration {
                None
            } else {
                Some(now)
            };
        }
    }
}

#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Mutex<PlayerState>,
}

impl SimulatedPlayer {
    /// A paused, not-yet-ready player for a video of `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            state: Mutex::new(PlayerState {
                ready: false,
                duration: duration.max(0.0),
                position: 0.0,
                playing_since: None,
            }),
        }
    }

    /// Simulate the widget finishing its initialization
    pub fn mark_ready(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.ready = true;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlayerState>, WidgetError> {
        self.state
            .lock()
            .map_err(|_| WidgetError::Unavailable("player state poisoned".to_string()))
    }

    fn ready_state(&self) -> Result<MutexGuard<'_, PlayerState>, WidgetError> {
        let mut state = self.lock()?;
        if !state.ready {
            return Err(WidgetError::NotReady);
        }
        state.settle(Instant::now());
        Ok(state)
    }
}

impl PlaybackWidget for SimulatedPlayer {
    fn current_time(&self) -> Result<f64, WidgetError> {
        Ok(self.ready_state()?.position)
    }

    fn duration(&self) -> Result<Option<f64>, WidgetError> {
        Ok(Some(self.ready_state()?.duration))
    }

    fn is_playing(&self) -> Result<bool, WidgetError> {
        Ok(self.ready_state()?.playing_since.is_some())
    }

    fn seek_to(&self, seconds: f64) -> Result<(), WidgetError> {
        if !seconds.is_finite() {
            return Err(WidgetError::InvalidTime(seconds));
        }
        let mut state = self.ready_state()?;
        state.position = seconds.clamp(0.0, state.duration);
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn play(&self) -> Result<(), WidgetError> {
        let mut state = self.ready_state()?;
        if state.playing_since.is_none() && state.position < state.duration {
            state.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), WidgetError> {
        let mut state = self.ready_state()?;
        state.playing_since = None;
        Ok(())
    }
}
