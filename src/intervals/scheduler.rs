//! Interval-constrained playback scheduler
//!
//! Polls a playback widget on a fixed cadence and keeps the playhead inside
//! the active interval: gaps are skipped by seeking forward, the end of the
//! last interval either pauses or loops back to the first one.
//!
//! Every tick re-derives its inputs (sorted intervals, loop flag, video) from
//! the latest configuration, and widget commands are issued synchronously
//! inside the tick that decided them, so a decision can never outlive the
//! configuration it was computed from.

use super::Interval;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors surfaced by a playback widget
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    #[error("playback widget is not ready")]
    NotReady,

    #[error("playback widget unavailable: {0}")]
    Unavailable(String),

    #[error("playback widget reported an invalid time: {0}")]
    InvalidTime(f64),
}

/// Contract of the external video-rendering component
pub trait PlaybackWidget: Send + Sync {
    fn current_time(&self) -> Result<f64, WidgetError>;
    fn duration(&self) -> Result<Option<f64>, WidgetError>;
    fn is_playing(&self) -> Result<bool, WidgetError>;
    fn seek_to(&self, seconds: f64) -> Result<(), WidgetError>;
    fn play(&self) -> Result<(), WidgetError>;
    fn pause(&self) -> Result<(), WidgetError>;
}

/// What the scheduler enforces: one video, its intervals, and the loop flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerConfig {
    pub video_id: String,
    /// Any order; sorted by start time on every tick
    pub intervals: Vec<Interval>,
    pub loop_enabled: bool,
}

impl SchedulerConfig {
    pub fn new(video_id: impl Into<String>, intervals: Vec<Interval>, loop_enabled: bool) -> Self {
        Self {
            video_id: video_id.into(),
            intervals,
            loop_enabled,
        }
    }

    /// Intervals in ascending start order; equal starts keep their given order
    pub fn sorted_intervals(&self) -> Vec<Interval> {
        let mut sorted = self.intervals.clone();
        sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        sorted
    }
}

/// Notifications for downstream consumers (UI "current chapter", clock)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerEvent {
    /// Polled playhead position in seconds
    TimeUpdate(f64),
    /// Index into the sorted interval list that is now active
    IntervalChanged(usize),
}

/// Scheduler state for the current video + interval list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    /// No intervals; time is reported but nothing is enforced
    Idle,
    /// A jump to `target` was issued and not yet observed
    Seeking { index: usize, target: f64, issued_at: f64 },
    InInterval(usize),
    /// Past the last interval's end
    AtEnd,
}

/// Outcome of one scheduling decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The playhead is inside interval `index`
    Stay(usize),
    /// Jump forward (or back, when looping) to the start of interval `index`
    SeekTo { index: usize, target: f64 },
    /// Past the final interval with looping disabled
    Pause,
}

/// Map a playhead position onto sorted intervals
///
/// The first interval that still ends after `t` wins: if it already started
/// the playhead stays, otherwise we seek to its start. With overlapping
/// intervals this means the earliest-starting one captures the playhead.
/// Returns `None` when there is nothing to enforce.
pub fn plan(t: f64, sorted: &[Interval], loop_enabled: bool) -> Option<Decision> {
    let first = sorted.first()?;

    for (index, interval) in sorted.iter().enumerate() {
        if t < interval.end_time {
            if t >= interval.start_time {
                return Some(Decision::Stay(index));
            }
            return Some(Decision::SeekTo {
                index,
                target: interval.start_time,
            });
        }
    }

    if loop_enabled {
        Some(Decision::SeekTo {
            index: 0,
            target: first.start_time,
        })
    } else {
        Some(Decision::Pause)
    }
}

/// The playback cursor plus the per-tick decision logic
#[derive(Debug, Clone)]
pub struct SchedulerCore {
    state: PlaybackState,
    active_index: Option<usize>,
    last_time: Option<f64>,
    /// Configuration the cursor was derived from
    seen_config: Option<SchedulerConfig>,
}

impl Default for SchedulerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerCore {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            active_index: None,
            last_time: None,
            seen_config: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    /// Forget everything derived from the previous configuration
    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.active_index = None;
        self.last_time = None;
        self.seen_config = None;
    }

    /// Run one polling step against the widget
    ///
    /// Widget failures abort the tick without touching the cursor.
    pub fn tick(
        &mut self,
        widget: &dyn PlaybackWidget,
        config: &SchedulerConfig,
    ) -> Result<Vec<SchedulerEvent>, WidgetError> {
        if self.seen_config.as_ref() != Some(config) {
            if self.seen_config.is_some() {
                debug!("Scheduler configuration changed for video {}, resetting cursor", config.video_id);
            }
            self.reset();
            self.seen_config = Some(config.clone());
        }

        let t = widget.current_time()?;
        if !t.is_finite() || t < 0.0 {
            return Err(WidgetError::InvalidTime(t));
        }

        let sorted = config.sorted_intervals();
        let mut next_state = self.state;
        let mut next_index = self.active_index;

        if sorted.is_empty() {
            next_state = PlaybackState::Idle;
        } else if widget.is_playing()? {
            match plan(t, &sorted, config.loop_enabled) {
                Some(Decision::Stay(index)) => {
                    next_state = PlaybackState::InInterval(index);
                    next_index = Some(index);
                }
                Some(Decision::SeekTo { index, target }) => {
                    if self.seek_pending(target, t) {
                        debug!("Seek to {:.2}s still pending at {:.2}s", target, t);
                    } else {
                        debug!("Seeking from {:.2}s to interval {} at {:.2}s", t, index, target);
                        widget.seek_to(target)?;
                        next_state = PlaybackState::Seeking {
                            index,
                            target,
                            issued_at: t,
                        };
                    }
                    next_index = Some(index);
                }
                Some(Decision::Pause) => {
                    if self.state != PlaybackState::AtEnd {
                        debug!("Reached end of last interval at {:.2}s, pausing", t);
                    }
                    widget.pause()?;
                    next_state = PlaybackState::AtEnd;
                }
                None => next_state = PlaybackState::Idle,
            }
        }

        let mut events = Vec::with_capacity(2);
        if self.last_time != Some(t) {
            events.push(SchedulerEvent::TimeUpdate(t));
        }
        if next_index != self.active_index {
            if let Some(index) = next_index {
                events.push(SchedulerEvent::IntervalChanged(index));
            }
        }

        self.state = next_state;
        self.active_index = next_index;
        self.last_time = Some(t);

        Ok(events)
    }

    /// The same jump was issued and the widget has not moved since
    fn seek_pending(&self, target: f64, t: f64) -> bool {
        matches!(
            self.state,
            PlaybackState::Seeking { target: pending, issued_at, .. }
                if pending == target && issued_at == t
        )
    }
}

/// Owns the polling task that drives a [`SchedulerCore`]
///
/// At most one task (and therefore one timer) exists per scheduler; it is
/// cancelled by [`stop`](Self::stop) and when the scheduler is dropped.
pub struct PlaybackScheduler {
    widget: Arc<dyn PlaybackWidget>,
    poll_interval: Duration,
    config_tx: watch::Sender<SchedulerConfig>,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackScheduler {
    /// Create a stopped scheduler and the receiver for its notifications
    pub fn new(
        widget: Arc<dyn PlaybackWidget>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (config_tx, _) = watch::channel(SchedulerConfig::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let scheduler = Self {
            widget,
            poll_interval,
            config_tx,
            events_tx,
            task: None,
        };

        (scheduler, events_rx)
    }

    /// Begin enforcing `config`; restarts polling if it was stopped
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, config: SchedulerConfig) {
        self.config_tx.send_replace(config);

        if self.is_running() {
            return;
        }

        let widget = Arc::clone(&self.widget);
        let config_rx = self.config_tx.subscribe();
        let events_tx = self.events_tx.clone();
        let poll_interval = self.poll_interval;

        info!(
            "▶️ Playback scheduler started ({} ms cadence)",
            poll_interval.as_millis()
        );
        self.task = Some(tokio::spawn(run_polling_loop(
            widget,
            config_rx,
            events_tx,
            poll_interval,
        )));
    }

    /// Swap in a new interval list, loop flag or video
    ///
    /// The next tick resets the cursor and decides from `config` only.
    pub fn update(&self, config: SchedulerConfig) {
        self.config_tx.send_replace(config);
    }

    /// Cancel the polling task
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("⏹️ Playback scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Snapshot of the configuration being enforced
    pub fn config(&self) -> SchedulerConfig {
        self.config_tx.borrow().clone()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_polling_loop(
    widget: Arc<dyn PlaybackWidget>,
    config_rx: watch::Receiver<SchedulerConfig>,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
    poll_interval: Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut core = SchedulerCore::new();

    loop {
        ticker.tick().await;

        let config = config_rx.borrow().clone();
        match core.tick(widget.as_ref(), &config) {
            Ok(events) => {
                for event in events {
                    // Nobody listening is fine; enforcement continues
                    let _ = events_tx.send(event);
                }
            }
            Err(e) => {
                warn!("Skipping scheduler tick for video {}: {}", config.video_id, e);
            }
        }
    }
}
