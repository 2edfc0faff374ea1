//! Interval model, description extraction and interval-constrained playback
//!
//! Intervals are sub-clips of a video (start/end in seconds). They are either
//! entered by hand or imported from chapter markers in a video description,
//! and then enforced during playback by the scheduler.

pub mod duration;
pub mod extractor;
pub mod player;
pub mod scheduler;

// Re-export main types
pub use duration::parse_iso8601_duration;
pub use extractor::{extract_intervals, parse_timestamp};
pub use player::SimulatedPlayer;
pub use scheduler::{
    PlaybackScheduler, PlaybackWidget, SchedulerConfig, SchedulerCore, SchedulerEvent,
    WidgetError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation failures for interval boundaries
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IntervalError {
    #[error("Times cannot be negative")]
    NegativeTime,

    #[error("Times must be finite numbers")]
    NonFiniteTime,

    #[error("End time must be greater than start time")]
    EndNotAfterStart,
}

/// A playable window inside a video
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    /// Seconds from the start of the video
    pub start_time: f64,
    /// Seconds from the start of the video, strictly after `start_time`
    pub end_time: f64,
}

impl Interval {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self { start_time, end_time }
    }

    /// Length of the window in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether `t` lies in `[start_time, end_time)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }

    /// Check the `end > start >= 0` invariant
    pub fn validate(&self) -> Result<(), IntervalError> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(IntervalError::NonFiniteTime);
        }
        if self.start_time < 0.0 || self.end_time < 0.0 {
            return Err(IntervalError::NegativeTime);
        }
        if self.end_time <= self.start_time {
            return Err(IntervalError::EndNotAfterStart);
        }
        Ok(())
    }
}

/// A stored interval row, owned by one (user, video) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoInterval {
    pub id: Uuid,
    pub user_id: String,
    pub video_id: String,
    pub start_time: f64,
    pub end_time: f64,
    /// Display/playback order within the (user, video) scope
    pub order_index: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoInterval {
    pub fn new(user_id: &str, video_id: &str, interval: Interval, order_index: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            start_time: interval.start_time,
            end_time: interval.end_time,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }
}

/// Sum of the lengths of all intervals
pub fn total_watch_time(intervals: &[Interval]) -> f64 {
    intervals.iter().map(Interval::duration).sum()
}

/// Render seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_validation() {
        assert!(Interval::new(0.0, 10.0).validate().is_ok());
        assert_eq!(Interval::new(10.0, 10.0).validate(), Err(IntervalError::EndNotAfterStart));
        assert_eq!(Interval::new(20.0, 10.0).validate(), Err(IntervalError::EndNotAfterStart));
        assert_eq!(Interval::new(-1.0, 10.0).validate(), Err(IntervalError::NegativeTime));
        assert_eq!(Interval::new(0.0, f64::NAN).validate(), Err(IntervalError::NonFiniteTime));
    }

    #[test]
    fn test_contains_is_half_open() {
        let interval = Interval::new(10.0, 20.0);
        assert!(interval.contains(10.0));
        assert!(interval.contains(19.9));
        assert!(!interval.contains(20.0));
        assert!(!interval.contains(9.99));
    }

    #[test]
    fn test_total_watch_time() {
        let intervals = vec![Interval::new(0.0, 90.0), Interval::new(300.0, 600.0)];
        assert_eq!(total_watch_time(&intervals), 390.0);
        assert_eq!(total_watch_time(&[]), 0.0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(90.0), "1:30");
        assert_eq!(format_timestamp(3725.4), "1:02:05");
    }

    #[test]
    fn test_video_interval_serializes_camel_case() {
        let row = VideoInterval::new("user-1", "dQw4w9WgXcQ", Interval::new(1.0, 2.0), 3);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["orderIndex"], 3);
        assert_eq!(json["startTime"], 1.0);
        assert!(json.get("createdAt").is_some());
    }
}
