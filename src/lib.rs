//! FocusTube - playlist viewer core
//!
//! Turns chapter markers in video descriptions into playable intervals and
//! constrains playback to those intervals, behind a small REST API for
//! playlists, watched progress and interval management.

pub mod config;
pub mod intervals;
pub mod security;
pub mod service;
pub mod store;
pub mod validation;
pub mod youtube;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::intervals::{
    extract_intervals, Interval, IntervalError, PlaybackScheduler, PlaybackWidget, SchedulerConfig,
    SchedulerEvent, SimulatedPlayer, VideoInterval,
};
pub use crate::security::{RateLimitRule, RateLimiter, SecurityLog};
pub use crate::service::{ImportOutcome, IntervalService, ServiceError};
pub use crate::store::{IntervalStore, JsonStore, StoreError};
pub use crate::youtube::{CatalogError, VideoCatalog, VideoDetails, YouTubeClient};
