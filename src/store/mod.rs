//! Durable per-user storage for intervals, watched progress and hidden playlists

pub mod json_store;

pub use json_store::JsonStore;

use crate::intervals::{Interval, VideoInterval};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Storage failures, surfaced to callers as operation failures
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Watched state of one video within one playlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub playlist_id: String,
    pub video_id: String,
    pub watched: bool,
    pub watched_at: Option<DateTime<Utc>>,
}

/// Everything stored for one user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub user_id: String,
    #[serde(default)]
    pub intervals: Vec<VideoInterval>,
    #[serde(default)]
    pub progress: Vec<ProgressEntry>,
    #[serde(default)]
    pub hidden_playlists: BTreeSet<String>,
}

impl UserDocument {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }
}

/// Interval persistence as seen by the import and CRUD workflows
#[async_trait]
pub trait IntervalStore: Send + Sync {
    /// Intervals of one video, ascending by start time
    async fn list_intervals(&self, user_id: &str, video_id: &str) -> Result<Vec<VideoInterval>, StoreError>;

    /// Append one interval with order index `max(existing) + 1`
    async fn create_interval(
        &self,
        user_id: &str,
        video_id: &str,
        interval: Interval,
    ) -> Result<VideoInterval, StoreError>;

    /// Bulk insert; order index is the position in `intervals`
    async fn insert_intervals(
        &self,
        user_id: &str,
        video_id: &str,
        intervals: &[Interval],
    ) -> Result<Vec<VideoInterval>, StoreError>;

    /// Delete the given rows owned by `user_id`, returning how many went away
    async fn delete_intervals(&self, user_id: &str, ids: &[Uuid]) -> Result<usize, StoreError>;
}
