//! Interval workflows: manual entry, deletion and import from a video description

use crate::intervals::{extract_intervals, Interval, IntervalError, SchedulerConfig, VideoInterval};
use crate::store::{IntervalStore, StoreError};
use crate::youtube::{CatalogError, VideoCatalog};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] IntervalError),

    #[error("Intervals already exist for this video")]
    AlreadyExists,

    #[error("Video not found")]
    VideoNotFound,

    #[error("Failed to fetch YouTube video details: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Result of importing intervals from a video description
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported_count: usize,
    pub intervals: Vec<VideoInterval>,
    /// Set when the new rows landed but the replaced ones could not be removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct IntervalService {
    store: Arc<dyn IntervalStore>,
    catalog: Arc<dyn VideoCatalog>,
}

impl IntervalService {
    pub fn new(store: Arc<dyn IntervalStore>, catalog: Arc<dyn VideoCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn list(&self, user_id: &str, video_id: &str) -> Result<Vec<VideoInterval>, ServiceError> {
        Ok(self.store.list_intervals(user_id, video_id).await?)
    }

    /// Validate and store a manually entered interval
    ///
    /// Overlap with existing intervals is allowed; playback resolves it.
    pub async fn create(
        &self,
        user_id: &str,
        video_id: &str,
        interval: Interval,
    ) -> Result<VideoInterval, ServiceError> {
        interval.validate()?;
        let row = self.store.create_interval(user_id, video_id, interval).await?;
        info!(
            "➕ Added interval {:.1}s-{:.1}s to video {} (order {})",
            row.start_time, row.end_time, video_id, row.order_index
        );
        Ok(row)
    }

    /// Delete one interval; `false` when the user owns no such row
    pub async fn delete(&self, user_id: &str, interval_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.store.delete_intervals(user_id, &[interval_id]).await? > 0)
    }

    /// Replace (or seed) a video's intervals with its description chapters
    ///
    /// Existing intervals are only replaced when `overwrite` is set. New rows
    /// are written before old ones are removed, so a failed delete leaves
    /// duplicates behind (reported as a warning) rather than losing data.
    pub async fn import(
        &self,
        user_id: &str,
        access_token: &str,
        video_id: &str,
        overwrite: bool,
    ) -> Result<ImportOutcome, ServiceError> {
        let existing = self.store.list_intervals(user_id, video_id).await?;
        if !existing.is_empty() && !overwrite {
            return Err(ServiceError::AlreadyExists);
        }

        let details = self
            .catalog
            .video_details(access_token, video_id)
            .await?
            .ok_or(ServiceError::VideoNotFound)?;

        let duration = details.duration_seconds();
        let intervals = extract_intervals(&details.description, duration);

        if intervals.is_empty() {
            info!("📭 No chapter markers found in description of {}", video_id);
            return Ok(ImportOutcome {
                imported_count: 0,
                intervals: Vec::new(),
                warning: None,
            });
        }

        let inserted = self.store.insert_intervals(user_id, video_id, &intervals).await?;

        let mut warning = None;
        if overwrite && !existing.is_empty() {
            let ids: Vec<Uuid> = existing.iter().map(|row| row.id).collect();
            if let Err(e) = self.store.delete_intervals(user_id, &ids).await {
                warn!("Error deleting existing intervals for {}: {}", video_id, e);
                warning = Some("Imported new intervals, but failed to remove existing intervals.".to_string());
            }
        }

        info!("📥 Imported {} intervals for video {}", inserted.len(), video_id);
        Ok(ImportOutcome {
            imported_count: inserted.len(),
            intervals: inserted,
            warning,
        })
    }

    /// Scheduler input for a stored interval list
    pub async fn playback_config(
        &self,
        user_id: &str,
        video_id: &str,
        loop_enabled: bool,
    ) -> Result<SchedulerConfig, ServiceError> {
        let intervals = self
            .list(user_id, video_id)
            .await?
            .iter()
            .map(VideoInterval::interval)
            .collect();

        Ok(SchedulerConfig::new(video_id, intervals, loop_enabled))
    }
}
