//! API request and response models

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intervals::VideoInterval;
use crate::store::ProgressEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsQuery {
    pub q: Option<String>,
    pub page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsQuery {
    pub playlist_id: Option<String>,
    pub page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub playlist_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalsQuery {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub playlist_id: String,
    pub video_id: String,
    pub watched: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenPlaylistUpdate {
    pub playlist_id: String,
    pub hidden: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntervalRequest {
    pub video_id: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub video_id: String,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsResponse {
    pub playlists: Vec<Value>,
    pub next_page_token: Option<String>,
    pub page_info: Option<Value>,
    pub hidden_playlist_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsResponse {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
    pub page_info: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ProgressListResponse {
    pub progress: Vec<ProgressEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: ProgressEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenPlaylistsResponse {
    pub hidden_playlist_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IntervalsResponse {
    pub intervals: Vec<VideoInterval>,
}

#[derive(Debug, Serialize)]
pub struct IntervalResponse {
    pub interval: VideoInterval,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
