//! Video catalog service (YouTube Data API v3)
//!
//! Every call carries the signed-in user's bearer credential and is attempted
//! exactly once; retries are left to the caller.

pub mod client;

pub use client::YouTubeClient;

use crate::intervals::parse_iso8601_duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors talking to the catalog service
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("YouTube API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid catalog URL: {0}")]
    Url(#[from] url::ParseError),
}

impl CatalogError {
    /// Upstream HTTP status, when the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Status { status, .. } => Some(*status),
            CatalogError::Request(e) => e.status().map(|s| s.as_u16()),
            CatalogError::Url(_) => None,
        }
    }
}

/// The parts of a video the interval import needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    pub title: Option<String>,
    /// Free text, possibly empty
    pub description: String,
    /// ISO-8601 duration such as `PT12M30S`
    pub duration_iso: String,
}

impl VideoDetails {
    /// Duration in seconds, `None` when the catalog value is unparseable
    pub fn duration_seconds(&self) -> Option<f64> {
        parse_iso8601_duration(&self.duration_iso).map(f64::from)
    }
}

/// One page of a paginated catalog listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
    pub page_info: Option<Value>,
}

/// Read-only access to the user's catalog
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Description and duration of a video; `None` if the catalog has no such video
    async fn video_details(
        &self,
        access_token: &str,
        video_id: &str,
    ) -> Result<Option<VideoDetails>, CatalogError>;

    /// The signed-in user's playlists
    async fn playlists(
        &self,
        access_token: &str,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<Page, CatalogError>;

    /// Items of one playlist
    async fn playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_seconds() {
        let details = VideoDetails {
            video_id: "abcdefghijk".to_string(),
            title: None,
            description: String::new(),
            duration_iso: "PT10M".to_string(),
        };
        assert_eq!(details.duration_seconds(), Some(600.0));

        let unknown = VideoDetails {
            duration_iso: String::new(),
            ..details
        };
        assert_eq!(unknown.duration_seconds(), None);
    }

    #[test]
    fn test_page_deserializes_youtube_shape() {
        let page: Page = serde_json::from_value(serde_json::json!({
            "kind": "youtube#playlistListResponse",
            "items": [{"id": "PL123"}],
            "nextPageToken": "CAUQAA",
            "pageInfo": {"totalResults": 7, "resultsPerPage": 5}
        }))
        .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        assert_eq!(page.page_info.unwrap()["totalResults"], 7);
    }
}
