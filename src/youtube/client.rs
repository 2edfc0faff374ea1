use super::{CatalogError, Page, VideoCatalog, VideoDetails};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Public YouTube Data API endpoint
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Page size requested from list endpoints
const MAX_RESULTS: &str = "50";

/// Catalog client backed by the YouTube Data API
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: Option<VideoSnippet>,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

impl YouTubeClient {
    /// Create a client with the given API base URL and request timeout
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, CatalogError> {
        // Validate once up front so per-request URL building cannot surprise us
        Url::parse(base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, CatalogError> {
        Ok(Url::parse_with_params(
            &format!("{}/{}", self.base_url, resource),
            params,
        )?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
    ) -> Result<T, CatalogError> {
        debug!("Fetching catalog resource {}", url.path());

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("YouTube API error {}: {}", status, body);
            return Err(CatalogError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VideoCatalog for YouTubeClient {
    async fn video_details(
        &self,
        access_token: &str,
        video_id: &str,
    ) -> Result<Option<VideoDetails>, CatalogError> {
        let url = self.endpoint("videos", &[("part", "snippet,contentDetails"), ("id", video_id)])?;
        let response: VideoListResponse = self.get_json(url, access_token).await?;

        Ok(response.items.into_iter().next().map(|video| {
            let (title, description) = match video.snippet {
                Some(snippet) => (snippet.title, snippet.description.unwrap_or_default()),
                None => (None, String::new()),
            };

            VideoDetails {
                video_id: video.id,
                title,
                description,
                duration_iso: video
                    .content_details
                    .and_then(|details| details.duration)
                    .unwrap_or_default(),
            }
        }))
    }

    async fn playlists(
        &self,
        access_token: &str,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<Page, CatalogError> {
        let mut params = vec![
            ("part", "id,snippet,contentDetails"),
            ("mine", "true"),
            ("maxResults", MAX_RESULTS),
        ];
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            params.push(("q", q));
        }
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            params.push(("pageToken", token));
        }

        let url = self.endpoint("playlists", &params)?;
        self.get_json(url, access_token).await
    }

    async fn playlist_items(
        &self,
        access_token: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page, CatalogError> {
        let mut params = vec![
            ("part", "id,snippet,contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", MAX_RESULTS),
        ];
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            params.push(("pageToken", token));
        }

        let url = self.endpoint("playlistItems", &params)?;
        self.get_json(url, access_token).await
    }
}
