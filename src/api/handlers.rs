//! API request handlers

use serde_json::Value;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use super::models::*;
use super::server::AppState;
use crate::intervals::Interval;
use crate::service::ImportOutcome;
use crate::validation::{is_valid_playlist_id, is_valid_video_id, sanitize_string};
use crate::youtube::CatalogError;

/// Handle health check requests
pub async fn health_check() -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "focustube",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

fn require_video_id(state: &AppState, user: &AuthUser, video_id: Option<&str>) -> Result<String, ApiError> {
    let video_id = video_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Video ID is required"))?;

    if !is_valid_video_id(video_id) {
        state.security.validation_failure(Some(&user.user_id), "videoId", video_id);
        return Err(ApiError::bad_request("Invalid video ID"));
    }

    Ok(video_id.to_string())
}

fn require_playlist_id(state: &AppState, user: &AuthUser, playlist_id: Option<&str>) -> Result<String, ApiError> {
    let playlist_id = playlist_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Playlist ID is required"))?;

    if !is_valid_playlist_id(playlist_id) {
        state.security.validation_failure(Some(&user.user_id), "playlistId", playlist_id);
        return Err(ApiError::bad_request("Invalid playlist ID"));
    }

    Ok(playlist_id.to_string())
}

/// Record a failed catalog call before mapping it to a response
fn catalog_failure(state: &AppState, user: &AuthUser, err: CatalogError, message: &str) -> ApiError {
    state
        .security
        .suspicious_activity(Some(&user.user_id), None, &err.to_string());
    ApiError::upstream(err, message)
}

/// The caller's playlists plus the ids they chose to hide
pub async fn list_playlists(
    state: &AppState,
    user: &AuthUser,
    query: PlaylistsQuery,
) -> Result<PlaylistsResponse, ApiError> {
    let search = query
        .q
        .as_deref()
        .map(sanitize_string)
        .filter(|q| !q.is_empty());
    let page_token = query.page_token.as_deref().filter(|t| !t.is_empty());

    let page = state
        .catalog
        .playlists(&user.access_token, search.as_deref(), page_token)
        .await
        .map_err(|e| catalog_failure(state, user, e, "Failed to fetch playlists from YouTube API"))?;
    state.security.data_access(&user.user_id, "youtube_playlists", "fetch");

    let hidden_playlist_ids = state.store.hidden_playlists(&user.user_id).await;

    Ok(PlaylistsResponse {
        playlists: page.items,
        next_page_token: page.next_page_token,
        page_info: page.page_info,
        hidden_playlist_ids,
    })
}

pub async fn list_playlist_items(
    state: &AppState,
    user: &AuthUser,
    query: PlaylistItemsQuery,
) -> Result<PlaylistItemsResponse, ApiError> {
    let playlist_id = require_playlist_id(state, user, query.playlist_id.as_deref())?;
    let page_token = query.page_token.as_deref().filter(|t| !t.is_empty());

    let page = state
        .catalog
        .playlist_items(&user.access_token, &playlist_id, page_token)
        .await
        .map_err(|e| catalog_failure(state, user, e, "Failed to fetch playlist items"))?;
    state.security.data_access(&user.user_id, "youtube_playlist_items", "fetch");

    Ok(PlaylistItemsResponse {
        items: page.items,
        next_page_token: page.next_page_token,
        page_info: page.page_info,
    })
}

pub async fn get_progress(
    state: &AppState,
    user: &AuthUser,
    query: ProgressQuery,
) -> Result<ProgressListResponse, ApiError> {
    let playlist_id = require_playlist_id(state, user, query.playlist_id.as_deref())?;

    Ok(ProgressListResponse {
        progress: state.store.list_progress(&user.user_id, &playlist_id).await,
    })
}

pub async fn save_progress(
    state: &AppState,
    user: &AuthUser,
    update: ProgressUpdate,
) -> Result<ProgressResponse, ApiError> {
    let playlist_id = require_playlist_id(state, user, Some(&update.playlist_id))?;
    let video_id = require_video_id(state, user, Some(&update.video_id))?;

    let progress = state
        .store
        .set_progress(&user.user_id, &playlist_id, &video_id, update.watched)
        .await?;

    Ok(ProgressResponse { progress })
}

pub async fn get_hidden_playlists(state: &AppState, user: &AuthUser) -> HiddenPlaylistsResponse {
    HiddenPlaylistsResponse {
        hidden_playlist_ids: state.store.hidden_playlists(&user.user_id).await,
    }
}

pub async fn set_hidden_playlist(
    state: &AppState,
    user: &AuthUser,
    update: HiddenPlaylistUpdate,
) -> Result<SuccessResponse, ApiError> {
    let playlist_id = require_playlist_id(state, user, Some(&update.playlist_id))?;

    state
        .store
        .set_playlist_hidden(&user.user_id, &playlist_id, update.hidden)
        .await?;

    Ok(SuccessResponse::ok())
}

pub async fn list_intervals(
    state: &AppState,
    user: &AuthUser,
    query: IntervalsQuery,
) -> Result<IntervalsResponse, ApiError> {
    let video_id = require_video_id(state, user, query.video_id.as_deref())?;

    Ok(IntervalsResponse {
        intervals: state.intervals.list(&user.user_id, &video_id).await?,
    })
}

pub async fn create_interval(
    state: &AppState,
    user: &AuthUser,
    request: CreateIntervalRequest,
) -> Result<IntervalResponse, ApiError> {
    let video_id = require_video_id(state, user, Some(&request.video_id))?;
    let interval = Interval::new(request.start_time, request.end_time);

    Ok(IntervalResponse {
        interval: state.intervals.create(&user.user_id, &video_id, interval).await?,
    })
}

pub async fn delete_interval(state: &AppState, user: &AuthUser, id: &str) -> Result<SuccessResponse, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::bad_request("Invalid interval ID"))?;

    state.security.data_access(&user.user_id, "video_intervals", "delete");
    if !state.intervals.delete(&user.user_id, id).await? {
        return Err(ApiError::NotFound("Interval not found".to_string()));
    }

    Ok(SuccessResponse::ok())
}

pub async fn import_intervals(
    state: &AppState,
    user: &AuthUser,
    request: ImportRequest,
) -> Result<ImportOutcome, ApiError> {
    let video_id = require_video_id(state, user, Some(&request.video_id))?;

    state.security.data_access(&user.user_id, "video_intervals", "import");
    Ok(state
        .intervals
        .import(&user.user_id, &user.access_token, &video_id, request.overwrite)
        .await?)
}
