//! Per-client request throttling for `/api/*`

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::{auth::client_ip, error::ApiError, server::AppState};
use crate::security::RateDecision;

fn is_playlist_route(path: &str) -> bool {
    matches!(path, "/api/playlists" | "/api/playlist-items" | "/api/hidden-playlists")
}

/// Count the request against the `api` rule (and the `playlist` rule for
/// catalog routes), keyed by `ip:path`
pub async fn enforce_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !state.config.rate_limit.enabled || !path.starts_with("/api/") {
        return next.run(request).await;
    }

    let ip = client_ip(request.headers());
    let key = format!("{}:{}", ip, path);
    let now = Utc::now();

    let mut limiters = vec![&state.api_limiter];
    if is_playlist_route(&path) {
        limiters.push(&state.playlist_limiter);
    }

    for limiter in limiters {
        if let RateDecision::Limited { limit, reset_at } = limiter.check(&key, now) {
            state.security.rate_limit_exceeded(Some(&ip), &path);
            return ApiError::RateLimited { limit, reset_at }.into_response();
        }
    }

    next.run(request).await
}
