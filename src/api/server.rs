//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, info};

use super::auth::{AuthUser, USER_ID_HEADER};
use super::error::ApiError;
use super::middleware::enforce_rate_limit;
use super::{handlers, models::*};
use crate::config::Config;
use crate::security::{RateLimiter, SecurityLog};
use crate::service::IntervalService;
use crate::store::JsonStore;
use crate::youtube::VideoCatalog;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: JsonStore,
    pub catalog: Arc<dyn VideoCatalog>,
    pub intervals: IntervalService,
    pub api_limiter: RateLimiter,
    pub playlist_limiter: RateLimiter,
    pub auth_limiter: RateLimiter,
    pub security: SecurityLog,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: JsonStore, catalog: Arc<dyn VideoCatalog>) -> Self {
        let intervals = IntervalService::new(Arc::new(store.clone()), catalog.clone());

        Self {
            api_limiter: RateLimiter::new(config.rate_limit.api),
            playlist_limiter: RateLimiter::new(config.rate_limit.playlist),
            auth_limiter: RateLimiter::new(config.rate_limit.auth),
            security: SecurityLog::new(config.security.event_capacity),
            config,
            store,
            catalog,
            intervals,
        }
    }
}

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' 'unsafe-eval' https://www.youtube.com https://s.ytimg.com; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: https: blob:; \
    media-src 'self' https: blob:; \
    frame-src 'self' https://www.youtube.com; \
    connect-src 'self' https://www.googleapis.com; \
    font-src 'self' data:";

const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=()";

/// Build the application router with all routes and layers
pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/playlists", get(playlists_handler))
        .route("/api/playlist-items", get(playlist_items_handler))
        .route("/api/progress", get(get_progress_handler).post(save_progress_handler))
        .route(
            "/api/hidden-playlists",
            get(get_hidden_playlists_handler).post(set_hidden_playlist_handler),
        )
        .route(
            "/api/vid-intervals",
            get(list_intervals_handler).post(create_interval_handler),
        )
        .route("/api/vid-intervals/import", post(import_intervals_handler))
        .route("/api/vid-intervals/:id", delete(delete_interval_handler))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit))
        .with_state(state.clone())
        .layer(
            // Hardening headers on every response, throttled ones included
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("permissions-policy"),
                    HeaderValue::from_static(PERMISSIONS_POLICY),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static(CONTENT_SECURITY_POLICY),
                )),
        )
        .layer(TraceLayer::new_for_http());

    if state.config.server.enable_cors {
        // Configure CORS to allow browser access
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static(USER_ID_HEADER),
            ]);
        app = app.layer(ServiceBuilder::new().layer(cors));
    }

    app
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState) -> Result<()> {
    let address = state.config.server.bind_address();
    info!("🚀 Starting HTTP server on {}", address);

    spawn_rate_limit_cleanup(&state);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 API server listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop expired rate-limit windows
fn spawn_rate_limit_cleanup(state: &AppState) {
    let limiters = [
        state.api_limiter.clone(),
        state.playlist_limiter.clone(),
        state.auth_limiter.clone(),
    ];
    let period = std::time::Duration::from_secs(state.config.rate_limit.cleanup_interval_seconds.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now();
            let removed: usize = limiters.iter().map(|l| l.purge_expired(now)).sum();
            if removed > 0 {
                debug!("Purged {} expired rate-limit windows", removed);
            }
        }
    });
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check().await))
}

async fn playlists_handler(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<PlaylistsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    Ok(Json(handlers::list_playlists(&state, &user, query).await?))
}

async fn playlist_items_handler(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<PlaylistItemsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    Ok(Json(handlers::list_playlist_items(&state, &user, query).await?))
}

async fn get_progress_handler(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    Ok(Json(handlers::get_progress(&state, &user, query).await?))
}

async fn save_progress_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ProgressUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = payload?;
    Ok(Json(handlers::save_progress(&state, &user, update).await?))
}

async fn get_hidden_playlists_handler(State(state): State<AppState>, user: AuthUser) -> impl IntoResponse {
    Json(handlers::get_hidden_playlists(&state, &user).await)
}

async fn set_hidden_playlist_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<HiddenPlaylistUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = payload?;
    Ok(Json(handlers::set_hidden_playlist(&state, &user, update).await?))
}

async fn list_intervals_handler(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<IntervalsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    Ok(Json(handlers::list_intervals(&state, &user, query).await?))
}

async fn create_interval_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateIntervalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let data = handlers::create_interval(&state, &user, request).await?;
    Ok((StatusCode::CREATED, Json(data)))
}

async fn delete_interval_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handlers::delete_interval(&state, &user, &id).await?))
}

async fn import_intervals_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    Ok(Json(handlers::import_intervals(&state, &user, request).await?))
}
