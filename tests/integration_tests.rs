use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use focustube::api::{build_router, AppState};
use focustube::security::{SecurityEventKind, Severity};
use focustube::youtube::{Page, VideoDetails};
use focustube::{CatalogError, ConfigBuilder, JsonStore, RateLimitRule, VideoCatalog};

const VIDEO: &str = "dQw4w9WgXcQ";
const PLAYLIST: &str = "PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG";

#[derive(Default)]
struct MockCatalog {
    videos: HashMap<String, VideoDetails>,
    last_query: Mutex<Option<String>>,
    items_status: Option<u16>,
}

impl MockCatalog {
    fn with_video(mut self, video_id: &str, description: &str, duration_iso: &str) -> Self {
        self.videos.insert(
            video_id.to_string(),
            VideoDetails {
                video_id: video_id.to_string(),
                title: None,
                description: description.to_string(),
                duration_iso: duration_iso.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl VideoCatalog for MockCatalog {
    async fn video_details(&self, _token: &str, video_id: &str) -> Result<Option<VideoDetails>, CatalogError> {
        Ok(self.videos.get(video_id).cloned())
    }

    async fn playlists(
        &self,
        _token: &str,
        query: Option<&str>,
        _page_token: Option<&str>,
    ) -> Result<Page, CatalogError> {
        *self.last_query.lock().unwrap() = query.map(str::to_string);
        Ok(Page {
            items: vec![json!({ "id": PLAYLIST }), json!({ "id": "PLother" })],
            next_page_token: Some("next".to_string()),
            page_info: Some(json!({ "totalResults": 2 })),
        })
    }

    async fn playlist_items(
        &self,
        _token: &str,
        playlist_id: &str,
        _page_token: Option<&str>,
    ) -> Result<Page, CatalogError> {
        if let Some(status) = self.items_status {
            return Err(CatalogError::Status {
                status,
                body: "quotaExceeded".to_string(),
            });
        }
        Ok(Page {
            items: vec![json!({ "snippet": { "playlistId": playlist_id } })],
            next_page_token: None,
            page_info: None,
        })
    }
}

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
    catalog: Arc<MockCatalog>,
}

async fn test_app_with(catalog: MockCatalog, builder: ConfigBuilder) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = builder.with_data_dir(dir.path().to_path_buf()).build();
    let store = JsonStore::open(config.storage.data_dir.clone()).await.unwrap();
    let catalog = Arc::new(catalog);
    let state = AppState::new(Arc::new(config), store, catalog.clone());
    let router = build_router(state.clone());

    TestApp {
        _dir: dir,
        state,
        router,
        catalog,
    }
}

async fn test_app() -> TestApp {
    let catalog = MockCatalog::default().with_video(VIDEO, "0:00 Intro\n1:00 Drill\n2:30 Sparring", "PT4M");
    test_app_with(catalog, ConfigBuilder::new()).await
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", "Bearer test-token")
        .header("x-user-id", "user-1")
        .header("x-forwarded-for", "203.0.113.9");

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn assert_security_headers(headers: &HeaderMap) {
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert_eq!(headers["permissions-policy"], "camera=(), microphone=(), geolocation=()");
    let csp = headers["content-security-policy"].to_str().unwrap();
    assert!(csp.starts_with("default-src 'self'; "));
    assert!(csp.contains("frame-src 'self' https://www.youtube.com"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = test_app().await;

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_security_headers(response.headers());

    let req = Request::builder().uri("/api/hidden-playlists").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_security_headers(response.headers());
}

#[tokio::test]
async fn test_repeated_auth_failures_are_throttled() {
    let builder = ConfigBuilder::new().with_auth_rate_limit(RateLimitRule::new(2, 300));
    let app = test_app_with(MockCatalog::default(), builder).await;

    let anonymous = |ip: &str| {
        Request::builder()
            .uri("/api/hidden-playlists")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let (status, _) = send(&app, anonymous("198.51.100.20")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app.router.clone().oneshot(anonymous("198.51.100.20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["X-RateLimit-Limit"], "2");

    // Another client still gets a plain 401
    let (status, _) = send(&app, anonymous("198.51.100.21")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Authenticated requests from the throttled client are unaffected
    let signed_in = Request::builder()
        .uri("/api/hidden-playlists")
        .header("authorization", "Bearer test-token")
        .header("x-user-id", "user-1")
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, signed_in).await;
    assert_eq!(status, StatusCode::OK);

    let events = app.state.security.recent(10);
    assert_eq!(events.iter().filter(|e| e.kind == SecurityEventKind::AuthFailure).count(), 4);
    assert_eq!(events.iter().filter(|e| e.kind == SecurityEventKind::RateLimitExceeded).count(), 1);
}

#[tokio::test]
async fn test_missing_identity_is_rejected_and_logged() {
    let app = test_app().await;
    let req = Request::builder()
        .uri(format!("/api/vid-intervals?videoId={}", VIDEO))
        .header("x-forwarded-for", "198.51.100.4")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let events = app.state.security.recent(10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, SecurityEventKind::AuthFailure);
    assert_eq!(events[0].ip.as_deref(), Some("198.51.100.4"));
}

#[tokio::test]
async fn test_create_and_list_intervals() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request("POST", "/api/vid-intervals", Some(json!({ "videoId": VIDEO, "startTime": 40.0, "endTime": 50.0 }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["interval"]["orderIndex"], 0);

    send(
        &app,
        request("POST", "/api/vid-intervals", Some(json!({ "videoId": VIDEO, "startTime": 10.0, "endTime": 20.0 }))),
    )
    .await;

    let (status, body) = send(&app, request("GET", &format!("/api/vid-intervals?videoId={}", VIDEO), None)).await;
    assert_eq!(status, StatusCode::OK);
    let intervals = body["intervals"].as_array().unwrap();
    assert_eq!(intervals.len(), 2);
    assert_eq!(intervals[0]["startTime"], 10.0);
    assert_eq!(intervals[0]["orderIndex"], 1);
    assert_eq!(intervals[1]["startTime"], 40.0);
}

#[tokio::test]
async fn test_create_interval_validation() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request("POST", "/api/vid-intervals", Some(json!({ "videoId": VIDEO, "startTime": 20.0, "endTime": 20.0 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End time must be greater than start time");

    let (status, body) = send(
        &app,
        request("POST", "/api/vid-intervals", Some(json!({ "videoId": VIDEO, "startTime": "soon" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input");

    let (status, _) = send(&app, request("GET", "/api/vid-intervals", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_video_id_is_logged() {
    let app = test_app().await;

    let (status, body) = send(&app, request("GET", "/api/vid-intervals?videoId=../../etc", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid video ID");

    let events = app.state.security.by_severity(Severity::Low);
    assert!(events.iter().any(|e| e.kind == SecurityEventKind::ValidationFailure));
}

#[tokio::test]
async fn test_import_flow() {
    let app = test_app().await;
    let import = json!({ "videoId": VIDEO });

    let (status, body) = send(&app, request("POST", "/api/vid-intervals/import", Some(import.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["importedCount"], 3);
    assert!(body.get("warning").is_none());
    assert_eq!(body["intervals"][2]["startTime"], 150.0);
    assert_eq!(body["intervals"][2]["endTime"], 240.0);

    let (status, body) = send(&app, request("POST", "/api/vid-intervals/import", Some(import))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Intervals already exist for this video");

    let (status, body) = send(
        &app,
        request("POST", "/api/vid-intervals/import", Some(json!({ "videoId": VIDEO, "overwrite": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["importedCount"], 3);

    let (_, body) = send(&app, request("GET", &format!("/api/vid-intervals?videoId={}", VIDEO), None)).await;
    assert_eq!(body["intervals"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_import_unknown_video() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request("POST", "/api/vid-intervals/import", Some(json!({ "videoId": "aaaaaaaaaaa" }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Video not found");
}

#[tokio::test]
async fn test_delete_interval() {
    let app = test_app().await;

    let (_, body) = send(
        &app,
        request("POST", "/api/vid-intervals", Some(json!({ "videoId": VIDEO, "startTime": 1.0, "endTime": 2.0 }))),
    )
    .await;
    let id = body["interval"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, request("DELETE", &format!("/api/vid-intervals/{}", id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, request("DELETE", &format!("/api/vid-intervals/{}", id), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, request("DELETE", "/api/vid-intervals/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid interval ID");
}

#[tokio::test]
async fn test_progress_upsert() {
    let app = test_app().await;
    let update = json!({ "playlistId": PLAYLIST, "videoId": VIDEO, "watched": true });

    let (status, body) = send(&app, request("POST", "/api/progress", Some(update))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["watched"], true);
    assert!(body["progress"]["watchedAt"].is_string());

    let update = json!({ "playlistId": PLAYLIST, "videoId": VIDEO, "watched": false });
    send(&app, request("POST", "/api/progress", Some(update))).await;

    let (status, body) = send(&app, request("GET", &format!("/api/progress?playlistId={}", PLAYLIST), None)).await;
    assert_eq!(status, StatusCode::OK);
    let progress = body["progress"].as_array().unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0]["watched"], false);
    assert!(progress[0]["watchedAt"].is_null());
}

#[tokio::test]
async fn test_hidden_playlists_and_catalog() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request("POST", "/api/hidden-playlists", Some(json!({ "playlistId": PLAYLIST, "hidden": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&app, request("GET", "/api/hidden-playlists", None)).await;
    assert_eq!(body["hiddenPlaylistIds"], json!([PLAYLIST]));

    let (status, body) = send(&app, request("GET", "/api/playlists?q=%3Cb%3Ejiu%3C%2Fb%3E", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playlists"].as_array().unwrap().len(), 2);
    assert_eq!(body["nextPageToken"], "next");
    assert_eq!(body["hiddenPlaylistIds"], json!([PLAYLIST]));
    assert_eq!(app.catalog.last_query.lock().unwrap().as_deref(), Some("bjiu/b"));
    assert!(app
        .state
        .security
        .recent(10)
        .iter()
        .any(|e| e.kind == SecurityEventKind::DataAccess && e.details["resource"] == "youtube_playlists"));

    send(
        &app,
        request("POST", "/api/hidden-playlists", Some(json!({ "playlistId": PLAYLIST, "hidden": false }))),
    )
    .await;
    let (_, body) = send(&app, request("GET", "/api/hidden-playlists", None)).await;
    assert_eq!(body["hiddenPlaylistIds"], json!([]));
}

#[tokio::test]
async fn test_playlist_items() {
    let app = test_app().await;

    let (status, body) = send(&app, request("GET", &format!("/api/playlist-items?playlistId={}", PLAYLIST), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["snippet"]["playlistId"], PLAYLIST);

    let events = app.state.security.recent(10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, SecurityEventKind::DataAccess);
    assert_eq!(events[0].details["resource"], "youtube_playlist_items");
    assert_eq!(events[0].details["action"], "fetch");

    let (status, body) = send(&app, request("GET", "/api/playlist-items", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Playlist ID is required");
}

#[tokio::test]
async fn test_catalog_status_is_passed_through() {
    let catalog = MockCatalog {
        items_status: Some(403),
        ..MockCatalog::default()
    };
    let app = test_app_with(catalog, ConfigBuilder::new()).await;

    let (status, body) = send(&app, request("GET", &format!("/api/playlist-items?playlistId={}", PLAYLIST), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Failed to fetch playlist items");

    let flagged = app.state.security.by_severity(Severity::High);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].kind, SecurityEventKind::SuspiciousActivity);
    assert_eq!(flagged[0].user_id.as_deref(), Some("user-1"));
    assert!(flagged[0].details["activity"].as_str().unwrap().contains("403"));
    assert!(!app
        .state
        .security
        .recent(10)
        .iter()
        .any(|e| e.kind == SecurityEventKind::DataAccess));
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let builder = ConfigBuilder::new()
        .with_api_rate_limit(RateLimitRule::new(100, 60))
        .with_playlist_rate_limit(RateLimitRule::new(2, 60));
    let app = test_app_with(MockCatalog::default(), builder).await;

    for _ in 0..2 {
        let (status, _) = send(&app, request("GET", "/api/hidden-playlists", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/hidden-playlists", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["X-RateLimit-Limit"], "2");
    assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    assert!(response.headers().contains_key("X-RateLimit-Reset"));
    assert_security_headers(response.headers());

    // Other paths have their own window
    let (status, _) = send(&app, request("GET", &format!("/api/vid-intervals?videoId={}", VIDEO), None)).await;
    assert_eq!(status, StatusCode::OK);

    let events = app.state.security.recent(10);
    assert!(events.iter().any(|e| e.kind == SecurityEventKind::RateLimitExceeded));
}

#[tokio::test]
async fn test_rate_limit_can_be_disabled() {
    let builder = ConfigBuilder::new()
        .with_api_rate_limit(RateLimitRule::new(1, 60))
        .enable_rate_limiting(false);
    let app = test_app_with(MockCatalog::default(), builder).await;

    for _ in 0..3 {
        let (status, _) = send(&app, request("GET", "/api/hidden-playlists", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
