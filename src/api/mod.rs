//! REST API for the playlist viewer
//!
//! Serves catalog browsing, watched progress, hidden playlists and
//! interval management to the web UI.

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, AppState};

/// API Server for handling REST requests
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start the API server in the background
    pub fn start_background(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on {}", self.state.config.server.bind_address());
        server::start_http_server(self.state).await
    }
}
