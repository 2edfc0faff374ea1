//! Error type shared by every route, rendered as `{ "error": ... }`

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::error;

use crate::service::ServiceError;
use crate::store::StoreError;
use crate::youtube::CatalogError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited { limit: u32, reset_at: DateTime<Utc> },

    /// Catalog failure; non-2xx statuses are passed through
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn upstream(err: CatalogError, message: impl Into<String>) -> Self {
        ApiError::Upstream {
            status: err.status(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("❌ Request failed: {}", detail);
        }

        let status = self.status_code();
        let mut response = (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response();

        if let ApiError::RateLimited { limit, reset_at } = self {
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            if let Ok(reset) = HeaderValue::from_str(&reset_at.to_rfc3339_opts(SecondsFormat::Millis, true)) {
                headers.insert("X-RateLimit-Reset", reset);
            }
        }

        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            ServiceError::AlreadyExists => ApiError::Conflict(message),
            ServiceError::VideoNotFound => ApiError::NotFound(message),
            ServiceError::Catalog(e) => ApiError::upstream(e, "Failed to fetch YouTube video details"),
            ServiceError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(_: JsonRejection) -> Self {
        ApiError::bad_request("Invalid input")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(_: QueryRejection) -> Self {
        ApiError::bad_request("Invalid query parameters")
    }
}
