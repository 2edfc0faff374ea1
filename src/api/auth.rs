//! Caller identity supplied by the upstream identity provider

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use chrono::Utc;

use super::{error::ApiError, server::AppState};
use crate::security::RateDecision;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller: the catalog access token and the local user id
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub access_token: String,
}

/// First `X-Forwarded-For` hop, or `"unknown"`
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn header_user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let reason = match (bearer_token(&parts.headers), header_user_id(&parts.headers)) {
            (Some(token), Some(user_id)) => {
                return Ok(AuthUser {
                    user_id: user_id.to_string(),
                    access_token: token.to_string(),
                })
            }
            (None, _) => "missing bearer token",
            (Some(_), None) => "missing user id",
        };

        let ip = client_ip(&parts.headers);
        state.security.auth_failure(Some(&ip), reason);

        // Failed attempts count against the `auth` rule per client
        if state.config.rate_limit.enabled {
            if let RateDecision::Limited { limit, reset_at } =
                state.auth_limiter.check(&format!("{}:auth", ip), Utc::now())
            {
                state.security.rate_limit_exceeded(Some(&ip), parts.uri.path());
                return Err(ApiError::RateLimited { limit, reset_at });
            }
        }

        Err(ApiError::Unauthorized)
    }
}
