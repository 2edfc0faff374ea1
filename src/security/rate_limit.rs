//! Fixed-window request counting keyed by client and path

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Longest window a rule may configure: one day
pub const MAX_WINDOW_SECONDS: u64 = 24 * 60 * 60;

/// How many requests a key may make per window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl RateLimitRule {
    pub const fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    /// Sign-in attempts: 5 per 5 minutes
    pub const fn auth() -> Self {
        Self::new(5, 5 * 60)
    }

    /// General API traffic: 100 per minute
    pub const fn api() -> Self {
        Self::new(100, 60)
    }

    /// Catalog browsing: 50 per minute
    pub const fn playlist() -> Self {
        Self::new(50, 60)
    }

    /// Whether the window fits within `MAX_WINDOW_SECONDS`
    pub fn has_bounded_window(&self) -> bool {
        self.window_seconds <= MAX_WINDOW_SECONDS
    }

    fn window(&self) -> Duration {
        let seconds = self.window_seconds.min(MAX_WINDOW_SECONDS) as i64;
        Duration::try_seconds(seconds).unwrap_or_else(|| Duration::days(1))
    }

    fn reset_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.window()).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { limit: u32, reset_at: DateTime<Utc> },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    rule: RateLimitRule,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    /// Count one request for `key` at `now`
    ///
    /// The first request after a window expires opens a fresh window.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let window = windows
            .entry(key.to_string())
            .and_modify(|w| {
                if now > w.reset_at {
                    *w = Window {
                        count: 0,
                        reset_at: self.rule.reset_after(now),
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                reset_at: self.rule.reset_after(now),
            });

        if window.count >= self.rule.max_requests {
            debug!("Rate limit hit for {} ({} requests)", key, window.count);
            return RateDecision::Limited {
                limit: self.rule.max_requests,
                reset_at: window.reset_at,
            };
        }

        window.count += 1;
        RateDecision::Allowed {
            remaining: self.rule.max_requests - window.count,
        }
    }

    /// Drop windows that have expired; returns how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = windows.len();
        windows.retain(|_, w| w.reset_at >= now);
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}
