//! Bounded in-memory log of security-relevant events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventKind {
    AuthFailure,
    RateLimitExceeded,
    ValidationFailure,
    DataAccess,
    SuspiciousActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: SecurityEventKind,
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub details: serde_json::Value,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
pub struct SecurityLog {
    capacity: usize,
    events: Arc<Mutex<VecDeque<SecurityEvent>>>,
}

impl Default for SecurityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SecurityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)))),
        }
    }

    /// Append an event, evicting the oldest once full
    pub fn record(&self, event: SecurityEvent) {
        match event.severity {
            Severity::Critical | Severity::High => error!(
                kind = ?event.kind,
                user_id = event.user_id.as_deref(),
                ip = event.ip.as_deref(),
                "🚨 Security event: {}",
                event.details
            ),
            Severity::Medium => warn!(
                kind = ?event.kind,
                user_id = event.user_id.as_deref(),
                ip = event.ip.as_deref(),
                "⚠️ Security event: {}",
                event.details
            ),
            Severity::Low => info!(
                kind = ?event.kind,
                user_id = event.user_id.as_deref(),
                "🔐 Security event: {}",
                event.details
            ),
        }

        let mut events = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    fn push(
        &self,
        kind: SecurityEventKind,
        severity: Severity,
        user_id: Option<&str>,
        ip: Option<&str>,
        details: serde_json::Value,
    ) {
        self.record(SecurityEvent {
            timestamp: Utc::now(),
            kind,
            user_id: user_id.map(str::to_string),
            ip: ip.map(str::to_string),
            details,
            severity,
        });
    }

    pub fn auth_failure(&self, ip: Option<&str>, reason: &str) {
        self.push(
            SecurityEventKind::AuthFailure,
            Severity::Medium,
            None,
            ip,
            serde_json::json!({ "reason": reason }),
        );
    }

    pub fn rate_limit_exceeded(&self, ip: Option<&str>, path: &str) {
        self.push(
            SecurityEventKind::RateLimitExceeded,
            Severity::Medium,
            None,
            ip,
            serde_json::json!({ "path": path }),
        );
    }

    pub fn validation_failure(&self, user_id: Option<&str>, field: &str, value: &str) {
        self.push(
            SecurityEventKind::ValidationFailure,
            Severity::Low,
            user_id,
            None,
            serde_json::json!({ "field": field, "value": value }),
        );
    }

    pub fn data_access(&self, user_id: &str, resource: &str, action: &str) {
        self.push(
            SecurityEventKind::DataAccess,
            Severity::Low,
            Some(user_id),
            None,
            serde_json::json!({ "resource": resource, "action": action }),
        );
    }

    pub fn suspicious_activity(&self, user_id: Option<&str>, ip: Option<&str>, activity: &str) {
        self.push(
            SecurityEventKind::SuspiciousActivity,
            Severity::High,
            user_id,
            ip,
            serde_json::json!({ "activity": activity }),
        );
    }

    /// Up to `limit` most recent events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        let events = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<SecurityEvent> {
        let events = self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        events.iter().filter(|e| e.severity == severity).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
