//! Request throttling and the security event log
//!
//! Both are plain values owned by the server state; nothing here is global.

pub mod events;
pub mod rate_limit;

pub use events::{SecurityEvent, SecurityEventKind, SecurityLog, Severity};
pub use rate_limit::{RateDecision, RateLimitRule, RateLimiter};
