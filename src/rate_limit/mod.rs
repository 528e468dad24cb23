//! Per-(user, action) sliding-window rate limiting.
//!
//! ## Components
//! - `clock`: injectable millisecond clock (`SystemClock`, `ManualClock`)
//! - `sliding_window`: in-process [`SlidingWindowLimiter`]
//!
//! Callers depend on the [`RateLimitStore`] trait only, so the in-memory
//! store can be replaced by a shared TTL-capable store when the gateway runs
//! as more than one instance. The in-memory store does NOT coordinate across
//! processes.

pub mod clock;
pub mod sliding_window;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sliding_window::SlidingWindowLimiter;

/// Identifies one sliding-window counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub identity: String,
    pub action: String,
}

impl RateLimitKey {
    pub fn new(identity: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity, self.action)
    }
}

/// Longest accepted window: one year
pub const MAX_WINDOW_SECONDS: u64 = 365 * 86_400;

/// Limit for one action: at most `max_requests` within `window_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    #[validate(range(min = 1))]
    pub max_requests: u32,
    #[validate(range(min = 1, max = MAX_WINDOW_SECONDS))]
    pub window_seconds: u64,
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_seconds.saturating_mul(1000)
    }
}

/// Outcome of a single [`RateLimitStore::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the window after this one
    pub remaining: u32,
    /// Seconds until the oldest request leaves the window (denied only)
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub fn allow(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after: None,
        }
    }

    pub fn deny(retry_after: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after: Some(retry_after),
        }
    }
}

/// Rate limit backing store.
///
/// An allowed check records the request; a denied check records nothing.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn check(&self, key: &RateLimitKey, config: &RateLimitConfig) -> RateLimitDecision;
}
