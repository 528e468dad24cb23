//! In-process sliding-window limiter.
//!
//! Each key owns an ordered list of request timestamps (epoch ms). On every
//! check the list is purged of timestamps older than the window, compared
//! against the limit, and appended to when allowed. The whole sequence runs
//! under the DashMap shard lock for that key, so concurrent checks on one key
//! can never admit more than `max_requests` per window.
//!
//! Expired state for keys that stop receiving traffic is reclaimed by a
//! sweep piggybacking on regular checks, at most once per cleanup interval.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::{RateLimitConfig, RateLimitDecision, RateLimitKey, RateLimitStore};

/// Timestamps recorded for one key
#[derive(Debug)]
struct RateLimitEntry {
    /// Non-decreasing epoch-ms timestamps, oldest first
    timestamps: VecDeque<u64>,
    /// Window of the last config applied; lets the sweep purge without it
    window_ms: u64,
}

impl RateLimitEntry {
    fn new(window_ms: u64) -> Self {
        Self {
            timestamps: VecDeque::new(),
            window_ms,
        }
    }

    /// Drop timestamps strictly older than `now - window`.
    fn purge(&mut self, now: u64) {
        let cutoff = now.saturating_sub(self.window_ms);
        while self.timestamps.front().is_some_and(|&t| t < cutoff) {
            self.timestamps.pop_front();
        }
    }
}

/// Sliding-window rate limiter backed by process memory.
pub struct SlidingWindowLimiter {
    entries: DashMap<RateLimitKey, RateLimitEntry>,
    clock: Arc<dyn Clock>,
    cleanup_interval_ms: u64,
    last_sweep_ms: AtomicU64,
}

impl SlidingWindowLimiter {
    pub fn new(cleanup_interval: Duration) -> Self {
        Self::with_clock(cleanup_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(cleanup_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            entries: DashMap::new(),
            clock,
            cleanup_interval_ms: cleanup_interval.as_millis() as u64,
            last_sweep_ms: AtomicU64::new(now),
        }
    }

    /// Check and record one request for `key` at the current clock time.
    pub fn check_now(&self, key: &RateLimitKey, config: &RateLimitConfig) -> RateLimitDecision {
        let now = self.clock.now_ms();

        // Sweep before taking the entry guard: retain() locks every shard.
        self.maybe_sweep(now);

        let window_ms = config.window_ms();
        let max = config.max_requests as usize;

        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| RateLimitEntry::new(window_ms));
        entry.window_ms = window_ms;
        entry.purge(now);

        if entry.timestamps.len() >= max {
            let oldest = entry.timestamps.front().copied().unwrap_or(now);
            // oldest expires once now > oldest + window
            let wait_ms = oldest
                .saturating_add(window_ms)
                .saturating_add(1)
                .saturating_sub(now);
            let retry_after = wait_ms.div_ceil(1000).max(1);
            return RateLimitDecision::deny(retry_after);
        }

        let last = entry.timestamps.back().copied().unwrap_or(0);
        entry.timestamps.push_back(now.max(last));
        let remaining = max - entry.timestamps.len();
        RateLimitDecision::allow(remaining as u32)
    }

    /// Purge expired timestamps for every key and drop empty entries.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now_ms())
    }

    fn sweep_at(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.purge(now);
            !entry.timestamps.is_empty()
        });
        before.saturating_sub(self.entries.len())
    }

    /// Run a sweep if more than the cleanup interval has passed since the
    /// last one. Only the caller that wins the CAS sweeps.
    fn maybe_sweep(&self, now: u64) {
        let last = self.last_sweep_ms.load(Ordering::Acquire);
        if now.saturating_sub(last) <= self.cleanup_interval_ms {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let removed = self.sweep_at(now);
        debug!(
            removed,
            tracked = self.entries.len(),
            "[RATE_LIMIT] swept expired entries"
        );
    }

    /// Number of keys currently holding state
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Requests recorded for `key` (expired ones included until purged)
    pub fn recorded(&self, key: &RateLimitKey) -> usize {
        self.entries
            .get(key)
            .map(|entry| entry.timestamps.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RateLimitStore for SlidingWindowLimiter {
    async fn check(&self, key: &RateLimitKey, config: &RateLimitConfig) -> RateLimitDecision {
        self.check_now(key, config)
    }
}
