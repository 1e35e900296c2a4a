//! In-memory rate limiting for remote API calls.
//!
//! DESIGN
//! ======
//! Trailing-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by `api_<user id>`. Every check prunes timestamps older than the
//! window, rejects when the remaining count already meets the cap, and
//! otherwise records the call. Rejection happens before any network I/O.
//!
//! The limiter is an ordinary value handed to `ApiClient`; clones share the
//! same counters. Nothing is persisted, so a process restart resets quotas.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_REQUESTS: usize = 30;
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Message shown to the user when a call is rejected.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: DEFAULT_MAX_REQUESTS, window: Duration::from_millis(DEFAULT_WINDOW_MS) }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("{RATE_LIMIT_MESSAGE} (max {limit} requests/{window_ms}ms for {key})")]
    Exceeded { key: String, limit: usize, window_ms: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { requests: Arc::new(Mutex::new(HashMap::new())), config }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check the window for `key`, then record the call.
    ///
    /// # Errors
    ///
    /// Returns `Exceeded` when `max_requests` calls already fall inside the
    /// trailing window. Rejected calls are not recorded.
    pub fn check_and_record(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(key, Instant::now())
    }

    pub(crate) fn check_and_record_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let cfg = self.config;

        let deque = requests.entry(key.to_owned()).or_default();
        prune_window(deque, now, cfg.window);
        if deque.len() >= cfg.max_requests {
            return Err(RateLimitError::Exceeded {
                key: key.to_owned(),
                limit: cfg.max_requests,
                window_ms: u64::try_from(cfg.window.as_millis()).unwrap_or(u64::MAX),
            });
        }

        deque.push_back(now);
        Ok(())
    }

    /// Calls still available to `key` in the current window.
    #[must_use]
    pub fn remaining(&self, key: &str) -> usize {
        self.remaining_at(key, Instant::now())
    }

    pub(crate) fn remaining_at(&self, key: &str, now: Instant) -> usize {
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(deque) = requests.get_mut(key) else {
            return self.config.max_requests;
        };
        prune_window(deque, now, self.config.window);
        self.config.max_requests.saturating_sub(deque.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Limiter key for a user; unauthenticated calls share one bucket.
#[must_use]
pub fn rate_limit_key(user_id: Option<&str>) -> String {
    format!("api_{}", user_id.unwrap_or("anonymous"))
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.saturating_duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
