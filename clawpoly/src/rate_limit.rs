//! Fixed-window rate limiting keyed by caller.
//!
//! Each caller key gets one counter per window. The first request after a
//! window elapses starts a fresh window instead of carrying the old count.
//! Expired entries are purged lazily, at most once per cleanup interval.
//!
//! State is held in memory and is per-instance: several replicas behind a
//! load balancer each enforce their own budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::timestamp::now_millis;

/// How often expired windows are purged.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A request budget: at most `max_requests` per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimitPolicy {
    /// Budget applied to paid search endpoints: 30 per minute.
    pub const PAID: Self = Self::per_minute(30);
    /// Budget applied to free endpoints: 60 per minute.
    pub const FREE: Self = Self::per_minute(60);

    /// `max_requests` per 60 seconds.
    #[must_use]
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_ms: 60_000,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::PAID
    }
}

/// Result of counting one request against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request fits within the budget.
    pub allowed: bool,
    /// Requests left in this window; zero once the budget is exhausted.
    pub remaining: u32,
    /// Epoch milliseconds at which the window resets.
    pub reset_at_ms: u64,
    /// Budget the request was counted against.
    pub limit: u32,
}

impl RateLimitDecision {
    /// Window reset as epoch seconds, rounded up.
    #[must_use]
    pub const fn reset_at_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }

    /// Seconds until the window resets, rounded up.
    #[must_use]
    pub const fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at_ms: u64,
}

impl RateLimitEntry {
    const fn fresh(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 0,
            reset_at_ms: now_ms.saturating_add(window_ms),
        }
    }
}

/// Shared fixed-window counter table.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    last_cleanup_ms: Arc<AtomicU64>,
    cleanup_interval_ms: u64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Creates an empty limiter with the default cleanup interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cleanup_interval(DEFAULT_CLEANUP_INTERVAL)
    }

    /// Creates an empty limiter that purges expired windows every `interval`.
    #[must_use]
    pub fn with_cleanup_interval(interval: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            last_cleanup_ms: Arc::new(AtomicU64::new(now_millis())),
            cleanup_interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Counts one request for `key` against `policy` at the current time.
    pub fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, now_millis())
    }

    /// Counts one request for `key` at an explicit clock reading.
    pub fn check_at(&self, key: &str, policy: RateLimitPolicy, now_ms: u64) -> RateLimitDecision {
        self.maybe_purge(now_ms);

        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| RateLimitEntry::fresh(now_ms, policy.window_ms));
        if entry.reset_at_ms <= now_ms {
            *entry = RateLimitEntry::fresh(now_ms, policy.window_ms);
        }
        entry.count = entry.count.saturating_add(1);

        let allowed = entry.count <= policy.max_requests;
        let decision = RateLimitDecision {
            allowed,
            remaining: if allowed {
                policy.max_requests - entry.count
            } else {
                0
            },
            reset_at_ms: entry.reset_at_ms,
            limit: policy.max_requests,
        };
        drop(entry);

        #[cfg(feature = "telemetry")]
        if !allowed {
            tracing::debug!(key, reset_at_ms = decision.reset_at_ms, "rate limit exceeded");
        }
        decision
    }

    /// Number of live keys, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn maybe_purge(&self, now_ms: u64) {
        let last = self.last_cleanup_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < self.cleanup_interval_ms {
            return;
        }
        if self
            .last_cleanup_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        self.entries.retain(|_, entry| entry.reset_at_ms > now_ms);
    }
}

/// Derives the limiter key for a caller: the wallet address when supplied,
/// otherwise the client IP.
#[must_use]
pub fn rate_limit_key(ip: &str, wallet: Option<&str>) -> String {
    match wallet.map(str::trim).filter(|w| !w.is_empty()) {
        Some(wallet) => format!("addr:{}", wallet.to_lowercase()),
        None => format!("ip:{ip}"),
    }
}
