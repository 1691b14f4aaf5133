// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Sliding-window rate limiting for login attempts.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use metrics::gauge;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitSettings;
use crate::metrics::RATE_LIMIT_TRACKED_KEYS;

/// Default number of attempts per window
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length (60 seconds)
const DEFAULT_WINDOW_SECS: i64 = 60;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Over the limit; the oldest attempt in the window ages out after this many seconds
    Denied { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Per-key sliding-window attempt counter.
///
/// Each key maps to the timestamps of its attempts inside the trailing window,
/// oldest first. Stale timestamps are dropped whenever the key is touched.
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of client keys to attempt timestamps
    attempts: DashMap<String, VecDeque<DateTime<Utc>>>,
    /// Maximum attempts allowed inside one window
    max_attempts: u32,
    /// Length of the trailing window
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::seconds(DEFAULT_WINDOW_SECS),
            Arc::new(SystemClock),
        )
    }
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_attempts: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            window,
            clock,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        Self::new(settings.max_attempts, crate::clock::seconds(settings.window_secs), clock)
    }

    /// Decide whether `key` may make another attempt, without recording one.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        match self.attempts.get_mut(key) {
            Some(mut entry) => {
                self.prune(&mut entry, now);
                self.decide(&entry, now)
            },
            None => RateDecision::Allowed,
        }
    }

    /// Record an attempt for `key` at the current time.
    pub fn record(&self, key: &str) {
        let now = self.clock.now();
        let mut entry = self.attempts.entry(key.to_string()).or_default();
        self.prune(&mut entry, now);
        entry.push_back(now);
    }

    /// Check and record in one step while holding the key's entry lock.
    ///
    /// An attempt is recorded only when it is allowed, so concurrent callers for
    /// the same key can never get more than `max_attempts` allowances per window.
    pub fn acquire(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        let mut entry = self.attempts.entry(key.to_string()).or_default();
        self.prune(&mut entry, now);

        let decision = self.decide(&entry, now);
        if decision.is_allowed() {
            entry.push_back(now);
        } else {
            debug!(client_key = key, attempts = entry.len(), "attempt denied by rate limiter");
        }
        decision
    }

    /// Number of attempts for `key` still inside the window
    pub fn attempts(&self, key: &str) -> usize {
        let now = self.clock.now();
        self.attempts.get(key).map_or(0, |entry| {
            entry.iter().filter(|ts| self.in_window(**ts, now)).count()
        })
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    /// Drop keys whose attempts have all aged out of the window.
    ///
    /// Returns the number of keys removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.attempts.len();

        self.attempts.retain(|_, entry| {
            self.prune(entry, now);
            !entry.is_empty()
        });

        let remaining = self.attempts.len();
        gauge!(RATE_LIMIT_TRACKED_KEYS).set(remaining as f64);
        before.saturating_sub(remaining)
    }

    /// Sweep every `interval` until the limiter is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(removed, "swept idle rate limit keys");
                }
            }
        })
    }

    fn in_window(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        ts > now - self.window
    }

    fn prune(&self, entry: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        while let Some(oldest) = entry.front() {
            if self.in_window(*oldest, now) {
                break;
            }
            entry.pop_front();
        }
    }

    fn decide(&self, entry: &VecDeque<DateTime<Utc>>, now: DateTime<Utc>) -> RateDecision {
        if entry.len() < self.max_attempts as usize {
            return RateDecision::Allowed;
        }
        // `record` may push a key past the limit, so the attempt that frees a
        // slot is the one `max_attempts` back from the newest, not the oldest
        let freeing = entry.len().checked_sub(self.max_attempts as usize);
        let retry_after_secs = match freeing.and_then(|index| entry.get(index)) {
            Some(freeing) => {
                let wait = (*freeing + self.window) - now;
                // Round up so clients never retry a moment too early
                let secs = (wait.num_milliseconds() + 999) / 1000;
                u64::try_from(secs).unwrap_or(0).max(1)
            },
            None => {
                // Only reachable with max_attempts == 0
                warn!("rate limiter configured to allow no attempts");
                u64::try_from(self.window.num_seconds()).unwrap_or(0).max(1)
            },
        };
        RateDecision::Denied { retry_after_secs }
    }
}
