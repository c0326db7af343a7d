//! Bookkeeping behind the governor: dispatch times, attempt counters, cached reads and the
//! global window. Everything here is synchronous; callers hold the governor lock around it.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::config::GovernorConfig;

#[derive(Debug)]
struct CacheEntry<T> {
    payload: T,
    captured_at: Instant,
}

#[derive(Debug)]
pub(crate) struct GovernorState<T> {
    last_dispatch: HashMap<String, Instant>,
    attempts: HashMap<String, u32>,
    cache: HashMap<String, CacheEntry<T>>,
    window_count: u32,
    window_start: Instant,
    min_request_interval: Duration,

    pub(crate) dispatched: u64,
    pub(crate) cache_hits: u64,
    pub(crate) rate_limited: u64,
}

impl<T: Clone> GovernorState<T> {
    pub(crate) fn new(now: Instant, min_request_interval: Duration) -> Self {
        Self {
            last_dispatch: HashMap::new(),
            attempts: HashMap::new(),
            cache: HashMap::new(),
            window_count: 0,
            window_start: now,
            min_request_interval,
            dispatched: 0,
            cache_hits: 0,
            rate_limited: 0,
        }
    }

    /// How long `key` must still wait before it may be dispatched, or `None` if it may go now.
    ///
    /// Resets the global window first when its boundary has been crossed.
    pub(crate) fn admission_delay(
        &mut self,
        key: &str,
        now: Instant,
        config: &GovernorConfig,
    ) -> Option<Duration> {
        if now.saturating_duration_since(self.window_start) >= config.global_window {
            self.window_count = 0;
            self.window_start = now;
        }
        if self.window_count >= config.global_request_limit {
            return Some(match self.window_start.checked_add(config.global_window) {
                Some(boundary) => boundary.saturating_duration_since(now),
                None => Duration::MAX,
            });
        }

        let last = self.last_dispatch.get(key)?;
        let elapsed = now.saturating_duration_since(*last);
        (elapsed < self.min_request_interval).then(|| self.min_request_interval - elapsed)
    }

    /// A cached payload for `key` that is still younger than `timeout`.
    pub(crate) fn cached(&self, key: &str, now: Instant, timeout: Duration) -> Option<T> {
        let entry = self.cache.get(key)?;
        (now.saturating_duration_since(entry.captured_at) < timeout).then(|| entry.payload.clone())
    }

    pub(crate) fn record_dispatch(&mut self, key: &str, now: Instant) {
        self.last_dispatch.insert(key.to_string(), now);
        self.window_count += 1;
        self.dispatched += 1;
    }

    pub(crate) fn store(&mut self, key: &str, payload: T, now: Instant) {
        self.cache.insert(
            key.to_string(),
            CacheEntry {
                payload,
                captured_at: now,
            },
        );
    }

    /// Applies a 429 for `key`: bumps its attempt counter, grows the shared interval and drops
    /// the cached read. Returns the interval now in force.
    pub(crate) fn record_rate_limited(&mut self, key: &str, config: &GovernorConfig) -> Duration {
        let attempts = self.attempts.entry(key.to_string()).or_insert(0);
        *attempts = attempts.saturating_add(1);
        let backoff = config.backoff.delay(*attempts);
        // never shrinks: another endpoint may already have pushed it further
        self.min_request_interval = self.min_request_interval.max(backoff);
        self.cache.remove(key);
        self.rate_limited += 1;
        self.min_request_interval
    }

    pub(crate) fn clear_cache(&mut self, key: Option<&str>) {
        match key {
            Some(k) => {
                self.cache.remove(k);
            }
            None => self.cache.clear(),
        }
    }

    pub(crate) fn reset_backoff(&mut self, base: Duration) {
        self.attempts.clear();
        self.min_request_interval = base;
    }

    pub(crate) fn min_request_interval(&self) -> Duration {
        self.min_request_interval
    }

    pub(crate) fn attempts(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }

    pub(crate) fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn tracked_endpoints(&self) -> usize {
        self.last_dispatch.len()
    }
}
