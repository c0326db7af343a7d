//! Request governor: mediates every outbound API call.
//!
//! The governor enforces a global per-window request limit, a minimum spacing between
//! dispatches to the same endpoint key, caches successful `GET` results for a while, and
//! widens the spacing whenever the server answers `429 Too Many Requests`.
//!
//! It never retries and never wraps errors: a failure is observed, folded into the throttling
//! state, then handed back to the caller unchanged.
//!
//! All time is read through [`tokio::time::Instant`] and all waiting goes through
//! [`tokio::time::sleep`], so a paused tokio clock drives it deterministically in tests.

mod backoff;
mod batch;
mod config;
pub(crate) mod constants;
mod signal;
mod state;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use backoff::Backoff;
pub use batch::BatchRequest;
pub use config::{GovernorConfig, RequestGovernorBuilder};
pub use signal::RateLimitSignal;
use state::GovernorState;

/// A point-in-time view of the governor's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GovernorStats {
    /// Calls that reached the network.
    pub dispatched: u64,
    /// `GET` calls answered from the cache.
    pub cache_hits: u64,
    /// Calls that failed with a rate-limit signal.
    pub rate_limited: u64,
    /// Cache entries currently held, expired ones included.
    pub cache_entries: usize,
    /// Endpoint keys with a recorded dispatch time.
    pub tracked_endpoints: usize,
    /// Spacing currently enforced between dispatches to one endpoint.
    pub min_request_interval: Duration,
}

#[derive(Debug)]
struct Inner<T> {
    config: GovernorConfig,
    state: Mutex<GovernorState<T>>,
}

/// Shared handle to one governor. Clones share the same limits, cache and counters.
///
/// `T` is the payload produced by the wrapped calls; it must be `Clone` so cached reads can be
/// handed out more than once.
#[derive(Debug)]
pub struct RequestGovernor<T = serde_json::Value> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RequestGovernor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RequestGovernor {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> RequestGovernorBuilder {
        RequestGovernorBuilder::default()
    }
}

impl<T: Clone + Send> Default for RequestGovernor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> RequestGovernor<T> {
    /// A governor with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GovernorConfig::default())
    }

    pub(crate) fn with_config(config: GovernorConfig) -> Self {
        let state = GovernorState::new(Instant::now(), config.min_request_interval);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// The limits this governor was built with.
    pub fn config(&self) -> &GovernorConfig {
        &self.inner.config
    }

    /// Runs `perform` once the global window and the spacing for `endpoint_key` allow it.
    ///
    /// For `GET`, a cached result younger than the cache timeout is returned instead of calling
    /// `perform`, and a successful result is cached. A failure that reports HTTP 429 grows the
    /// shared spacing and evicts the cached entry for `endpoint_key`. Every error is returned
    /// unchanged.
    ///
    /// # Errors
    /// Whatever `perform` fails with.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, method, perform), fields(method = %method)))]
    pub async fn throttle<F, Fut, E>(
        &self,
        endpoint_key: &str,
        method: &Method,
        perform: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitSignal,
    {
        let config = &self.inner.config;
        let cacheable = *method == Method::GET;

        loop {
            let wait = {
                let mut state = self.inner.state.lock().await;
                let now = Instant::now();
                match state.admission_delay(endpoint_key, now, config) {
                    Some(wait) => wait,
                    None => {
                        if cacheable
                            && let Some(hit) = state.cached(endpoint_key, now, config.cache_timeout)
                        {
                            state.cache_hits += 1;
                            #[cfg(feature = "tracing")]
                            tracing::debug!(endpoint_key, "served from cache");
                            return Ok(hit);
                        }
                        state.record_dispatch(endpoint_key, now);
                        break;
                    }
                }
            };
            #[cfg(feature = "tracing")]
            tracing::debug!(endpoint_key, wait_ms = wait.as_millis() as u64, "suspending dispatch");
            tokio::time::sleep(wait).await;
        }

        match perform().await {
            Ok(payload) => {
                if cacheable {
                    let mut state = self.inner.state.lock().await;
                    state.store(endpoint_key, payload.clone(), Instant::now());
                }
                Ok(payload)
            }
            Err(e) => {
                if e.is_rate_limited() {
                    let mut state = self.inner.state.lock().await;
                    let _interval = state.record_rate_limited(endpoint_key, config);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        endpoint_key,
                        attempts = state.attempts(endpoint_key),
                        interval_ms = _interval.as_millis() as u64,
                        "server throttled request; widening spacing"
                    );
                }
                Err(e)
            }
        }
    }

    /// Evicts the cached result for `endpoint_key`, or every cached result when `None`.
    pub async fn clear_cache(&self, endpoint_key: Option<&str>) {
        self.inner.state.lock().await.clear_cache(endpoint_key);
    }

    /// Drops all attempt counters and puts the spacing back to the configured starting value.
    ///
    /// The governor never does this on its own; successful calls leave the backoff in place.
    pub async fn reset_backoff(&self) {
        let base = self.inner.config.min_request_interval;
        self.inner.state.lock().await.reset_backoff(base);
    }

    /// A fresh cached payload for `endpoint_key`, without touching any counter.
    pub async fn cached(&self, endpoint_key: &str) -> Option<T> {
        let state = self.inner.state.lock().await;
        state.cached(endpoint_key, Instant::now(), self.inner.config.cache_timeout)
    }

    /// The spacing currently enforced between two dispatches to the same endpoint.
    pub async fn min_request_interval(&self) -> Duration {
        self.inner.state.lock().await.min_request_interval()
    }

    /// Consecutive throttled responses recorded for `endpoint_key`.
    pub async fn attempts(&self, endpoint_key: &str) -> u32 {
        self.inner.state.lock().await.attempts(endpoint_key)
    }

    /// Counters and sizes at this moment.
    pub async fn stats(&self) -> GovernorStats {
        let state = self.inner.state.lock().await;
        GovernorStats {
            dispatched: state.dispatched,
            cache_hits: state.cache_hits,
            rate_limited: state.rate_limited,
            cache_entries: state.cache_len(),
            tracked_endpoints: state.tracked_endpoints(),
            min_request_interval: state.min_request_interval(),
        }
    }
}
