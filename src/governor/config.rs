use std::time::Duration;

use super::backoff::Backoff;
use super::constants::{
    BATCH_PAUSE, BATCH_SIZE, CACHE_TIMEOUT, GLOBAL_REQUEST_LIMIT, GLOBAL_WINDOW,
    MIN_REQUEST_INTERVAL,
};
use super::RequestGovernor;
use crate::core::Error;

/// Limits applied by a [`RequestGovernor`].
#[derive(Clone, Debug, PartialEq)]
pub struct GovernorConfig {
    /// Maximum dispatches across all endpoints within one global window.
    pub global_request_limit: u32,
    /// Length of the global window.
    pub global_window: Duration,
    /// Starting spacing between two dispatches to the same endpoint.
    pub min_request_interval: Duration,
    /// How long a successful `GET` result is served from the cache.
    pub cache_timeout: Duration,
    /// Maximum number of requests `batch` dispatches concurrently.
    pub batch_size: usize,
    /// Pause between the end of one batch group and the start of the next.
    pub batch_pause: Duration,
    /// How the spacing grows when the server answers 429.
    pub backoff: Backoff,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            global_request_limit: GLOBAL_REQUEST_LIMIT,
            global_window: GLOBAL_WINDOW,
            min_request_interval: MIN_REQUEST_INTERVAL,
            cache_timeout: CACHE_TIMEOUT,
            batch_size: BATCH_SIZE,
            batch_pause: BATCH_PAUSE,
            backoff: Backoff::default(),
        }
    }
}

impl GovernorConfig {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.global_request_limit == 0 {
            return Err(Error::InvalidConfig(
                "global_request_limit must be at least 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.global_window.is_zero() {
            return Err(Error::InvalidConfig("global_window must be non-zero".into()));
        }
        Ok(())
    }
}

/* ----------------------- Builder ----------------------- */

/// Builder for [`RequestGovernor`]. Unset fields keep their [`GovernorConfig::default`] values.
#[derive(Debug, Default)]
pub struct RequestGovernorBuilder {
    config: GovernorConfig,
}

impl RequestGovernorBuilder {
    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: GovernorConfig) -> Self {
        Self { config }
    }

    /// Maximum dispatches per global window. Default: 10.
    #[must_use]
    pub fn global_request_limit(mut self, limit: u32) -> Self {
        self.config.global_request_limit = limit;
        self
    }

    /// Length of the global window. Default: 1s.
    #[must_use]
    pub fn global_window(mut self, dur: Duration) -> Self {
        self.config.global_window = dur;
        self
    }

    /// Starting per-endpoint spacing. Default: 1s.
    #[must_use]
    pub fn min_request_interval(mut self, dur: Duration) -> Self {
        self.config.min_request_interval = dur;
        self
    }

    /// Lifetime of cached `GET` results. Default: 30s.
    #[must_use]
    pub fn cache_timeout(mut self, dur: Duration) -> Self {
        self.config.cache_timeout = dur;
        self
    }

    /// Group size used by `batch`. Default: 3.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Pause between batch groups. Default: 200ms.
    #[must_use]
    pub fn batch_pause(mut self, dur: Duration) -> Self {
        self.config.batch_pause = dur;
        self
    }

    /// Spacing growth after throttled responses.
    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Build the governor.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the batch size, the global limit or the window is zero.
    pub fn build<T: Clone + Send>(self) -> Result<RequestGovernor<T>, Error> {
        self.config.validate()?;
        Ok(RequestGovernor::with_config(self.config))
    }
}
