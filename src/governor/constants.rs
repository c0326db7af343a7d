//! Default limits for the request governor.

use std::time::Duration;

/// Requests allowed per global window, across all endpoints.
pub(crate) const GLOBAL_REQUEST_LIMIT: u32 = 10;

/// Length of the global admission window.
pub(crate) const GLOBAL_WINDOW: Duration = Duration::from_millis(1_000);

/// Starting spacing between two dispatches to the same endpoint.
pub(crate) const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1_000);

/// How long a successful read stays servable from the cache.
pub(crate) const CACHE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Requests dispatched together by `batch`.
pub(crate) const BATCH_SIZE: usize = 3;

/// Pause between two consecutive batch groups.
pub(crate) const BATCH_PAUSE: Duration = Duration::from_millis(200);

pub(crate) const BACKOFF_BASE: Duration = Duration::from_millis(1_000);
pub(crate) const BACKOFF_MAX: Duration = Duration::from_millis(30_000);
