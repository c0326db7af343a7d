//! billable-client: async client for the Billable time-tracking and invoicing API.
//!
//! Every call made through [`ApiClient`] passes a [`RequestGovernor`], which spaces requests per
//! endpoint, bounds the global request rate, caches reads for a short while and backs off when
//! the server answers `429 Too Many Requests`. The governor is also usable on its own in front of
//! any async call.

pub mod core;
pub mod governor;

pub use crate::core::{ApiClient, ApiClientBuilder, Error, Result};
pub use crate::governor::{
    Backoff, BatchRequest, GovernorConfig, GovernorStats, RateLimitSignal, RequestGovernor,
    RequestGovernorBuilder,
};

#[cfg(feature = "tracing-subscriber")]
/// Installs a `fmt` subscriber honoring `RUST_LOG`. Dev-only convenience for demos and tests.
pub fn init_tracing_for_tests() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
