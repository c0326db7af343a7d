//! Centralized constants for the default endpoint and UA.

/// Identifies this crate to the API server.
pub(crate) const USER_AGENT: &str = concat!("billable-client/", env!("CARGO_PKG_VERSION"));

/// API root of a locally running server (resource paths are appended).
pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";
