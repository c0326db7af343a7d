//! Core components of the `billable-client` crate.
//!
//! - The main [`ApiClient`] and its builder.
//! - The primary [`Error`] type.

/// The API client (`ApiClient`), builder, and defaults.
pub mod client;
/// The primary error type (`Error`) for the crate.
pub mod error;

// convenient re-exports so most code can just `use crate::core::Error`
pub use client::{ApiClient, ApiClientBuilder};
pub use error::{Error, Result};
