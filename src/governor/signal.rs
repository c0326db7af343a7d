use crate::core::Error;

/// Lets the governor tell a server-side throttling failure (HTTP 429) apart from any other error.
///
/// The governor never inspects errors beyond this; every error is handed back to the caller as-is.
pub trait RateLimitSignal {
    /// Returns `true` if this failure means the server asked us to slow down.
    fn is_rate_limited(&self) -> bool;
}

const TOO_MANY_REQUESTS: u16 = 429;

impl RateLimitSignal for Error {
    fn is_rate_limited(&self) -> bool {
        self.status() == Some(TOO_MANY_REQUESTS)
    }
}

impl RateLimitSignal for reqwest::Error {
    fn is_rate_limited(&self) -> bool {
        self.status().map(|s| s.as_u16()) == Some(TOO_MANY_REQUESTS)
    }
}

/// Opaque errors only carry a message; a message naming 429 counts as throttling.
impl RateLimitSignal for Box<dyn std::error::Error + Send + Sync> {
    fn is_rate_limited(&self) -> bool {
        self.to_string().contains("429")
    }
}

impl RateLimitSignal for String {
    fn is_rate_limited(&self) -> bool {
        self.contains("429")
    }
}
