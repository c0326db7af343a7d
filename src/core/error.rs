use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred during an HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL or request path could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A request body could not be encoded, or a response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success HTTP status code.
    ///
    /// `message` carries the `error` field of the server's JSON body when one was sent.
    #[error("Request failed with status {status} at {url}{}", detail(.message))]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
        /// The server-provided error message, if any.
        message: Option<String>,
    },

    /// A request path resolved outside the client's base URL (another host, or above the API root).
    #[error("path escapes the API base URL: {0}")]
    ForeignPath(String),

    /// A builder was given a value that cannot work (e.g. a batch size of zero).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// The HTTP status code behind this error, if the server produced one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
