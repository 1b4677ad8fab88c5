//! Tracker error types.

/// Errors returned by tracker calls.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The requested issue or project does not exist (or is not visible).
    #[error("not found: {0}")]
    NotFound(String),

    /// The tracker rejected the configured credentials.
    #[error("tracker rejected credentials (HTTP {status})")]
    Unauthorized {
        /// HTTP status code returned.
        status: u16,
    },

    /// Any other non-success HTTP status.
    #[error("tracker returned HTTP {status} for {url}")]
    Http {
        /// HTTP status code returned.
        status: u16,
        /// The request URL, without credentials.
        url: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Convenience alias used throughout the tracker crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    /// Creates a [`TrackerError::Decode`] with the given message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
