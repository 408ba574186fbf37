//! Transport error types.

use std::sync::Arc;

use rptrbook_core::{Endpoint, Error};

/// Errors from the HTTP transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Non-success HTTP status.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// The HTTP client could not be built.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    /// Map into the library error for a request to `endpoint`.
    pub fn into_api(self, endpoint: Endpoint) -> Error {
        Error::api(endpoint, self.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TransportError::Timeout } else { TransportError::Network(Arc::new(err)) }
    }
}
