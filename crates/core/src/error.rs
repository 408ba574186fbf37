//! Unified error types for rptrbook.
//!
//! `Error` is the base error of the library; every fallible public operation
//! returns it. Display strings carry an upper-case code prefix so log lines
//! and CLI output can be grepped by category.

use std::path::PathBuf;

use tokio_rusqlite::rusqlite;

use crate::query::Endpoint;

/// Unified error types for the rptrbook library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream returned an error envelope, a malformed body, or the HTTP layer failed.
    #[error("API_ERROR: {endpoint}: {message}")]
    Api { endpoint: Endpoint, message: String },

    /// A payload element failed conversion or a domain invariant.
    #[error("VALIDATION_ERROR: {0}")]
    Validation(#[from] ValidationError),

    /// Reading or writing a cache file failed.
    #[error("CACHE_ERROR: {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local store operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Caller input that cannot be turned into a query.
    #[error("INVALID_QUERY: {0}")]
    InvalidQuery(String),
}

/// A single record failed field conversion or a range invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("record {}: field `{field}`: {reason}", record_id.map_or_else(|| "?".to_string(), |id| id.to_string()))]
pub struct ValidationError {
    /// Id of the offending record, when it could be read.
    pub record_id: Option<i64>,
    /// Upstream or domain field name.
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(record_id: Option<i64>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { record_id, field: field.into(), reason: reason.into() }
    }
}

impl Error {
    /// Build an `Api` error for `endpoint`.
    pub fn api(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Error::Api { endpoint, message: message.into() }
    }

    /// Build a `Cache` error for `path`.
    pub fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Cache { path: path.into(), source }
    }

    /// Whether this is a cache failure that callers may degrade to a miss.
    pub fn is_cache(&self) -> bool {
        matches!(self, Error::Cache { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::api(Endpoint::RestOfWorld, "Rate limited");
        assert!(err.to_string().contains("API_ERROR"));
        assert!(err.to_string().contains("exportROW"));
        assert!(err.to_string().contains("Rate limited"));
    }

    #[test]
    fn test_validation_error_names_record_and_field() {
        let err: Error = ValidationError::new(Some(42), "Lat", "must be between -90 and 90").into();
        let msg = err.to_string();
        assert!(msg.starts_with("VALIDATION_ERROR"));
        assert!(msg.contains("record 42"));
        assert!(msg.contains("`Lat`"));
    }

    #[test]
    fn test_validation_error_without_id() {
        let err = ValidationError::new(None, "Rptr ID", "missing");
        assert!(err.to_string().contains("record ?"));
    }

    #[test]
    fn test_cache_error_carries_path() {
        let err = Error::cache("/tmp/cache/abc.json", std::io::Error::other("disk full"));
        assert!(err.is_cache());
        assert!(err.to_string().contains("/tmp/cache/abc.json"));
        assert!(err.to_string().contains("disk full"));
    }
}
