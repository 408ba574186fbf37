//! Structured errors for the rptrbook command line.

/// Errors raised by the command layer itself, as opposed to the library crates.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// An argument could not be interpreted.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No repeater with this id exists in the local database.
    #[error("NOT_FOUND: repeater {0}")]
    NotFound(i64),
}
