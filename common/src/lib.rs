//! Shared error type and `Result` alias used across every crate in the workspace.

use std::result;
use thiserror::Error;

/// Our `Result` type, with a standardized error, for brevity
pub type Result<T> = result::Result<T, Error>;

/// Errors shared across the scanning, matching, extraction and exporting stages.
///
/// Kinds follow the error-handling design: configuration errors are fatal,
/// input-access errors are reported and the offending source is skipped, and
/// parse-time/user-code issues are attached to the event they occurred on
/// instead of aborting the run.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid regex, missing mandatory field, unknown option value.
    #[error("configuration error in {location}: {message}")]
    Configuration { location: String, message: String },

    /// Unreadable file or corrupt archive member -- the source is skipped, the run continues.
    #[error("input access error for '{path}': {message}")]
    InputAccess { path: String, message: String },

    /// Propagated std::io error, wrapped so callers can still match on `Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A user-code hook (`exec_on_*`) failed while processing a specific event.
    #[error("hook error on event '{event_name}' #{sequence_number}: {message}")]
    Hook { event_name: String, sequence_number: u64, message: String },

    /// Catch-all for anything that doesn't deserve its own variant.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Other(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Other(message.to_owned())
    }
}
