//! Error types for data parsing in floodlog-types.

use thiserror::Error;

/// Errors raised when a timestamp, reading or dayfile does not have the
/// shape we expect.
///
/// A format error usually means the upstream API contract changed, so it is
/// never swallowed: callers log it and abort the current sync cycle.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// A `dateTime` value was not an ISO 8601 local date-time.
    #[error("Invalid timestamp '{input}': expected an ISO 8601 date-time")]
    InvalidTimestamp { input: String },

    /// A reading lacked one of the fields we keep.
    #[error("Missing required field '{field}' in reading: {reading}")]
    MissingField { field: &'static str, reading: String },

    /// The document as a whole could not be decoded.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type alias using floodlog-types' FormatError type.
pub type FormatResult<T> = std::result::Result<T, FormatError>;

impl From<serde_json::Error> for FormatError {
    fn from(err: serde_json::Error) -> Self {
        FormatError::InvalidPayload(err.to_string())
    }
}
