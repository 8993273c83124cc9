//! Error types for floodlog-store.

use floodlog_types::FormatError;

/// Result type for floodlog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in floodlog-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No blob exists under the key. Drives control flow (bootstrap, create).
    #[error("Blob not found: {key}")]
    NotFound { key: String },

    /// The backend rejected a read or write.
    #[error("Storage error for {key}: {message}")]
    Storage { key: String, message: String },

    /// Filesystem error.
    #[error("IO error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport error talking to an object store.
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A stored dayfile could not be decoded.
    #[error("Malformed dayfile {key}: {source}")]
    Format {
        key: String,
        #[source]
        source: FormatError,
    },

    /// A dayfile could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key is not a plain file name.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid object store URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Whether this error only reports a missing blob.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
