//! Error types for floodlog-core.
//!
//! Every error ends the current sync cycle. Nothing is retried inside a
//! cycle; the scheduler (or the operator) runs the next cycle, which starts
//! again from whatever the archive holds.
//!
//! | Error | Meaning |
//! |-------|---------|
//! | [`Error::Source`] | The readings API could not be reached or refused the request |
//! | [`Error::Format`] | A timestamp or payload did not have the expected shape |
//! | [`Error::Storage`] | Reading or writing a dayfile failed |
//! | [`Error::Config`] | The configuration is incomplete or invalid |
//!
//! "Dayfile not found" is not an error at this level: the store turns it
//! into the bootstrap and create paths.

use floodlog_types::FormatError;

use crate::config::ConfigError;

/// Result type for floodlog-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a sync cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fetching readings failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Malformed timestamp or payload.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Dayfile storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] floodlog_store::Error),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while fetching readings from the API.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request could not be sent or the body could not be read.
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Invalid base URL or measure id.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
