//! Platform-agnostic types for the floodlog river-level archive.
//!
//! This crate provides the shared vocabulary used by the store, the sync
//! engine and the command-line tools:
//!
//! - [`Reading`] - a single timestamped sensor value
//! - [`Dayfile`] - the JSON archive unit holding one calendar day of readings
//! - Timestamp helpers for the flood-monitoring API format (see [`timestamp`])
//! - [`FormatError`] for malformed timestamps and payloads
//!
//! # Example
//!
//! ```
//! use floodlog_types::{Dayfile, Reading, dayfile_key};
//! use time::macros::date;
//!
//! let dayfile = Dayfile::new(
//!     serde_json::json!({"source": "example"}),
//!     vec![Reading::new("2024-01-02T06:00:00Z", 1.3)],
//! );
//! assert_eq!(dayfile_key(date!(2024 - 01 - 02)), "2024-01-02.json");
//! assert_eq!(dayfile.items.len(), 1);
//! ```

pub mod error;
pub mod timestamp;
pub mod types;

pub use error::{FormatError, FormatResult};
pub use timestamp::{
    READING_INTERVAL_MINUTES, estimate_reading_count, estimate_reading_count_until_now,
    format_api_timestamp, now_utc, parse_api_timestamp, today_utc,
};
pub use types::{Dayfile, Reading, dayfile_key, derive_cursor, partition_by_day};
