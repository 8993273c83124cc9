//! Dayfile persistence for the floodlog archive.
//!
//! This crate stores one JSON document per calendar day ("dayfile") in a
//! key/value [`Blobstore`], and implements the read-modify-write and search
//! logic the sync engine relies on.
//!
//! # Features
//!
//! - Local directory backend ([`FsBlobstore`]) with atomic replace on write
//! - Object store over HTTP ([`HttpBlobstore`]) for cloud deployments
//! - In-memory backend ([`MemoryBlobstore`]) for tests and dry runs
//! - Backward search for the most recent dayfile ([`DayfileStore::locate_most_recent`])
//! - Append-only merge with timestamp de-duplication ([`DayfileStore::merge_or_create`])
//!
//! # Example
//!
//! ```no_run
//! use floodlog_store::{DayfileStore, FsBlobstore, Located};
//! use floodlog_types::today_utc;
//!
//! # async fn example() -> floodlog_store::Result<()> {
//! let store = DayfileStore::new(FsBlobstore::new("./archive"));
//! match store.locate_most_recent(today_utc(), 7).await? {
//!     Located::Found(date) => println!("latest dayfile: {date}"),
//!     Located::ExhaustedSearch(oldest) => println!("nothing since {oldest}"),
//! }
//! # Ok(())
//! # }
//! ```

mod blobstore;
mod dayfile;
mod error;
mod fs;
mod http;
mod memory;

pub use blobstore::Blobstore;
pub use dayfile::{DEFAULT_SEARCH_LIMIT_DAYS, DayfileStore, Located, MergeOutcome};
pub use error::{Error, Result};
pub use fs::FsBlobstore;
pub use http::HttpBlobstore;
pub use memory::MemoryBlobstore;

/// Default archive directory following platform conventions.
///
/// Each storage container is a subdirectory of this one.
///
/// - Linux: `~/.local/share/floodlog`
/// - macOS: `~/Library/Application Support/floodlog`
/// - Windows: `C:\Users\<user>\AppData\Local\floodlog`
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("floodlog")
}
