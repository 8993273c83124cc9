//! Incremental sync of flood-monitoring readings into a dayfile archive.
//!
//! This crate ties a [`ReadingsSource`] to a
//! [`DayfileStore`](floodlog_store::DayfileStore): each [`SyncEngine`] cycle
//! finds the newest archived reading and fetches only what came after it.
//!
//! # Features
//!
//! - **Flood API client**: [`FloodApiSource`] talks to the Environment Agency
//!   flood-monitoring readings endpoint
//! - **Bootstrap**: an empty archive is seeded from a configured date
//! - **Idempotent cycles**: re-running a cycle never duplicates readings
//! - **Configuration**: TOML file plus environment overlay ([`Config`])
//! - **Testing**: [`MockSource`] serves readings from memory
//!
//! # Quick Start
//!
//! ```no_run
//! use floodlog_core::{FloodApiSource, SyncEngine, SyncOptions, DEFAULT_API_BASE};
//! use floodlog_store::{DayfileStore, FsBlobstore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FloodApiSource::new(DEFAULT_API_BASE, "2067-level-stage-i-15_min-mASD")?;
//!     let store = DayfileStore::new(FsBlobstore::new("./hereford"));
//!     let engine = SyncEngine::new(source, store, SyncOptions::default());
//!
//!     let report = engine.run_cycle_now().await?;
//!     println!("{} new reading(s)", report.readings_added());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod mock;
pub mod source;

pub use config::{Config, ConfigError, ValidationError, default_config_path};
pub use engine::{SyncEngine, SyncOptions, SyncOutcome, SyncReport};
pub use error::{Error, Result, SourceError};
pub use mock::MockSource;
pub use source::{
    DEFAULT_API_BASE, DEFAULT_PAGE_LIMIT, Fetched, FloodApiSource, ReadingsSource, USER_AGENT,
    page_limit, parse_readings_response,
};

// Re-exported so binaries need not depend on the lower crates directly
pub use floodlog_store::{Blobstore, DayfileStore, Located, MergeOutcome};
pub use floodlog_types::{Dayfile, Reading};
