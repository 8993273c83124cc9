//! Scheduled sync of flood-monitoring readings into a dayfile archive.
//!
//! The service runs one sync cycle at startup and then one per poll
//! interval until stopped. A cycle that seeds an empty archive is an
//! ordinary cycle here: the next tick continues incrementally.
//!
//! # Configuration
//!
//! The service reads the shared configuration (see
//! [`floodlog_core::config`]) from `~/.config/floodlog/config.toml` or
//! `--config`, overlaid with environment variables:
//!
//! ```toml
//! measure_id = "2067-level-stage-i-15_min-mASD"
//!
//! [storage]
//! container = "hereford"
//! endpoint = "https://storage.example.com"
//! token = "..."
//!
//! [sync]
//! poll_interval = 900
//! ```

pub mod scheduler;

pub use scheduler::{FailureLevel, FailureTracker, RunStats, Scheduler};
