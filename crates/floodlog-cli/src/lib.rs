//! Command-line interface for the floodlog river-level archive.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sync` | Run one sync cycle; seeds an empty archive |
//! | `status` | Show the most recent dayfile and the cursor |
//! | `convert` | Turn a flood archive CSV export into a dayfile |
//!
//! # Configuration
//!
//! `sync` and `status` read the same configuration as the service (see
//! [`floodlog_core::config`]): an optional TOML file given with `--config`
//! or found at the default path, overlaid with `MEASURE_ID`, `BUCKET`,
//! `LOG_LEVEL` and the `FLOODLOG_*` variables. `--dir` points either command
//! at a local archive directory instead of the configured storage.
//!
//! # Logging
//!
//! Logs go to stderr so that `convert` output can be piped. `RUST_LOG`
//! takes precedence over the configured level; `-v` and `-q` override both.

pub mod cli;
pub mod commands;
