//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use time::Date;
use time::macros::format_description;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "floodlog")]
#[command(author, version, about = "Archive river-level readings as daily JSON files", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FLOODLOG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one sync cycle against the archive
    Sync(SyncCommand),

    /// Show the most recent dayfile and the sync cursor
    Status(StatusCommand),

    /// Convert a flood archive CSV on stdin into a dayfile on stdout
    Convert {
        /// Measure id whose readings are kept
        #[arg(value_name = "MEASURE")]
        measure: String,
    },
}

/// Archive location arguments shared by `sync` and `status`
#[derive(Debug, Clone, Args)]
pub struct ArchiveArgs {
    /// Local directory holding the dayfiles (overrides the configured storage)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Date to search back from, defaults to today (UTC)
    #[arg(long, value_parser = parse_date, value_name = "YYYY-MM-DD")]
    pub today: Option<Date>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct SyncCommand {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// First day to fetch when the archive is empty
    #[arg(long, value_parser = parse_date, value_name = "YYYY-MM-DD")]
    pub bootstrap_from: Option<Date>,
}

#[derive(Debug, Clone, Args)]
pub struct StatusCommand {
    #[command(flatten)]
    pub archive: ArchiveArgs,
}

/// Parse a `YYYY-MM-DD` argument.
pub fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid date '{}': {} (expected YYYY-MM-DD)", s, e))
}
