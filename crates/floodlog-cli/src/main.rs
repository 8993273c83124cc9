use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use floodlog_cli::cli::{Cli, Commands};
use floodlog_cli::commands::{cmd_convert, cmd_status, cmd_sync};
use floodlog_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let logging = Logging {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    match cli.command {
        // convert works on stdin alone and must not fail on a broken config
        Commands::Convert { measure } => {
            logging.init("info");
            cmd_convert(&measure)
        }
        Commands::Sync(args) => {
            let config = load_config(cli.config.as_deref())?;
            logging.init(config.log_filter());
            cmd_sync(args, config).await
        }
        Commands::Status(args) => {
            let config = load_config(cli.config.as_deref())?;
            logging.init(config.log_filter());
            cmd_status(args, config).await
        }
    }
}

struct Logging {
    quiet: bool,
    verbose: bool,
}

impl Logging {
    /// Quiet and verbose win over `RUST_LOG`, which wins over `level`.
    fn init(&self, level: &str) {
        let filter = if self.quiet {
            EnvFilter::new("warn")
        } else if self.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config
        .apply_env()
        .context("Failed to apply environment overrides")?;
    Ok(config)
}
