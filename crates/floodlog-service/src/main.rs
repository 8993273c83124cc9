//! floodlog service - scheduled sync into the dayfile archive.
//!
//! Run with: `cargo run -p floodlog-service`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use floodlog_core::{Blobstore, Config, DayfileStore, SyncEngine};
use floodlog_service::Scheduler;

/// floodlog service - keeps a dayfile archive in sync on a schedule.
#[derive(Parser, Debug)]
#[command(name = "floodlog-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "FLOODLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Seconds between cycles (overrides config).
    #[arg(short, long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.apply_env()?;

    // Override config with CLI args
    if let Some(interval) = args.interval {
        config.sync.poll_interval = interval;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter())),
        )
        .init();

    config.validate()?;

    let source = config
        .readings_source()
        .context("Failed to create API client")?;
    let blobs = config.open_blobstore().context("Failed to open archive")?;
    info!(
        "Archiving measure {} into {}",
        config.measure_id,
        blobs.describe()
    );
    let engine = SyncEngine::new(source, DayfileStore::new(blobs), config.sync_options());

    if args.once {
        let report = engine.run_cycle_now().await.context("Sync cycle failed")?;
        info!("Cycle wrote {} new reading(s)", report.readings_added());
        return Ok(());
    }

    let scheduler = Scheduler::new(engine, Duration::from_secs(config.sync.poll_interval));
    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl-C, shutting down");
        })
        .await;

    Ok(())
}
