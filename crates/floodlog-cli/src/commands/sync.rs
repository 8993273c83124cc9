//! Sync command - run one cycle against the archive.

use anyhow::{Context, Result};
use tracing::info;

use floodlog_core::{
    Blobstore, Config, DayfileStore, MergeOutcome, SyncEngine, SyncOutcome, SyncReport,
};
use floodlog_types::{dayfile_key, format_api_timestamp, today_utc};

use crate::cli::{OutputFormat, SyncCommand};

/// Execute the sync command.
///
/// Runs exactly one cycle. When the archive was empty the cycle only seeds
/// it; the next invocation continues incrementally.
pub async fn cmd_sync(args: SyncCommand, mut config: Config) -> Result<()> {
    if let Some(dir) = &args.archive.dir {
        super::use_local_dir(&mut config, dir)?;
    }
    if let Some(date) = args.bootstrap_from {
        config.sync.bootstrap_from = Some(date);
    }
    config.validate()?;

    let source = config
        .readings_source()
        .context("Failed to create API client")?;
    let blobs = config.open_blobstore().context("Failed to open archive")?;
    info!("Archive at {}", blobs.describe());

    let engine = SyncEngine::new(source, DayfileStore::new(blobs), config.sync_options());
    let today = args.archive.today.unwrap_or_else(today_utc);
    let report = engine
        .run_cycle(today)
        .await
        .context("Sync cycle failed")?;

    let content = match args.archive.format {
        OutputFormat::Json => format_report_json(&report)?,
        OutputFormat::Text => format_report_text(&report),
    };
    print!("{}", content);
    Ok(())
}

/// Format a cycle report as human-readable text.
pub fn format_report_text(report: &SyncReport) -> String {
    let mut out = match report.outcome {
        SyncOutcome::Bootstrapped { since } => format!(
            "Seeded empty archive with readings since {}\nRun sync again to continue incrementally\n",
            format_api_timestamp(since)
        ),
        SyncOutcome::Synced { cursor } => {
            format!("Synced readings since {}\n", format_api_timestamp(cursor))
        }
    };

    for (date, outcome) in &report.days {
        let line = match outcome {
            MergeOutcome::Created { added } => format!("created, {} reading(s)", added),
            MergeOutcome::Updated {
                added,
                skipped,
                total,
            } => format!(
                "updated, +{} reading(s), {} duplicate(s), {} total",
                added, skipped, total
            ),
            MergeOutcome::Unchanged { skipped } => {
                format!("unchanged, {} duplicate(s)", skipped)
            }
        };
        out.push_str(&format!("  {}  {}\n", dayfile_key(*date), line));
    }

    out.push_str(&format!("New readings: {}\n", report.readings_added()));
    out
}

/// Format a cycle report as pretty-printed JSON.
pub fn format_report_json(report: &SyncReport) -> Result<String> {
    let (outcome, since) = match report.outcome {
        SyncOutcome::Bootstrapped { since } => ("bootstrapped", since),
        SyncOutcome::Synced { cursor } => ("synced", cursor),
    };

    let days: Vec<_> = report
        .days
        .iter()
        .map(|(date, merge)| {
            let (status, skipped, total) = match *merge {
                MergeOutcome::Created { added } => ("created", 0, Some(added)),
                MergeOutcome::Updated { skipped, total, .. } => ("updated", skipped, Some(total)),
                MergeOutcome::Unchanged { skipped } => ("unchanged", skipped, None),
            };
            serde_json::json!({
                "date": date.to_string(),
                "key": dayfile_key(*date),
                "status": status,
                "added": merge.added(),
                "skipped": skipped,
                "total": total,
            })
        })
        .collect();

    let result = serde_json::json!({
        "outcome": outcome,
        "since": format_api_timestamp(since),
        "readings_added": report.readings_added(),
        "days": days,
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&result)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn synced_report() -> SyncReport {
        SyncReport {
            outcome: SyncOutcome::Synced {
                cursor: datetime!(2024-01-02 06:00),
            },
            days: vec![
                (
                    date!(2024 - 01 - 02),
                    MergeOutcome::Updated {
                        added: 71,
                        skipped: 1,
                        total: 96,
                    },
                ),
                (date!(2024 - 01 - 03), MergeOutcome::Created { added: 8 }),
            ],
        }
    }

    #[test]
    fn test_format_report_text_synced() {
        let text = format_report_text(&synced_report());
        assert!(text.starts_with("Synced readings since 2024-01-02T06:00:00Z\n"));
        assert!(text.contains(
            "  2024-01-02.json  updated, +71 reading(s), 1 duplicate(s), 96 total\n"
        ));
        assert!(text.contains("  2024-01-03.json  created, 8 reading(s)\n"));
        assert!(text.ends_with("New readings: 79\n"));
    }

    #[test]
    fn test_format_report_text_bootstrap() {
        let report = SyncReport {
            outcome: SyncOutcome::Bootstrapped {
                since: datetime!(2024-01-01 00:00),
            },
            days: Vec::new(),
        };
        let text = format_report_text(&report);
        assert!(text.contains("Seeded empty archive with readings since 2024-01-01T00:00:00Z"));
        assert!(text.contains("Run sync again"));
        assert!(text.ends_with("New readings: 0\n"));
    }

    #[test]
    fn test_format_report_json() {
        let json = format_report_json(&synced_report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["outcome"], "synced");
        assert_eq!(parsed["since"], "2024-01-02T06:00:00Z");
        assert_eq!(parsed["readings_added"], 79);
        assert_eq!(parsed["days"][0]["key"], "2024-01-02.json");
        assert_eq!(parsed["days"][0]["status"], "updated");
        assert_eq!(parsed["days"][0]["skipped"], 1);
        assert_eq!(parsed["days"][1]["status"], "created");
        assert_eq!(parsed["days"][1]["total"], 8);
    }
}
