//! Status command implementation.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use time::Date;

use floodlog_core::{Blobstore, Config, DayfileStore, Located};
use floodlog_types::{dayfile_key, format_api_timestamp, today_utc};

use crate::cli::{OutputFormat, StatusCommand};

/// Where the archive stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveStatus {
    /// Human-readable archive location.
    pub location: String,
    /// Key of the most recent dayfile, if any was found.
    pub latest: Option<String>,
    /// Readings in the most recent dayfile.
    pub readings: usize,
    /// Timestamp the next sync will fetch from.
    pub cursor: Option<String>,
    /// Oldest date probed by the search.
    pub searched_back_to: String,
}

pub async fn cmd_status(args: StatusCommand, mut config: Config) -> Result<()> {
    if let Some(dir) = &args.archive.dir {
        super::use_local_dir(&mut config, dir)?;
    }

    let errors = config.storage.validate();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid storage configuration: {}", messages.join("; "));
    }

    let store = DayfileStore::new(config.open_blobstore().context("Failed to open archive")?);
    let today = args.archive.today.unwrap_or_else(today_utc);
    let status = archive_status(&store, today, config.sync.search_limit_days).await?;

    match args.archive.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => print!("{}", format_status_text(&status)),
    }
    Ok(())
}

/// Locate the most recent dayfile and derive the cursor from it.
pub async fn archive_status<B: Blobstore>(
    store: &DayfileStore<B>,
    today: Date,
    search_limit_days: u32,
) -> Result<ArchiveStatus> {
    let location = store.blobstore().describe();

    match store.locate_most_recent(today, search_limit_days).await? {
        Located::Found(date) => {
            let dayfile = store
                .load(date)
                .await
                .with_context(|| format!("Failed to read {}", dayfile_key(date)))?;
            let cursor = dayfile.cursor()?.unwrap_or_else(|| date.midnight());
            Ok(ArchiveStatus {
                location,
                latest: Some(dayfile_key(date)),
                readings: dayfile.items.len(),
                cursor: Some(format_api_timestamp(cursor)),
                searched_back_to: date.to_string(),
            })
        }
        Located::ExhaustedSearch(oldest) => Ok(ArchiveStatus {
            location,
            latest: None,
            readings: 0,
            cursor: None,
            searched_back_to: oldest.to_string(),
        }),
    }
}

fn format_status_text(status: &ArchiveStatus) -> String {
    match (&status.latest, &status.cursor) {
        (Some(latest), Some(cursor)) => format!(
            "Archive:  {}\nLatest:   {} ({} reading(s))\nCursor:   {}\n",
            status.location, latest, status.readings, cursor
        ),
        _ => format!(
            "Archive:  {}\nNo dayfile found back to {}; the next sync will bootstrap\n",
            status.location, status.searched_back_to
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodlog_store::MemoryBlobstore;
    use floodlog_types::{Dayfile, Reading};
    use serde_json::json;
    use time::macros::date;

    #[tokio::test]
    async fn test_status_of_existing_archive() {
        let store = DayfileStore::new(MemoryBlobstore::new());
        store
            .save(
                date!(2024 - 01 - 02),
                &Dayfile::new(
                    json!({}),
                    vec![
                        Reading::new("2024-01-02T00:00:00Z", 1.0),
                        Reading::new("2024-01-02T00:15:00Z", 1.25),
                    ],
                ),
            )
            .await
            .unwrap();

        let status = archive_status(&store, date!(2024 - 01 - 04), 7).await.unwrap();

        assert_eq!(status.latest.as_deref(), Some("2024-01-02.json"));
        assert_eq!(status.readings, 2);
        assert_eq!(status.cursor.as_deref(), Some("2024-01-02T00:15:00Z"));

        let text = format_status_text(&status);
        assert!(text.contains("Latest:   2024-01-02.json (2 reading(s))"));
        assert!(text.contains("Cursor:   2024-01-02T00:15:00Z"));
    }

    #[tokio::test]
    async fn test_status_of_empty_archive() {
        let store = DayfileStore::new(MemoryBlobstore::new());

        let status = archive_status(&store, date!(2024 - 01 - 10), 7).await.unwrap();

        assert_eq!(status.latest, None);
        assert_eq!(status.cursor, None);
        assert_eq!(status.searched_back_to, "2024-01-03");
        assert!(format_status_text(&status).contains("the next sync will bootstrap"));
    }

    #[tokio::test]
    async fn test_status_of_empty_dayfile_uses_midnight() {
        let store = DayfileStore::new(MemoryBlobstore::new());
        store
            .save(date!(2024 - 01 - 02), &Dayfile::new(json!({}), Vec::new()))
            .await
            .unwrap();

        let status = archive_status(&store, date!(2024 - 01 - 02), 7).await.unwrap();
        assert_eq!(status.cursor.as_deref(), Some("2024-01-02T00:00:00Z"));
        assert_eq!(status.readings, 0);
    }
}
