//! Dayfile store: search, load and read-modify-write over a [`Blobstore`].

use std::collections::HashSet;

use bytes::Bytes;
use time::Date;
use tracing::{debug, info, warn};

use floodlog_types::{Dayfile, Reading, dayfile_key};

use crate::blobstore::Blobstore;
use crate::error::{Error, Result};

/// How many days back [`DayfileStore::locate_most_recent`] searches by default.
pub const DEFAULT_SEARCH_LIMIT_DAYS: u32 = 7;

/// Result of searching backwards for the most recent dayfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    /// A dayfile exists for this date.
    Found(Date),
    /// No dayfile within the search window. Carries the oldest date probed.
    ExhaustedSearch(Date),
}

impl Located {
    /// The located date, or the oldest probed date when nothing was found.
    pub fn date(self) -> Date {
        match self {
            Located::Found(date) | Located::ExhaustedSearch(date) => date,
        }
    }

    /// Whether a dayfile was actually found.
    pub fn is_found(self) -> bool {
        matches!(self, Located::Found(_))
    }
}

/// What [`DayfileStore::merge_or_create`] did to a dayfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new dayfile was written.
    Created { added: usize },
    /// Readings were appended to an existing dayfile.
    Updated {
        added: usize,
        skipped: usize,
        total: usize,
    },
    /// Nothing new to write; `skipped` readings were already archived.
    Unchanged { skipped: usize },
}

impl MergeOutcome {
    /// Number of readings written by this merge.
    pub fn added(&self) -> usize {
        match self {
            MergeOutcome::Created { added } | MergeOutcome::Updated { added, .. } => *added,
            MergeOutcome::Unchanged { .. } => 0,
        }
    }
}

/// Dayfile persistence over a blob store.
///
/// The store assumes a single writer: two concurrent merges into the same
/// dayfile race on read-modify-write.
pub struct DayfileStore<B> {
    blobs: B,
}

impl<B: Blobstore> DayfileStore<B> {
    /// Create a dayfile store over `blobs`.
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    /// The underlying blob store.
    pub fn blobstore(&self) -> &B {
        &self.blobs
    }

    /// Check whether a dayfile exists for `date`.
    pub async fn exists(&self, date: Date) -> Result<bool> {
        self.blobs.exists(&dayfile_key(date)).await
    }

    /// Search backwards from `start` for the most recent dayfile.
    ///
    /// Probes `start`, `start - 1`, ... `start - search_limit_days` and
    /// returns the first date whose dayfile exists. When none does, returns
    /// [`Located::ExhaustedSearch`] with the oldest probed date.
    pub async fn locate_most_recent(&self, start: Date, search_limit_days: u32) -> Result<Located> {
        let mut day = start;
        let mut tries = 0;

        loop {
            debug!("Probing for dayfile {} (try {})", dayfile_key(day), tries);
            if self.exists(day).await? {
                info!("Found most recent dayfile {}", dayfile_key(day));
                return Ok(Located::Found(day));
            }
            if tries == search_limit_days {
                break;
            }
            match day.previous_day() {
                Some(previous) => day = previous,
                None => break,
            }
            tries += 1;
        }

        warn!(
            "Could not find a recent dayfile in {}. Searched {} days into the past, oldest date probed: {}",
            self.blobs.describe(),
            tries,
            day
        );
        Ok(Located::ExhaustedSearch(day))
    }

    /// Load the dayfile for `date`.
    pub async fn load(&self, date: Date) -> Result<Dayfile> {
        let key = dayfile_key(date);
        let body = self.blobs.get(&key).await?;
        Dayfile::from_slice(&body).map_err(|source| Error::Format { key, source })
    }

    /// Write the dayfile for `date`, replacing any previous contents.
    pub async fn save(&self, date: Date, dayfile: &Dayfile) -> Result<()> {
        let body = dayfile.to_json_pretty()?;
        self.blobs.put(&dayfile_key(date), Bytes::from(body)).await
    }

    /// Append `readings` to the dayfile for `date`, creating it if needed.
    ///
    /// `readings` must already be in chronological order and belong to
    /// `date`. On update the stored `meta` is kept and the supplied one is
    /// discarded. Readings whose timestamp is already archived are skipped,
    /// which absorbs an inclusive `since` boundary from the source.
    ///
    /// Any read or write failure other than "dayfile not found" is returned
    /// so the caller can retry the whole cycle.
    pub async fn merge_or_create(
        &self,
        date: Date,
        readings: Vec<Reading>,
        meta: &serde_json::Value,
    ) -> Result<MergeOutcome> {
        let key = dayfile_key(date);
        if readings.is_empty() {
            debug!("No readings to merge into {}", key);
            return Ok(MergeOutcome::Unchanged { skipped: 0 });
        }

        match self.load(date).await {
            Ok(mut dayfile) => {
                debug!(
                    "Reading existing dayfile {}, found {} existing reading(s)",
                    key,
                    dayfile.items.len()
                );

                let format_err = |source| Error::Format {
                    key: key.clone(),
                    source,
                };
                let mut seen = dayfile
                    .items
                    .iter()
                    .map(Reading::timestamp)
                    .collect::<std::result::Result<HashSet<_>, _>>()
                    .map_err(format_err)?;

                let (mut added, mut skipped) = (0, 0);
                for reading in readings {
                    let ts = reading.timestamp().map_err(format_err)?;
                    if seen.insert(ts) {
                        dayfile.items.push(reading);
                        added += 1;
                    } else {
                        debug!("Skipping already archived reading at {}", reading.date_time);
                        skipped += 1;
                    }
                }

                let total = dayfile.items.len();
                if added == 0 {
                    info!("Dayfile {} already holds all {} reading(s)", key, skipped);
                    return Ok(MergeOutcome::Unchanged { skipped });
                }

                self.save(date, &dayfile).await?;
                info!("Updated existing dayfile {}, added {} new reading(s)", key, added);
                if skipped > 0 {
                    warn!("Skipped {} duplicate reading(s) for {}", skipped, key);
                }
                Ok(MergeOutcome::Updated {
                    added,
                    skipped,
                    total,
                })
            }
            Err(e) if e.is_not_found() => {
                let added = readings.len();
                let dayfile = Dayfile::new(meta.clone(), readings);
                self.save(date, &dayfile).await?;
                info!("Created a new dayfile {} with {} reading(s)", key, added);
                Ok(MergeOutcome::Created { added })
            }
            Err(e) => Err(e),
        }
    }
}
