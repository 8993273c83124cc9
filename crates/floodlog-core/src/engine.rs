//! The sync cycle.
//!
//! One cycle finds the most recent dayfile, derives the cursor from it,
//! fetches everything newer from the source and merges it into per-day
//! dayfiles. An archive with no recent dayfile is bootstrapped instead.
//!
//! ```text
//! locate ──Found(date)──────────▶ load, derive cursor ─▶ fetch ─▶ merge ─▶ Synced
//!    └────ExhaustedSearch(oldest)─▶ fetch since start ──────────▶ merge ─▶ Bootstrapped
//! ```
//!
//! Cycles do not overlap and keep no state between runs: the archive itself
//! is the checkpoint.

use time::{Date, PrimitiveDateTime};
use tracing::{error, info, warn};

use floodlog_store::{Blobstore, DEFAULT_SEARCH_LIMIT_DAYS, DayfileStore, Located, MergeOutcome};
use floodlog_types::{format_api_timestamp, today_utc};

use crate::error::Result;
use crate::source::{Fetched, ReadingsSource};

/// Tunables for a [`SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Days to search back for the most recent dayfile.
    pub search_limit_days: u32,
    /// First day fetched when bootstrapping. Defaults to the oldest date
    /// probed by the search.
    pub bootstrap_from: Option<Date>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            search_limit_days: DEFAULT_SEARCH_LIMIT_DAYS,
            bootstrap_from: None,
        }
    }
}

impl SyncOptions {
    /// Set the bootstrap start date.
    #[must_use]
    pub fn bootstrap_from(mut self, date: Date) -> Self {
        self.bootstrap_from = Some(date);
        self
    }

    /// Set the search window in days.
    #[must_use]
    pub fn search_limit_days(mut self, days: u32) -> Self {
        self.search_limit_days = days;
        self
    }
}

/// Which path a cycle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No recent dayfile existed; history was fetched from `since`.
    Bootstrapped { since: PrimitiveDateTime },
    /// Readings newer than `cursor` were fetched and merged.
    Synced { cursor: PrimitiveDateTime },
}

impl SyncOutcome {
    /// Timestamp the fetch started from.
    pub fn since(&self) -> PrimitiveDateTime {
        match self {
            SyncOutcome::Bootstrapped { since } => *since,
            SyncOutcome::Synced { cursor } => *cursor,
        }
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Merge result per day, in ascending date order.
    pub days: Vec<(Date, MergeOutcome)>,
}

impl SyncReport {
    /// Total readings written across all days.
    pub fn readings_added(&self) -> usize {
        self.days.iter().map(|(_, outcome)| outcome.added()).sum()
    }

    /// Whether this cycle seeded an empty archive.
    pub fn is_bootstrap(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Bootstrapped { .. })
    }
}

/// Runs sync cycles for one measure against one archive.
pub struct SyncEngine<S, B> {
    source: S,
    store: DayfileStore<B>,
    options: SyncOptions,
}

impl<S: ReadingsSource, B: Blobstore> SyncEngine<S, B> {
    pub fn new(source: S, store: DayfileStore<B>, options: SyncOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &DayfileStore<B> {
        &self.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one cycle with the current UTC date as "today".
    pub async fn run_cycle_now(&self) -> Result<SyncReport> {
        self.run_cycle(today_utc()).await
    }

    /// Run one cycle, searching back from `today`.
    ///
    /// Any failure ends the cycle. Days merged before the failure stay
    /// written; the next cycle derives its cursor from them.
    pub async fn run_cycle(&self, today: Date) -> Result<SyncReport> {
        info!("Starting sync cycle for {}", today);

        let located = self
            .store
            .locate_most_recent(today, self.options.search_limit_days)
            .await?;

        match located {
            Located::Found(date) => self.sync_from(date).await,
            Located::ExhaustedSearch(oldest) => self.bootstrap(oldest).await,
        }
    }

    async fn bootstrap(&self, oldest: Date) -> Result<SyncReport> {
        let since = self.options.bootstrap_from.unwrap_or(oldest).midnight();
        warn!(
            "No recent dayfile found, bootstrapping archive from {}",
            format_api_timestamp(since)
        );

        let fetched = self.source.fetch_since(since).await?;
        let days = self.merge_all(fetched).await?;

        info!("Bootstrap wrote {} day(s)", days.len());
        Ok(SyncReport {
            outcome: SyncOutcome::Bootstrapped { since },
            days,
        })
    }

    async fn sync_from(&self, date: Date) -> Result<SyncReport> {
        let dayfile = self.store.load(date).await?;
        let stored = dayfile.cursor().inspect_err(|e| {
            error!("Stored dayfile for {} is malformed: {}", date, e);
        })?;
        let cursor = match stored {
            Some(cursor) => cursor,
            None => {
                warn!("Dayfile for {} holds no readings, syncing from its start", date);
                date.midnight()
            }
        };
        info!("Syncing readings since {}", format_api_timestamp(cursor));

        let fetched = self.source.fetch_since(cursor).await?;
        let days = self.merge_all(fetched).await?;

        Ok(SyncReport {
            outcome: SyncOutcome::Synced { cursor },
            days,
        })
    }

    async fn merge_all(&self, fetched: Fetched) -> Result<Vec<(Date, MergeOutcome)>> {
        let Fetched { by_day, meta } = fetched;
        let mut days = Vec::with_capacity(by_day.len());

        for (date, readings) in by_day {
            let outcome = self.store.merge_or_create(date, readings, &meta).await?;
            days.push((date, outcome));
        }

        Ok(days)
    }
}
