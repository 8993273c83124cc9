//! Mock readings source for testing.
//!
//! [`MockSource`] serves readings from memory and records every `since` it
//! was asked for, so tests can drive [`SyncEngine`](crate::SyncEngine)
//! without network access.
//!
//! # Features
//!
//! - **Boundary control**: serve readings strictly after `since` (default) or
//!   at-or-after it, like an API with an inclusive filter
//! - **Failure injection**: make fetches fail with a 503 status
//! - **Call recording**: inspect the cursors the engine fetched from

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use time::PrimitiveDateTime;
use tokio::sync::RwLock;

use floodlog_types::{Reading, partition_by_day};

use crate::error::{Result, SourceError};
use crate::source::{Fetched, ReadingsSource};

/// An in-memory [`ReadingsSource`].
///
/// ```
/// use floodlog_core::{MockSource, ReadingsSource};
/// use floodlog_types::Reading;
/// use time::macros::datetime;
///
/// #[tokio::main]
/// async fn main() {
///     let source = MockSource::new().with_readings(vec![
///         Reading::new("2024-01-02T00:00:00Z", 1.2),
///         Reading::new("2024-01-02T00:15:00Z", 1.3),
///     ]);
///
///     let fetched = source.fetch_since(datetime!(2024-01-02 00:00)).await.unwrap();
///     assert_eq!(fetched.reading_count(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockSource {
    readings: RwLock<Vec<Reading>>,
    meta: Value,
    inclusive: bool,
    should_fail: AtomicBool,
    fetch_count: AtomicU32,
    calls: RwLock<Vec<PrimitiveDateTime>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Create a source with no readings and [`MockSource::default_meta`].
    pub fn new() -> Self {
        Self {
            readings: RwLock::new(Vec::new()),
            meta: Self::default_meta(),
            inclusive: false,
            should_fail: AtomicBool::new(false),
            fetch_count: AtomicU32::new(0),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Provenance metadata returned when none is configured.
    pub fn default_meta() -> Value {
        json!({
            "publisher": "Mock Agency",
            "licence": "http://www.nationalarchives.gov.uk/doc/open-government-licence/version/3/",
        })
    }

    /// Serve these readings.
    #[must_use]
    pub fn with_readings(mut self, readings: Vec<Reading>) -> Self {
        self.readings = RwLock::new(readings);
        self
    }

    /// Return `meta` alongside every fetch.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    /// Include readings taken exactly at `since`.
    #[must_use]
    pub fn with_inclusive_boundary(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    /// Make readings available to later fetches.
    pub async fn push_readings(&self, readings: Vec<Reading>) {
        self.readings.write().await.extend(readings);
    }

    /// Make every subsequent fetch fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Number of fetches attempted, including failed ones.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// The `since` of every fetch, in call order.
    pub async fn calls(&self) -> Vec<PrimitiveDateTime> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl ReadingsSource for MockSource {
    async fn fetch_since(&self, since: PrimitiveDateTime) -> Result<Fetched> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.calls.write().await.push(since);

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(SourceError::Status {
                url: "mock://readings".to_string(),
                status: 503,
            }
            .into());
        }

        let mut selected = Vec::new();
        for reading in self.readings.read().await.iter() {
            let ts = reading.timestamp()?;
            if ts > since || (self.inclusive && ts == since) {
                selected.push(reading.clone());
            }
        }

        Ok(Fetched {
            by_day: partition_by_day(selected)?,
            meta: self.meta.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn readings() -> Vec<Reading> {
        vec![
            Reading::new("2024-01-02T23:45:00Z", 1.5),
            Reading::new("2024-01-03T00:00:00Z", 1.75),
            Reading::new("2024-01-02T23:30:00Z", 1.25),
        ]
    }

    #[tokio::test]
    async fn test_exclusive_boundary() {
        let source = MockSource::new().with_readings(readings());
        let fetched = source.fetch_since(datetime!(2024-01-02 23:30)).await.unwrap();

        assert_eq!(fetched.reading_count(), 2);
        assert_eq!(
            fetched.by_day[&date!(2024 - 01 - 02)],
            vec![Reading::new("2024-01-02T23:45:00Z", 1.5)]
        );
        assert_eq!(fetched.meta, MockSource::default_meta());
    }

    #[tokio::test]
    async fn test_inclusive_boundary() {
        let source = MockSource::new()
            .with_readings(readings())
            .with_inclusive_boundary(true);
        let fetched = source.fetch_since(datetime!(2024-01-02 23:30)).await.unwrap();

        assert_eq!(fetched.reading_count(), 3);
        assert_eq!(fetched.by_day[&date!(2024 - 01 - 02)].len(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection_and_calls() {
        let source = MockSource::new().with_meta(json!({"x": 1}));
        source.set_should_fail(true);
        assert!(source.fetch_since(datetime!(2024-01-02 00:00)).await.is_err());

        source.set_should_fail(false);
        let fetched = source.fetch_since(datetime!(2024-01-03 00:00)).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(fetched.meta, json!({"x": 1}));

        assert_eq!(source.fetch_count(), 2);
        assert_eq!(
            source.calls().await,
            vec![datetime!(2024-01-02 00:00), datetime!(2024-01-03 00:00)]
        );
    }

    #[tokio::test]
    async fn test_push_readings() {
        let source = MockSource::new();
        source.push_readings(readings()).await;
        let fetched = source.fetch_since(datetime!(2024-01-01 00:00)).await.unwrap();
        assert_eq!(fetched.reading_count(), 3);
    }
}
