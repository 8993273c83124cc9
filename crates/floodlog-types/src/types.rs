//! Core types for archived readings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

use crate::error::FormatResult;
use crate::timestamp::parse_api_timestamp;

/// A single timestamped sensor value.
///
/// The timestamp string is kept exactly as the API returned it so that
/// rewriting a dayfile never alters archived data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// ISO 8601 timestamp, usually UTC with a trailing `Z`.
    #[serde(rename = "dateTime")]
    pub date_time: String,
    /// Measured value (metres for a river level).
    pub value: f64,
}

impl Reading {
    /// Create a reading from a timestamp string and a value.
    pub fn new(date_time: impl Into<String>, value: f64) -> Self {
        Self {
            date_time: date_time.into(),
            value,
        }
    }

    /// Parse the reading's timestamp.
    pub fn timestamp(&self) -> FormatResult<PrimitiveDateTime> {
        parse_api_timestamp(&self.date_time)
    }

    /// Calendar day the reading belongs to.
    pub fn day(&self) -> FormatResult<Date> {
        Ok(self.timestamp()?.date())
    }
}

/// One calendar day of readings plus provenance metadata.
///
/// `meta` is opaque: it is whatever the API returned alongside the readings
/// that created the file (or what the CSV converter synthesized), and it is
/// never rewritten once the file exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dayfile {
    pub meta: serde_json::Value,
    pub items: Vec<Reading>,
}

impl Dayfile {
    /// Create a dayfile.
    pub fn new(meta: serde_json::Value, items: Vec<Reading>) -> Self {
        Self { meta, items }
    }

    /// Decode a dayfile from its JSON representation.
    pub fn from_slice(bytes: &[u8]) -> FormatResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode the dayfile as pretty-printed JSON (two-space indent).
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Encode the dayfile as compact JSON.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// The last known reading's timestamp. See [`derive_cursor`].
    pub fn cursor(&self) -> FormatResult<Option<PrimitiveDateTime>> {
        derive_cursor(self)
    }
}

/// Derive the sync cursor from a dayfile: the latest timestamp in `items`.
///
/// The archive keeps no separate checkpoint; the newest reading in the most
/// recent dayfile is where the next fetch starts. Returns `None` when the
/// dayfile has no readings.
///
/// ```
/// use floodlog_types::{Dayfile, Reading, derive_cursor};
/// use time::macros::datetime;
///
/// let dayfile = Dayfile::new(
///     serde_json::Value::Null,
///     vec![
///         Reading::new("2024-01-02T06:00:00Z", 1.3),
///         Reading::new("2024-01-02T00:00:00Z", 1.1),
///     ],
/// );
/// assert_eq!(derive_cursor(&dayfile).unwrap(), Some(datetime!(2024-01-02 06:00:00)));
/// ```
pub fn derive_cursor(dayfile: &Dayfile) -> FormatResult<Option<PrimitiveDateTime>> {
    let mut latest = None;
    for reading in &dayfile.items {
        let ts = reading.timestamp()?;
        if latest.is_none_or(|current| ts > current) {
            latest = Some(ts);
        }
    }
    Ok(latest)
}

/// Sort readings by timestamp and group them by calendar day.
///
/// Sorting is stable, so readings with identical timestamps keep their
/// relative order. Days come out of the map in ascending order.
pub fn partition_by_day(readings: Vec<Reading>) -> FormatResult<BTreeMap<Date, Vec<Reading>>> {
    let mut stamped = readings
        .into_iter()
        .map(|reading| reading.timestamp().map(|ts| (ts, reading)))
        .collect::<FormatResult<Vec<_>>>()?;
    stamped.sort_by_key(|(ts, _)| *ts);

    let mut by_day: BTreeMap<Date, Vec<Reading>> = BTreeMap::new();
    for (ts, reading) in stamped {
        by_day.entry(ts.date()).or_default().push(reading);
    }
    Ok(by_day)
}

/// Storage key of the dayfile for `date`, e.g. `2024-01-02.json`.
pub fn dayfile_key(date: Date) -> String {
    format!("{date}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use serde_json::json;
    use time::macros::{date, datetime};

    #[test]
    fn test_reading_serde_uses_api_field_names() {
        let reading = Reading::new("2024-01-02T00:00:00Z", 1.1);
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value, json!({"dateTime": "2024-01-02T00:00:00Z", "value": 1.1}));

        let back: Reading = serde_json::from_value(value).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_reading_day() {
        let reading = Reading::new("2024-01-02T23:45:00Z", 0.8);
        assert_eq!(reading.day().unwrap(), date!(2024 - 01 - 02));
    }

    #[test]
    fn test_dayfile_key() {
        assert_eq!(dayfile_key(date!(2024 - 01 - 02)), "2024-01-02.json");
        assert_eq!(dayfile_key(date!(1999 - 12 - 31)), "1999-12-31.json");
    }

    #[test]
    fn test_dayfile_round_trip_preserves_meta_order() {
        let raw = br#"{"meta":{"publisher":"EA","licence":"OGL","version":"0.9"},"items":[{"dateTime":"2024-01-02T00:00:00Z","value":1.1}]}"#;
        let dayfile = Dayfile::from_slice(raw).unwrap();
        assert_eq!(dayfile.to_json().unwrap(), raw.to_vec());

        let pretty = dayfile.to_json_pretty().unwrap();
        assert_eq!(Dayfile::from_slice(&pretty).unwrap(), dayfile);
        assert!(String::from_utf8(pretty).unwrap().contains("\n  \"items\""));
    }

    #[test]
    fn test_dayfile_from_invalid_json() {
        let err = Dayfile::from_slice(b"{\"items\": 3}").unwrap_err();
        assert!(matches!(err, FormatError::InvalidPayload(_)));
    }

    #[test]
    fn test_derive_cursor_picks_maximum_not_last() {
        let dayfile = Dayfile::new(
            json!({}),
            vec![
                Reading::new("2024-01-02T00:00:00Z", 1.1),
                Reading::new("2024-01-02T06:00:00Z", 1.3),
                Reading::new("2024-01-02T03:00:00Z", 1.2),
            ],
        );
        assert_eq!(
            derive_cursor(&dayfile).unwrap(),
            Some(datetime!(2024-01-02 06:00:00))
        );
    }

    #[test]
    fn test_derive_cursor_empty() {
        let dayfile = Dayfile::new(json!({}), Vec::new());
        assert_eq!(dayfile.cursor().unwrap(), None);
    }

    #[test]
    fn test_derive_cursor_bad_timestamp() {
        let dayfile = Dayfile::new(json!({}), vec![Reading::new("noon", 1.0)]);
        assert!(derive_cursor(&dayfile).is_err());
    }

    #[test]
    fn test_partition_sorts_and_groups() {
        let readings = vec![
            Reading::new("2024-01-03T00:15:00Z", 3.0),
            Reading::new("2024-01-02T23:45:00Z", 2.0),
            Reading::new("2024-01-02T23:30:00Z", 1.0),
            Reading::new("2024-01-03T00:00:00Z", 2.5),
        ];

        let by_day = partition_by_day(readings).unwrap();
        let days: Vec<_> = by_day.keys().copied().collect();
        assert_eq!(days, vec![date!(2024 - 01 - 02), date!(2024 - 01 - 03)]);

        let values: Vec<f64> = by_day[&date!(2024 - 01 - 02)]
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![1.0, 2.0]);

        let values: Vec<f64> = by_day[&date!(2024 - 01 - 03)]
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![2.5, 3.0]);
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_by_day(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_partition_rejects_bad_timestamp() {
        let readings = vec![
            Reading::new("2024-01-02T00:00:00Z", 1.0),
            Reading::new("not a time", 2.0),
        ];
        assert!(partition_by_day(readings).is_err());
    }
}
