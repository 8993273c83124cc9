//! Timestamp helpers for the flood-monitoring API.
//!
//! The API reports readings as ISO 8601 date-times in UTC with a trailing
//! `Z` (e.g. `2024-01-02T06:15:00Z`). Archived readings keep that string as
//! received; for ordering and day partitioning we parse it into a
//! [`PrimitiveDateTime`] with the `Z` stripped.

use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use crate::error::{FormatError, FormatResult};

/// Minutes between consecutive readings published by the API.
pub const READING_INTERVAL_MINUTES: i64 = 15;

/// UTC marker accepted (and ignored) at the end of API timestamps.
const UTC_MARKER: char = 'Z';

/// Parse a timestamp in the format returned by the flood-monitoring API.
///
/// A single trailing `Z` is stripped, then the remainder is parsed as a local
/// date-time `YYYY-MM-DDTHH:MM[:SS[.fraction]]`. A bare date `YYYY-MM-DD` is
/// accepted and means midnight.
///
/// # Examples
///
/// ```
/// use floodlog_types::parse_api_timestamp;
///
/// let with_marker = parse_api_timestamp("2024-01-02T06:15:00Z").unwrap();
/// let without = parse_api_timestamp("2024-01-02T06:15:00").unwrap();
/// assert_eq!(with_marker, without);
/// assert!(parse_api_timestamp("yesterday").is_err());
/// ```
pub fn parse_api_timestamp(input: &str) -> FormatResult<PrimitiveDateTime> {
    let trimmed = input.strip_suffix(UTC_MARKER).unwrap_or(input);

    let date_time = format_description!(
        "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
    );
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, date_time) {
        return Ok(parsed);
    }

    let date_only = format_description!("[year]-[month]-[day]");
    Date::parse(trimmed, date_only)
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT))
        .map_err(|_| FormatError::InvalidTimestamp {
            input: input.to_string(),
        })
}

/// Render a timestamp the way the API expects it in the `since` parameter.
///
/// ```
/// use floodlog_types::{format_api_timestamp, parse_api_timestamp};
///
/// let ts = parse_api_timestamp("2024-01-02T06:15:00").unwrap();
/// assert_eq!(format_api_timestamp(ts), "2024-01-02T06:15:00Z");
/// ```
pub fn format_api_timestamp(ts: PrimitiveDateTime) -> String {
    format!(
        "{}T{:02}:{:02}:{:02}{}",
        ts.date(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        UTC_MARKER
    )
}

/// Estimate how many readings the API holds between two points in time.
///
/// The span is divided by [`READING_INTERVAL_MINUTES`] and rounded down: a
/// partial trailing interval does not count as a reading. The estimate only
/// decides whether to raise the request's page-size limit.
///
/// ```
/// use floodlog_types::{estimate_reading_count, parse_api_timestamp};
///
/// let since = parse_api_timestamp("2024-01-02T00:00:00").unwrap();
/// let until = parse_api_timestamp("2024-01-02T02:29:00").unwrap();
/// assert_eq!(estimate_reading_count(since, until), 9);
/// ```
pub fn estimate_reading_count(since: PrimitiveDateTime, until: PrimitiveDateTime) -> i64 {
    let interval = Duration::minutes(READING_INTERVAL_MINUTES).whole_nanoseconds();
    let span = (until - since).whole_nanoseconds();
    span.div_euclid(interval) as i64
}

/// [`estimate_reading_count`] up to the current UTC time.
pub fn estimate_reading_count_until_now(since: PrimitiveDateTime) -> i64 {
    estimate_reading_count(since, now_utc())
}

/// Current UTC time without an offset, comparable with API timestamps.
pub fn now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Current UTC calendar date.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}
