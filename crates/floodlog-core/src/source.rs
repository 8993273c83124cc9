//! Readings sources.
//!
//! This module provides the [`ReadingsSource`] trait that abstracts over the
//! flood-monitoring API and mock sources for testing, plus
//! [`FloodApiSource`], the HTTP client for the real API.
//!
//! # Example
//!
//! ```no_run
//! use floodlog_core::{FloodApiSource, ReadingsSource, DEFAULT_API_BASE};
//! use time::macros::datetime;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FloodApiSource::new(DEFAULT_API_BASE, "2067-level-stage-i-15_min-mASD")?;
//! let fetched = source.fetch_since(datetime!(2024-01-02 00:00:00)).await?;
//! println!("{} new readings", fetched.reading_count());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use time::{Date, PrimitiveDateTime};
use tracing::{debug, error, info, warn};

use floodlog_types::{
    FormatError, Reading, estimate_reading_count_until_now, format_api_timestamp,
    partition_by_day,
};

use crate::error::{Result, SourceError};

/// Base URL of the Environment Agency flood-monitoring API.
pub const DEFAULT_API_BASE: &str = "https://environment.data.gov.uk/flood-monitoring";

/// Page size the API applies when no `_limit` is given.
pub const DEFAULT_PAGE_LIMIT: i64 = 500;

/// `User-Agent` sent with every API request.
pub const USER_AGENT: &str = concat!(
    "floodlog/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/floodlog/floodlog)"
);

/// Readings fetched in one request, partitioned by calendar day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fetched {
    /// Readings per day, each list in ascending timestamp order.
    pub by_day: BTreeMap<Date, Vec<Reading>>,
    /// Provenance metadata returned alongside the readings.
    pub meta: Value,
}

impl Fetched {
    /// Total number of readings across all days.
    pub fn reading_count(&self) -> usize {
        self.by_day.values().map(Vec::len).sum()
    }

    /// Whether no readings were returned.
    pub fn is_empty(&self) -> bool {
        self.by_day.values().all(Vec::is_empty)
    }
}

/// Trait abstracting where readings come from.
///
/// Implementations return readings taken at or after `since`. Whether the
/// boundary reading itself is included is up to the upstream API; the
/// dayfile store tolerates it either way.
#[async_trait]
pub trait ReadingsSource: Send + Sync {
    /// Fetch every reading since `since`, sorted and partitioned by day.
    async fn fetch_since(&self, since: PrimitiveDateTime) -> Result<Fetched>;
}

/// The `_limit` to request for an estimated number of readings.
///
/// Above the API's default page size we ask for one more than the estimate.
/// Otherwise the parameter is omitted so identical requests share a cache
/// entry upstream.
pub fn page_limit(estimate: i64) -> Option<i64> {
    (estimate > DEFAULT_PAGE_LIMIT).then_some(estimate + 1)
}

/// Client for the readings of one measure on the flood-monitoring API.
#[derive(Debug, Clone)]
pub struct FloodApiSource {
    client: Client,
    base_url: String,
    measure_id: String,
}

impl FloodApiSource {
    /// Create a client for `measure_id`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, normally [`DEFAULT_API_BASE`]
    /// * `measure_id` - Measure identifier (e.g., "2067-level-stage-i-15_min-mASD")
    pub fn new(base_url: &str, measure_id: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Request {
                url: base_url.to_string(),
                source: e,
            })?;
        Self::with_client(base_url, measure_id, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, measure_id: &str, client: Client) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SourceError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            ))
            .into());
        }

        if measure_id.is_empty() || measure_id.contains('/') {
            return Err(SourceError::InvalidUrl(format!("invalid measure id '{}'", measure_id)).into());
        }

        Ok(Self {
            client,
            base_url,
            measure_id: measure_id.to_string(),
        })
    }

    /// The measure this client reads.
    pub fn measure_id(&self) -> &str {
        &self.measure_id
    }

    /// URL of the readings endpoint, without query parameters.
    pub fn readings_url(&self) -> String {
        format!("{}/id/measures/{}/readings", self.base_url, self.measure_id)
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        // Decodes with the charset declared by the response, UTF-8 otherwise
        Ok(response.text().await.map_err(|e| SourceError::Request {
            url: url.to_string(),
            source: e,
        })?)
    }
}

#[async_trait]
impl ReadingsSource for FloodApiSource {
    async fn fetch_since(&self, since: PrimitiveDateTime) -> Result<Fetched> {
        let since_param = format_api_timestamp(since);
        let mut query = vec![("since", since_param.clone())];

        let estimate = estimate_reading_count_until_now(since);
        if let Some(limit) = page_limit(estimate) {
            warn!("Asking for a lot of readings: estimate={}, limit={}", estimate, limit);
            query.push(("_limit", limit.to_string()));
        }

        let url = self.readings_url();
        debug!("Requesting {} with {:?}", url, query);
        let body = self.get_text(&url, &query).await?;

        let fetched = parse_readings_response(&body).inspect_err(|e| {
            error!("Unexpected response format from {}: {}", url, e);
        })?;
        info!(
            "API returned {} new reading(s) since {}",
            fetched.reading_count(),
            since_param
        );
        Ok(fetched)
    }
}

#[derive(Deserialize)]
struct ReadingsResponse {
    meta: Value,
    items: Vec<Value>,
}

/// Parse a readings response body: trim each item to `dateTime` and `value`,
/// sort by timestamp and partition by day.
pub fn parse_readings_response(body: &str) -> std::result::Result<Fetched, FormatError> {
    let response: ReadingsResponse = serde_json::from_str(body)?;

    let readings = response
        .items
        .iter()
        .map(trim_reading)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Fetched {
        by_day: partition_by_day(readings)?,
        meta: response.meta,
    })
}

/// Keep only the fields we archive from a raw API reading.
fn trim_reading(raw: &Value) -> std::result::Result<Reading, FormatError> {
    let missing = |field| FormatError::MissingField {
        field,
        reading: raw.to_string(),
    };

    let date_time = raw
        .get("dateTime")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("dateTime"))?;
    let value = raw
        .get("value")
        .and_then(Value::as_f64)
        .ok_or_else(|| missing("value"))?;

    Ok(Reading::new(date_time, value))
}
