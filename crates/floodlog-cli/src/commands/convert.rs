//! Convert command - turn a flood archive CSV export into a dayfile.
//!
//! The Environment Agency publishes daily CSV dumps of every reading from
//! every station. This command keeps the rows for one measure and writes
//! them as a dayfile, which lets an archive be back-filled from the dumps.

use std::io::{self, Read, Write};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use floodlog_types::{Dayfile, Reading, parse_api_timestamp};

/// Where the daily CSV dumps are published.
pub const CSV_SOURCE: &str = "https://environment.data.gov.uk/flood-monitoring/archive";

/// Counters reported after a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    /// Rows that matched the measure.
    pub hits: usize,
    /// Lines read, including the header.
    pub lines: usize,
    /// Column names from the header row.
    pub headers: Vec<String>,
}

impl std::fmt::Display for ConvertSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Hits: {}, Lines: {}, Headers: {:?}",
            self.hits, self.lines, self.headers
        )
    }
}

/// Execute the convert command: CSV on stdin, dayfile JSON on stdout and
/// the summary on stderr.
pub fn cmd_convert(measure: &str) -> Result<()> {
    let (dayfile, summary) = convert_csv(io::stdin().lock(), measure, OffsetDateTime::now_utc())?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&dayfile.to_json()?)?;
    writeln!(stdout)?;

    eprintln!("{}", summary);
    Ok(())
}

/// Convert CSV rows into a dayfile.
///
/// Keeps every row with a field containing `measure`, sorts the hits by
/// timestamp and trims each to `dateTime` and `value`. The header row must
/// name both columns.
pub fn convert_csv<R: Read>(
    reader: R,
    measure: &str,
    created_at: OffsetDateTime,
) -> Result<(Dayfile, ConvertSummary)> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("CSV header has no '{}' column: {:?}", name, headers))
    };
    let date_col = column("dateTime")?;
    let value_col = column("value")?;

    let mut lines = if headers.is_empty() { 0 } else { 1 };
    let mut hits = Vec::new();

    for record in csv.records() {
        let record = record.with_context(|| format!("Failed to read CSV line {}", lines + 1))?;
        lines += 1;

        if !record.iter().any(|field| field.contains(measure)) {
            continue;
        }

        let (Some(date_time), Some(value)) = (record.get(date_col), record.get(value_col)) else {
            bail!("CSV line {} is missing the dateTime or value column", lines);
        };
        let ts = parse_api_timestamp(date_time)
            .with_context(|| format!("Bad timestamp on CSV line {}", lines))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Bad value '{}' on CSV line {}", value, lines))?;

        hits.push((ts, Reading::new(date_time, value)));
    }

    hits.sort_by_key(|(ts, _)| *ts);

    let meta = json!({
        "floodlog": {
            "generator": concat!("floodlog ", env!("CARGO_PKG_VERSION"), " convert"),
            "created_at": created_at.format(&Rfc3339)?,
            "version": 1.0,
            "measure_id": measure,
            "csv_source": CSV_SOURCE,
        }
    });

    let summary = ConvertSummary {
        hits: hits.len(),
        lines,
        headers: headers.clone(),
    };
    let items = hits.into_iter().map(|(_, reading)| reading).collect();

    Ok((Dayfile::new(meta, items), summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const MEASURE: &str = "2067-level-stage-i-15_min-mASD";

    fn sample_csv() -> String {
        format!(
            "dateTime,measure,value\n\
             2024-01-02T00:15:00Z,http://environment.data.gov.uk/flood-monitoring/id/measures/{MEASURE},0.5\n\
             2024-01-02T00:00:00Z,http://environment.data.gov.uk/flood-monitoring/id/measures/1234-flow--i-15_min-m3_s,9.9\n\
             2024-01-02T00:00:00Z,http://environment.data.gov.uk/flood-monitoring/id/measures/{MEASURE},0.25\n"
        )
    }

    fn created_at() -> OffsetDateTime {
        datetime!(2024-01-03 08:30 UTC)
    }

    #[test]
    fn test_convert_filters_and_sorts() {
        let (dayfile, summary) =
            convert_csv(sample_csv().as_bytes(), MEASURE, created_at()).unwrap();

        assert_eq!(
            dayfile.items,
            vec![
                Reading::new("2024-01-02T00:00:00Z", 0.25),
                Reading::new("2024-01-02T00:15:00Z", 0.5),
            ]
        );
        assert_eq!(
            summary,
            ConvertSummary {
                hits: 2,
                lines: 4,
                headers: vec!["dateTime".into(), "measure".into(), "value".into()],
            }
        );
        assert_eq!(
            summary.to_string(),
            r#"Hits: 2, Lines: 4, Headers: ["dateTime", "measure", "value"]"#
        );
    }

    #[test]
    fn test_convert_meta() {
        let (dayfile, _) = convert_csv(sample_csv().as_bytes(), MEASURE, created_at()).unwrap();
        let meta = &dayfile.meta["floodlog"];

        assert_eq!(meta["measure_id"], MEASURE);
        assert_eq!(meta["created_at"], "2024-01-03T08:30:00Z");
        assert_eq!(meta["version"], 1.0);
        assert_eq!(meta["csv_source"], CSV_SOURCE);
        assert!(meta["generator"].as_str().unwrap().starts_with("floodlog "));
    }

    #[test]
    fn test_convert_output_is_compact() {
        let (dayfile, _) = convert_csv(sample_csv().as_bytes(), MEASURE, created_at()).unwrap();
        let out = String::from_utf8(dayfile.to_json().unwrap()).unwrap();
        assert!(out.starts_with(r#"{"meta":{"floodlog":{"generator""#));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_convert_no_hits() {
        let (dayfile, summary) =
            convert_csv(sample_csv().as_bytes(), "nothing-matches", created_at()).unwrap();
        assert!(dayfile.items.is_empty());
        assert_eq!(summary.hits, 0);
        assert_eq!(summary.lines, 4);
    }

    #[test]
    fn test_convert_missing_column() {
        let csv = format!("dateTime,measure\n2024-01-02T00:00:00Z,{MEASURE}\n");
        let err = convert_csv(csv.as_bytes(), MEASURE, created_at()).unwrap_err();
        assert!(err.to_string().contains("'value'"));
    }

    #[test]
    fn test_convert_bad_value() {
        let csv = format!("dateTime,measure,value\n2024-01-02T00:00:00Z,{MEASURE},n/a\n");
        let err = convert_csv(csv.as_bytes(), MEASURE, created_at()).unwrap_err();
        assert!(err.to_string().contains("Bad value 'n/a' on CSV line 2"));
    }

    #[test]
    fn test_convert_bad_timestamp() {
        let csv = format!("dateTime,measure,value\nyesterday,{MEASURE},1.0\n");
        assert!(convert_csv(csv.as_bytes(), MEASURE, created_at()).is_err());
    }

    #[test]
    fn test_convert_empty_input() {
        let err = convert_csv("".as_bytes(), MEASURE, created_at()).unwrap_err();
        assert!(err.to_string().contains("dateTime"));
    }
}
