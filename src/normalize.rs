//! Raw record normalization.
//!
//! Turns the text records of one series into `CanonicalRecord`s:
//!
//! - `StartTime` / `EndTime` are parsed to UTC instants
//! - duplicate start times are removed, keeping the first record in arrival order
//!
//! Values stay untouched here; numeric coercion belongs to the resampler.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::{CanonicalRecord, RawRecord};
use crate::error::PipelineError;

/// Naive layouts accepted after stripping a trailing `Z` and replacing `T` by a space.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Normalize one series of raw records.
pub fn normalize(records: &[RawRecord]) -> Result<Vec<CanonicalRecord>, PipelineError> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        let start_time = parse_timestamp("StartTime", &record.start_time)?;
        let end_time = parse_optional_timestamp("EndTime", &record.end_time)?;

        // First occurrence wins; later records with the same start are dropped.
        if !seen.insert(start_time) {
            continue;
        }

        out.push(CanonicalRecord {
            start_time,
            end_time,
            region_code: record.region_code.clone(),
            unit: record.unit.clone(),
            sub_type: record.sub_type.clone(),
            value: record.value.clone(),
        });
    }

    Ok(out)
}

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Accepts `2022-01-01T00:00Z`, `2022-01-01T00:00:00Z`, `2022-01-01 00:00:00`,
/// `2022-01-01 00:00` and RFC 3339 with an explicit offset. Timestamps
/// without an offset are taken as UTC.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, PipelineError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(PipelineError::Parse {
            field,
            value: raw.to_string(),
            reason: "empty timestamp".to_string(),
        });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = s.strip_suffix('Z').unwrap_or(s).replacen('T', " ", 1);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&naive, fmt) {
            return Ok(dt.and_utc());
        }
    }

    Err(PipelineError::Parse {
        field,
        value: raw.to_string(),
        reason: "expected ISO-8601 date and time, e.g. 2022-01-01T00:00Z".to_string(),
    })
}

/// Like `parse_timestamp`, but an empty cell is an absent value rather than an error.
pub fn parse_optional_timestamp(
    field: &'static str,
    raw: &str,
) -> Result<Option<DateTime<Utc>>, PipelineError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_timestamp(field, raw).map(Some)
}
