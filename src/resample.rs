//! Hourly resampling of one canonical series.
//!
//! Steps, in order:
//!
//! 1) coerce values to integers (`Value` error on non-numeric text)
//! 2) bucket records by `floor(start_time, 1h)`
//! 3) aggregate per bucket: last `end_time`, first metadata, summed value
//! 4) drop hours without an `end_time` (data gaps)
//! 5) linearly interpolate missing values between the nearest known buckets
//! 6) drop buckets that do not end exactly one whole hour after they start
//!
//! Steps 4 and 6 are deliberate drops, counted in `ResampleStats` but never
//! reported as errors.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::domain::{CanonicalRecord, HourlyBucket, SeriesKey};
use crate::error::PipelineError;

const HOUR_SECS: i64 = 3600;

/// Counters describing what resampling did to a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleStats {
    pub records_in: usize,
    /// Hours between the first and last populated bucket (inclusive).
    pub grid_hours: usize,
    pub dropped_gaps: usize,
    pub interpolated: usize,
    /// Missing values with no known neighbour on one side.
    pub left_null: usize,
    pub dropped_misaligned: usize,
    pub buckets_out: usize,
}

#[derive(Debug, Clone)]
pub struct Resampled {
    pub buckets: Vec<HourlyBucket>,
    pub stats: ResampleStats,
}

struct Accumulator {
    end_time: Option<DateTime<Utc>>,
    region_code: String,
    unit: String,
    sub_type: Option<String>,
    value: Option<i64>,
}

/// Resample one `(region, metric, sub_type)` series onto the hourly grid.
pub fn resample(key: &SeriesKey, records: &[CanonicalRecord]) -> Result<Resampled, PipelineError> {
    let mut stats = ResampleStats {
        records_in: records.len(),
        ..ResampleStats::default()
    };

    check_region_metadata(key, records)?;

    // 1) Coerce every value up front so a bad cell fails the series even if
    //    its bucket would later be dropped.
    let values = records
        .iter()
        .map(|r| coerce_value(key.metric.value_column(), &r.value))
        .collect::<Result<Vec<_>, _>>()?;

    // 2) + 3) Bucket in arrival order.
    let mut buckets: BTreeMap<i64, Accumulator> = BTreeMap::new();
    for (record, value) in records.iter().zip(values) {
        let hour = floor_hour(record.start_time);
        let acc = buckets.entry(hour).or_insert_with(|| Accumulator {
            end_time: None,
            region_code: record.region_code.clone(),
            unit: record.unit.clone(),
            sub_type: record.sub_type.clone(),
            value: None,
        });
        if record.end_time.is_some() {
            acc.end_time = record.end_time;
        }
        if let Some(v) = value {
            acc.value = Some(acc.value.unwrap_or(0).saturating_add(v));
        }
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(Resampled {
            buckets: Vec::new(),
            stats,
        });
    };
    stats.grid_hours = ((last - first) / HOUR_SECS) as usize + 1;

    // 4) Hours with no record, or with no end time, are gaps.
    let mut grid = Vec::with_capacity(buckets.len());
    for (hour, acc) in buckets {
        let Some(end_time) = acc.end_time else {
            continue;
        };
        let start_time = hour_instant(hour)?;
        grid.push(HourlyBucket {
            start_time,
            end_time,
            region_code: acc.region_code,
            unit: acc.unit,
            sub_type: acc.sub_type,
            value: acc.value,
        });
    }
    stats.dropped_gaps = stats.grid_hours - grid.len();

    // 5) Interpolate.
    let (interpolated, left_null) = interpolate_missing(&mut grid);
    stats.interpolated = interpolated;
    stats.left_null = left_null;

    // 6) Enforce exact hour alignment.
    let before = grid.len();
    grid.retain(is_hour_aligned);
    stats.dropped_misaligned = before - grid.len();
    stats.buckets_out = grid.len();

    Ok(Resampled {
        buckets: grid,
        stats,
    })
}

/// Coerce a raw value cell to an integer.
///
/// Empty text is a missing value; decimals are truncated toward zero.
pub fn coerce_value(column: &str, raw: &str) -> Result<Option<i64>, PipelineError> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v.trunc() as i64)),
        _ => Err(PipelineError::Value {
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Whether a bucket covers exactly `[h, h + 1h)` for a whole hour `h`.
pub fn is_hour_aligned(bucket: &HourlyBucket) -> bool {
    let end = bucket.end_time;
    end.minute() == 0
        && end.second() == 0
        && end.nanosecond() == 0
        && end - bucket.start_time == Duration::hours(1)
}

fn check_region_metadata(key: &SeriesKey, records: &[CanonicalRecord]) -> Result<(), PipelineError> {
    for record in records {
        if record.region_code.trim().is_empty() {
            return Err(PipelineError::schema(format!(
                "{key}: record at {} has no AreaID",
                record.start_time
            )));
        }
        if !key.region.matches_area(&record.region_code) {
            return Err(PipelineError::schema(format!(
                "{key}: AreaID '{}' does not belong to region {}",
                record.region_code, key.region
            )));
        }
    }
    Ok(())
}

fn floor_hour(ts: DateTime<Utc>) -> i64 {
    let secs = ts.timestamp();
    secs - secs.rem_euclid(HOUR_SECS)
}

fn hour_instant(secs: i64) -> Result<DateTime<Utc>, PipelineError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| PipelineError::Parse {
        field: "StartTime",
        value: secs.to_string(),
        reason: "timestamp out of range".to_string(),
    })
}

/// Fill missing values from the nearest known neighbours on both sides,
/// weighted by position in the bucket sequence. Returns `(interpolated, left_null)`.
fn interpolate_missing(buckets: &mut [HourlyBucket]) -> (usize, usize) {
    let known: Vec<usize> = buckets
        .iter()
        .enumerate()
        .filter(|(_, b)| b.value.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut interpolated = 0;
    let mut left_null = 0;

    for i in 0..buckets.len() {
        if buckets[i].value.is_some() {
            continue;
        }
        // `known` is sorted; the partition point is the first known index after `i`.
        let after = known.partition_point(|&k| k < i);
        let (Some(&lo), Some(&hi)) = (
            after.checked_sub(1).and_then(|p| known.get(p)),
            known.get(after),
        ) else {
            left_null += 1;
            continue;
        };
        let (Some(y0), Some(y1)) = (buckets[lo].value, buckets[hi].value) else {
            left_null += 1;
            continue;
        };

        // Evenly spaced over the surviving buckets; dropped gap hours do not count.
        let frac = (i - lo) as f64 / (hi - lo) as f64;
        let y = y0 as f64 + (y1 as f64 - y0 as f64) * frac;
        buckets[i].value = Some(y.round() as i64);
        interpolated += 1;
    }

    (interpolated, left_null)
}
