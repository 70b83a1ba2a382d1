//! CSV writers for the pipeline artifacts.
//!
//! - processed series: `<series>_processed.csv`, raw schema on the hourly grid
//! - combined generation: `combined_gen_<REGION>.csv`
//! - wide table and labeled table (the delivery artifacts)
//!
//! Timestamps are written as `YYYY-MM-DD HH:MM:SS` in UTC; missing values as
//! empty cells.

use std::fs::{self, File};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::{CombinedBucket, HourlySeries, LabeledTable, Metric, Region, SeriesKey, WideTable};
use crate::error::PipelineError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn processed_file_name(key: &SeriesKey) -> String {
    format!("{key}_processed.csv")
}

pub fn combined_file_name(region: Region) -> String {
    format!("combined_gen_{}.csv", region.code())
}

/// Write one resampled series in the raw schema.
pub fn write_processed_series(path: &Path, series: &HourlySeries) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;

    let mut header = vec!["StartTime", "EndTime", "AreaID", "UnitName"];
    if series.key.metric == Metric::Generation {
        header.push("PsrType");
    }
    header.push(series.key.metric.value_column());
    writer.write_record(&header)?;

    for b in &series.buckets {
        let mut record = vec![
            format_timestamp(b.start_time),
            format_timestamp(b.end_time),
            b.region_code.clone(),
            b.unit.clone(),
        ];
        if series.key.metric == Metric::Generation {
            record.push(b.sub_type.clone().unwrap_or_default());
        }
        record.push(format_value(b.value));
        writer.write_record(&record)?;
    }

    finish(writer, path)
}

/// Write a region's generation total (sub-types collapsed).
pub fn write_combined_generation(path: &Path, buckets: &[CombinedBucket]) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;
    writer.write_record(["StartTime", "EndTime", "AreaID", "quantity"])?;
    for b in buckets {
        writer.write_record([
            format_timestamp(b.start_time),
            format_timestamp(b.end_time),
            b.region_code.clone(),
            format_value(b.quantity),
        ])?;
    }
    finish(writer, path)
}

/// Write the wide table: `StartTime, EndTime, generation_*, load_*`.
pub fn write_wide_table(path: &Path, table: &WideTable) -> Result<(), PipelineError> {
    let columns = table.columns();
    let mut writer = create_writer(path)?;

    let mut header = vec!["StartTime".to_string(), "EndTime".to_string()];
    header.extend(columns.iter().map(|c| c.name()));
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![format_timestamp(row.start_time), format_timestamp(row.end_time)];
        record.extend(columns.iter().map(|&c| format_value(row.get(c))));
        writer.write_record(&record)?;
    }

    finish(writer, path)
}

/// Write the labeled table: the wide table columns followed by `label`.
pub fn write_labeled_table(path: &Path, table: &LabeledTable) -> Result<(), PipelineError> {
    let columns = table.columns();
    let mut writer = create_writer(path)?;

    let mut header = vec!["StartTime".to_string(), "EndTime".to_string()];
    header.extend(columns.iter().map(|c| c.name()));
    header.push("label".to_string());
    writer.write_record(&header)?;

    for labeled in &table.rows {
        let row = &labeled.row;
        let mut record = vec![format_timestamp(row.start_time), format_timestamp(row.end_time)];
        record.extend(columns.iter().map(|&c| format_value(row.get(c))));
        record.push(labeled.label.map(|l| l.to_string()).unwrap_or_default());
        writer.write_record(&record)?;
    }

    finish(writer, path)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn format_value(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>, PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

fn finish(mut writer: csv::Writer<File>, path: &Path) -> Result<(), PipelineError> {
    writer.flush().map_err(|e| PipelineError::io(path, e))
}
