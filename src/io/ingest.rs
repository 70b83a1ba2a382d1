//! CSV ingest for raw series and wide tables.
//!
//! Design goals:
//! - **Strict schema**: a missing required column is a `Schema` error, reported
//!   before any row is read
//! - **Header lookup by name**: case-insensitive, BOM-tolerant, order-free
//! - **No silent fixes**: bad cells propagate as `Parse` / `Value` errors;
//!   this layer does not skip rows

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::debug;

use crate::domain::{
    Column, LabeledRow, LabeledTable, Metric, RawRecord, RawSeries, Region, RegionConfig,
    SeriesKey, WideRow, WideTable,
};
use crate::error::PipelineError;
use crate::normalize::parse_timestamp;
use crate::resample::coerce_value;

/// A raw series file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFile {
    pub key: SeriesKey,
    pub path: PathBuf,
}

/// Map a raw series file name to its series key.
///
/// `gen_<REGION>_<PSR>.csv` is a generation sub-type series and
/// `load_<REGION>.csv` a load series. Processed and combined artifacts, and
/// names with an unknown region code, yield `None`.
pub fn parse_series_file_name(name: &str) -> Option<SeriesKey> {
    let stem = name.strip_suffix(".csv")?;
    if stem.ends_with("_processed") {
        return None;
    }
    if let Some(rest) = stem.strip_prefix("gen_") {
        let (code, psr) = rest.split_once('_')?;
        if psr.is_empty() {
            return None;
        }
        return Some(SeriesKey::generation(Region::from_code(code)?, psr));
    }
    let code = stem.strip_prefix("load_")?;
    Some(SeriesKey::load(Region::from_code(code)?))
}

/// List the raw series in `dir` that belong to configured regions, sorted by path.
pub fn discover_series(dir: &Path, config: &RegionConfig) -> Result<Vec<SeriesFile>, PipelineError> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(key) = parse_series_file_name(name) else {
            continue;
        };
        if !config.contains(key.region) {
            debug!(file = name, "skipping series of unconfigured region");
            continue;
        }
        out.push(SeriesFile { key, path });
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// Read one raw series file.
///
/// Required columns: `StartTime`, `EndTime`, `AreaID`, `UnitName` and the
/// metric's value column (`quantity` or `Load`). `PsrType` is optional and
/// defaults to the key's sub-type.
pub fn read_raw_series(file: &SeriesFile) -> Result<RawSeries, PipelineError> {
    let (headers, mut reader) = open_csv(&file.path)?;
    let header_map = build_header_map(&headers);

    let value_column = file.key.metric.value_column();
    let start = require_column(&header_map, "StartTime", &file.path)?;
    let end = require_column(&header_map, "EndTime", &file.path)?;
    let area = require_column(&header_map, "AreaID", &file.path)?;
    let unit = require_column(&header_map, "UnitName", &file.path)?;
    let value = require_column(&header_map, value_column, &file.path)?;
    let psr = header_map.get("psrtype").copied();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let sub_type = match psr {
            Some(idx) => Some(cell(&record, idx).to_string()).filter(|s| !s.is_empty()),
            None => None,
        }
        .or_else(|| file.key.sub_type.clone());

        records.push(RawRecord {
            start_time: cell(&record, start).to_string(),
            end_time: cell(&record, end).to_string(),
            region_code: cell(&record, area).to_string(),
            unit: cell(&record, unit).to_string(),
            sub_type,
            value: cell(&record, value).to_string(),
        });
    }

    Ok(RawSeries {
        key: file.key.clone(),
        records,
        source: Some(file.path.clone()),
    })
}

/// Read a wide table (`StartTime, EndTime, generation_*, load_*`).
///
/// Columns of unconfigured regions and unknown columns are ignored. Which
/// configured columns exist is recorded on the table.
pub fn read_wide_table(path: &Path, config: &RegionConfig) -> Result<WideTable, PipelineError> {
    let (table, _) = read_table(path, config, false)?;
    Ok(table)
}

/// Read a labeled table (a wide table with a trailing `label` column).
pub fn read_labeled_table(path: &Path, config: &RegionConfig) -> Result<LabeledTable, PipelineError> {
    let (table, labels) = read_table(path, config, true)?;
    let rows = table
        .rows
        .into_iter()
        .zip(labels)
        .map(|(row, label)| LabeledRow { row, label })
        .collect();
    Ok(LabeledTable {
        regions: table.regions,
        rows,
    })
}

/// Read a model output CSV: one `prediction` cell per row, in row order.
pub fn read_predictions(path: &Path) -> Result<Vec<f64>, PipelineError> {
    let (headers, mut reader) = open_csv(path)?;
    let idx = require_column(&build_header_map(&headers), "prediction", path)?;

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result?;
        let raw = cell(&record, idx);
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| PipelineError::Value {
                column: "prediction".to_string(),
                value: raw.to_string(),
            })?;
        out.push(value);
    }
    Ok(out)
}

fn read_table(
    path: &Path,
    config: &RegionConfig,
    with_label: bool,
) -> Result<(WideTable, Vec<Option<u8>>), PipelineError> {
    let (headers, mut reader) = open_csv(path)?;
    let header_map = build_header_map(&headers);

    let start = require_column(&header_map, "StartTime", path)?;
    let end = require_column(&header_map, "EndTime", path)?;
    let label = if with_label {
        Some(require_column(&header_map, "label", path)?)
    } else {
        None
    };

    let mut table = WideTable::new(config);
    let mut columns: Vec<(Column, usize)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let Some(column) = Column::parse(clean_header(name)) else {
            continue;
        };
        if !config.contains(column.region) {
            continue;
        }
        match column.metric {
            Metric::Generation => table.generation_present[column.region] = true,
            Metric::Load => table.load_present[column.region] = true,
        }
        columns.push((column, idx));
    }

    let mut labels = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = WideRow::empty(
            parse_timestamp("StartTime", cell(&record, start))?,
            parse_timestamp("EndTime", cell(&record, end))?,
        );
        for &(column, idx) in &columns {
            *row.slot_mut(column) = coerce_value(&column.name(), cell(&record, idx))?;
        }
        if let Some(idx) = label {
            labels.push(parse_label(cell(&record, idx), config)?);
        }
        table.rows.push(row);
    }

    Ok((table, labels))
}

fn parse_label(raw: &str, config: &RegionConfig) -> Result<Option<u8>, PipelineError> {
    let Some(value) = coerce_value("label", raw)? else {
        return Ok(None);
    };
    u8::try_from(value)
        .ok()
        .filter(|&id| config.region_for_label(id).is_some())
        .map(Some)
        .ok_or_else(|| PipelineError::Value {
            column: "label".to_string(),
            value: raw.to_string(),
        })
}

fn open_csv(path: &Path) -> Result<(StringRecord, csv::Reader<File>), PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader.headers()?.clone();
    Ok((headers, reader))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (clean_header(name).to_ascii_lowercase(), idx))
        .collect()
}

fn clean_header(name: &str) -> &str {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}')
}

fn require_column(
    header_map: &HashMap<String, usize>,
    name: &str,
    path: &Path,
) -> Result<usize, PipelineError> {
    header_map
        .get(&name.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| {
            PipelineError::schema(format!(
                "missing required column `{name}` in '{}'",
                path.display()
            ))
        })
}

/// Cell text, or "" for short rows.
fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}
