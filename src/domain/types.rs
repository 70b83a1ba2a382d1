//! Record, bucket and table types shared by every stage.
//!
//! Shape of the data as it moves through the pipeline:
//!
//! - `RawRecord`       text fields as delivered by the fetch collaborator
//! - `CanonicalRecord` parsed UTC instants, unique start times per series
//! - `HourlyBucket`    one value per hour on the resampled grid
//! - `WideRow`         one row per `(start, end)` interval across all regions
//! - `LabeledRow`      a wide row plus the surplus label

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::region::{Region, RegionConfig, RegionMap};

/// Telemetry metric of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Generation,
    Load,
}

impl Metric {
    /// Name of the value column in raw and processed series files.
    pub fn value_column(self) -> &'static str {
        match self {
            Metric::Generation => "quantity",
            Metric::Load => "Load",
        }
    }

    /// Prefix of the per-region columns of the wide table.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Metric::Generation => "generation",
            Metric::Load => "load",
        }
    }

    /// Prefix of raw series file names.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Metric::Generation => "gen",
            Metric::Load => "load",
        }
    }
}

/// Identity of one raw series: `(region, metric, sub_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub region: Region,
    pub metric: Metric,
    /// Generation source category (ENTSO-E `PsrType`), absent for load.
    pub sub_type: Option<String>,
}

impl SeriesKey {
    pub fn generation(region: Region, sub_type: impl Into<String>) -> Self {
        Self {
            region,
            metric: Metric::Generation,
            sub_type: Some(sub_type.into()),
        }
    }

    pub fn load(region: Region) -> Self {
        Self {
            region,
            metric: Metric::Load,
            sub_type: None,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_type {
            Some(sub) => write!(f, "{}_{}_{}", self.metric.file_prefix(), self.region, sub),
            None => write!(f, "{}_{}", self.metric.file_prefix(), self.region),
        }
    }
}

/// A record exactly as delivered: timestamps and value are still text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub start_time: String,
    pub end_time: String,
    /// `AreaID` (EIC code of the bidding zone).
    pub region_code: String,
    pub unit: String,
    pub sub_type: Option<String>,
    /// Raw cell text; an empty cell is a missing value.
    pub value: String,
}

/// A raw series: all records of one `(region, metric, sub_type)` in arrival order.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub key: SeriesKey,
    pub records: Vec<RawRecord>,
    /// File the series was read from, if any.
    pub source: Option<PathBuf>,
}

/// A record with parsed UTC timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub start_time: DateTime<Utc>,
    /// `None` when the source cell was empty.
    pub end_time: Option<DateTime<Utc>>,
    pub region_code: String,
    pub unit: String,
    pub sub_type: Option<String>,
    pub value: String,
}

/// One hour of a resampled series.
///
/// Emitted buckets satisfy `end_time == start_time + 1h` with `start_time`
/// on a whole hour. `value` is `None` only when interpolation had no known
/// neighbour on one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyBucket {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub region_code: String,
    pub unit: String,
    pub sub_type: Option<String>,
    pub value: Option<i64>,
}

/// A resampled series.
#[derive(Debug, Clone)]
pub struct HourlySeries {
    pub key: SeriesKey,
    pub buckets: Vec<HourlyBucket>,
}

/// Per-region generation total for one interval (sub-types collapsed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedBucket {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub region_code: String,
    pub quantity: Option<i64>,
}

/// A `(metric, region)` column of the wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub metric: Metric,
    pub region: Region,
}

impl Column {
    pub fn generation(region: Region) -> Self {
        Self {
            metric: Metric::Generation,
            region,
        }
    }

    pub fn load(region: Region) -> Self {
        Self {
            metric: Metric::Load,
            region,
        }
    }

    /// CSV header, e.g. `generation_SP`.
    pub fn name(self) -> String {
        format!("{}_{}", self.metric.column_prefix(), self.region.code())
    }

    /// Inverse of `name`.
    pub fn parse(name: &str) -> Option<Self> {
        let (prefix, code) = name.trim().split_once('_')?;
        let metric = if prefix.eq_ignore_ascii_case(Metric::Generation.column_prefix()) {
            Metric::Generation
        } else if prefix.eq_ignore_ascii_case(Metric::Load.column_prefix()) {
            Metric::Load
        } else {
            return None;
        };
        Some(Self {
            metric,
            region: Region::from_code(code)?,
        })
    }
}

/// One interval of the wide table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WideRow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub generation: RegionMap<Option<i64>>,
    pub load: RegionMap<Option<i64>>,
}

impl WideRow {
    pub fn empty(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            generation: RegionMap::filled(None),
            load: RegionMap::filled(None),
        }
    }

    pub fn get(&self, column: Column) -> Option<i64> {
        match column.metric {
            Metric::Generation => self.generation[column.region],
            Metric::Load => self.load[column.region],
        }
    }

    pub fn slot_mut(&mut self, column: Column) -> &mut Option<i64> {
        match column.metric {
            Metric::Generation => &mut self.generation[column.region],
            Metric::Load => &mut self.load[column.region],
        }
    }
}

/// The merged cross-region table.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    /// Column regions, in configuration order.
    pub regions: Vec<Region>,
    /// Whether any generation series/column exists for a region.
    pub generation_present: RegionMap<bool>,
    /// Whether a load series/column exists for a region.
    pub load_present: RegionMap<bool>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn new(config: &RegionConfig) -> Self {
        Self {
            regions: config.regions().collect(),
            generation_present: RegionMap::filled(false),
            load_present: RegionMap::filled(false),
            rows: Vec::new(),
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        match column.metric {
            Metric::Generation => self.generation_present[column.region],
            Metric::Load => self.load_present[column.region],
        }
    }

    /// Output columns: all generation columns, then all load columns.
    pub fn columns(&self) -> Vec<Column> {
        table_columns(&self.regions)
    }
}

/// A wide row with its derived label (`None` when no surplus was defined).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRow {
    pub row: WideRow,
    pub label: Option<u8>,
}

/// Output of the label stage; same columns as the wide table plus `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub regions: Vec<Region>,
    pub rows: Vec<LabeledRow>,
}

impl LabeledTable {
    pub fn columns(&self) -> Vec<Column> {
        table_columns(&self.regions)
    }
}

fn table_columns(regions: &[Region]) -> Vec<Column> {
    let mut out: Vec<Column> = regions.iter().map(|&r| Column::generation(r)).collect();
    out.extend(regions.iter().map(|&r| Column::load(r)));
    out
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags plus `.env`/environment defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding raw `gen_*.csv` / `load_*.csv` series.
    pub input_dir: PathBuf,
    /// Where processed and combined artifacts are written (skipped when `None`).
    pub interim_dir: Option<PathBuf>,
    pub regions: RegionConfig,
    pub label_options: crate::label::LabelOptions,
}
