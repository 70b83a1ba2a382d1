//! Shared pipeline logic used by every `gsp` subcommand.
//!
//! raw series -> normalize -> resample (per series, in parallel) -> merge -> label
//!
//! The subcommands only decide where inputs come from and where outputs go.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{
    HourlySeries, LabeledTable, Metric, PipelineConfig, RawSeries, RegionConfig, WideTable,
};
use crate::error::PipelineError;
use crate::io::{export, ingest};
use crate::label::{LabelOptions, derive_labels};
use crate::merge::{combine_generation, merge};
use crate::normalize::normalize;
use crate::resample::{ResampleStats, resample};

/// Per-series result of the normalize + resample stages.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    pub series: HourlySeries,
    pub stats: ResampleStats,
}

/// All computed outputs of an alignment run.
#[derive(Debug, Clone)]
pub struct AlignOutput {
    pub outcomes: Vec<SeriesOutcome>,
    pub table: WideTable,
}

impl AlignOutput {
    /// Resample counters summed over every series.
    pub fn total_stats(&self) -> ResampleStats {
        self.outcomes
            .iter()
            .fold(ResampleStats::default(), |acc, o| ResampleStats {
                records_in: acc.records_in + o.stats.records_in,
                grid_hours: acc.grid_hours + o.stats.grid_hours,
                dropped_gaps: acc.dropped_gaps + o.stats.dropped_gaps,
                interpolated: acc.interpolated + o.stats.interpolated,
                left_null: acc.left_null + o.stats.left_null,
                dropped_misaligned: acc.dropped_misaligned + o.stats.dropped_misaligned,
                buckets_out: acc.buckets_out + o.stats.buckets_out,
            })
    }
}

/// Normalize and resample one raw series.
pub fn process_series(raw: &RawSeries) -> Result<SeriesOutcome, PipelineError> {
    let canonical = normalize(&raw.records)?;
    let resampled = resample(&raw.key, &canonical)?;
    debug!(
        series = %raw.key,
        records_in = resampled.stats.records_in,
        buckets_out = resampled.stats.buckets_out,
        dropped_gaps = resampled.stats.dropped_gaps,
        dropped_misaligned = resampled.stats.dropped_misaligned,
        interpolated = resampled.stats.interpolated,
        "resampled series"
    );

    Ok(SeriesOutcome {
        series: HourlySeries {
            key: raw.key.clone(),
            buckets: resampled.buckets,
        },
        stats: resampled.stats,
    })
}

/// Align in-memory raw series into the wide table.
///
/// Series are processed in parallel; the output does not depend on scheduling
/// because `collect` keeps input order and the merge sorts by interval.
pub fn align(raw: &[RawSeries], config: &RegionConfig) -> Result<AlignOutput, PipelineError> {
    let outcomes = raw
        .par_iter()
        .map(process_series)
        .collect::<Result<Vec<_>, _>>()?;

    let series: Vec<HourlySeries> = outcomes.iter().map(|o| o.series.clone()).collect();
    let table = merge(config, &series)?;
    info!(series = outcomes.len(), rows = table.rows.len(), "merged wide table");

    Ok(AlignOutput { outcomes, table })
}

/// Discover, read and align every series under `config.input_dir`.
///
/// Interim artifacts are written when `config.interim_dir` is set.
pub fn align_dir(config: &PipelineConfig) -> Result<AlignOutput, PipelineError> {
    // 1) Discover and read raw files.
    let files = ingest::discover_series(&config.input_dir, &config.regions)?;
    info!(dir = %config.input_dir.display(), files = files.len(), "discovered series");

    let raw = files
        .par_iter()
        .map(ingest::read_raw_series)
        .collect::<Result<Vec<_>, _>>()?;

    // 2) Resample + merge.
    let output = align(&raw, &config.regions)?;

    // 3) Optional interim artifacts.
    if let Some(dir) = &config.interim_dir {
        write_interim(dir, &output, &config.regions)?;
    }

    Ok(output)
}

/// Derive labels for an aligned table.
pub fn label_table(
    table: WideTable,
    config: &RegionConfig,
    options: &LabelOptions,
) -> Result<LabeledTable, PipelineError> {
    let labeled = derive_labels(table, config, options)?;
    let undefined = labeled.rows.iter().filter(|r| r.label.is_none()).count();
    info!(rows = labeled.rows.len(), undefined, "derived labels");
    Ok(labeled)
}

fn write_interim(dir: &Path, output: &AlignOutput, config: &RegionConfig) -> Result<(), PipelineError> {
    for outcome in &output.outcomes {
        let path = dir.join(export::processed_file_name(&outcome.series.key));
        export::write_processed_series(&path, &outcome.series)?;
    }

    for region in config.regions() {
        let generation: Vec<&HourlySeries> = output
            .outcomes
            .iter()
            .map(|o| &o.series)
            .filter(|s| s.key.region == region && s.key.metric == Metric::Generation)
            .collect();
        if generation.is_empty() {
            continue;
        }
        let path = dir.join(export::combined_file_name(region));
        export::write_combined_generation(&path, &combine_generation(&generation))?;
    }

    info!(dir = %dir.display(), "wrote interim artifacts");
    Ok(())
}
