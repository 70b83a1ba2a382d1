//! Hand-off helpers for the downstream forecasting model.
//!
//! The model itself lives elsewhere; this module covers the edges it shares
//! with the pipeline:
//!
//! - chronological train/holdout split of the labeled table
//! - forecast scoring (MSE / RMSE) against the holdout labels
//! - the predictions and metrics JSON files
//!
//! `gsp split` and `gsp evaluate` drive these.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::LabeledRow;
use crate::error::PipelineError;

/// Default share of rows held out for evaluation.
pub const DEFAULT_HOLDOUT_FRACTION: f64 = 0.2;

/// Split `rows` into `(train, holdout)` without shuffling.
///
/// The holdout is the last `ceil(n * holdout_fraction)` rows.
pub fn chronological_split<T: Clone>(
    rows: &[T],
    holdout_fraction: f64,
) -> Result<(Vec<T>, Vec<T>), PipelineError> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(PipelineError::InvalidArgument(format!(
            "holdout fraction must be in (0, 1), got {holdout_fraction}"
        )));
    }

    let n = rows.len();
    let holdout = ((n as f64) * holdout_fraction).ceil() as usize;
    let cut = n - holdout.min(n);
    Ok((rows[..cut].to_vec(), rows[cut..].to_vec()))
}

/// Forecast error summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastMetrics {
    pub n: usize,
    pub mse: f64,
    pub rmse: f64,
}

/// Mean squared error and its root between `actual` and `predicted`.
pub fn evaluate_forecast(actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics, PipelineError> {
    if actual.len() != predicted.len() {
        return Err(PipelineError::InvalidArgument(format!(
            "length mismatch: {} actual vs {} predicted values",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(PipelineError::InvalidArgument(
            "cannot evaluate an empty forecast".to_string(),
        ));
    }

    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let mse = sse / actual.len() as f64;

    Ok(ForecastMetrics {
        n: actual.len(),
        mse,
        rmse: mse.sqrt(),
    })
}

/// Labels of `rows` as regression targets. Every row needs a defined label.
pub fn label_targets(rows: &[LabeledRow]) -> Result<Vec<f64>, PipelineError> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| {
            r.label.map(f64::from).ok_or_else(|| {
                PipelineError::InvalidArgument(format!("holdout row {i} has no label"))
            })
        })
        .collect()
}

/// On-disk shape of the predictions file: `{"target": {"0": 3, "1": 5, ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionFile {
    pub target: BTreeMap<String, i64>,
}

impl PredictionFile {
    /// Round every prediction up to the next integer label.
    pub fn from_predictions(predictions: &[f64]) -> Result<Self, PipelineError> {
        let mut target = BTreeMap::new();
        for (i, &p) in predictions.iter().enumerate() {
            if !p.is_finite() {
                return Err(PipelineError::InvalidArgument(format!(
                    "prediction {i} is not finite ({p})"
                )));
            }
            target.insert(i.to_string(), p.ceil() as i64);
        }
        Ok(Self { target })
    }
}

/// Write predictions as pretty JSON.
pub fn write_predictions_json(path: &Path, predictions: &[f64]) -> Result<(), PipelineError> {
    write_json(path, &PredictionFile::from_predictions(predictions)?)
}

pub fn write_metrics_json(path: &Path, metrics: &ForecastMetrics) -> Result<(), PipelineError> {
    write_json(path, metrics)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let handle = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(handle);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}
