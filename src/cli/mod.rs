//! Command-line parsing for the `gsp` binary.
//!
//! Parsing lives here; dispatch lives in `app`. Directory flags that are
//! omitted fall back to `GSP_INPUT_DIR` / `GSP_INTERIM_DIR` (read from the
//! environment or a `.env` file).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::handoff::DEFAULT_HOLDOUT_FRACTION;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gsp",
    version,
    about = "Align regional generation/load telemetry and label the surplus region"
)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resample and merge raw series into the wide table.
    Align(AlignArgs),
    /// Derive surplus labels for a wide table.
    Label(LabelArgs),
    /// Align then label in one go.
    Run(RunArgs),
    /// Split a labeled table into chronological train/holdout files.
    Split(SplitArgs),
    /// Score model predictions against the holdout labels.
    Evaluate(EvaluateArgs),
}

/// Where raw series come from and where interim artifacts go.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Directory with raw `gen_<REGION>_<PSR>.csv` and `load_<REGION>.csv` files.
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Write processed and combined series here.
    #[arg(long, value_name = "DIR")]
    pub interim_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct AlignArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Wide table CSV to write.
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct LabelArgs {
    /// Wide table CSV produced by `gsp align`.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Labeled table CSV to write.
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Labeled table CSV to write.
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,

    /// Also write the unlabeled wide table.
    #[arg(long, value_name = "CSV")]
    pub wide_output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SplitArgs {
    /// Labeled table CSV.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Train rows (earliest part of the table).
    #[arg(long, value_name = "CSV")]
    pub train: PathBuf,

    /// Holdout rows (latest part of the table).
    #[arg(long, value_name = "CSV")]
    pub holdout: PathBuf,

    /// Share of rows held out, in (0, 1).
    #[arg(long, default_value_t = DEFAULT_HOLDOUT_FRACTION)]
    pub holdout_fraction: f64,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateArgs {
    /// Holdout CSV produced by `gsp split`.
    #[arg(long, value_name = "CSV")]
    pub holdout: PathBuf,

    /// Model output: a CSV with one `prediction` per holdout row, in order.
    #[arg(long, value_name = "CSV")]
    pub predictions: PathBuf,

    /// Predictions JSON to write (`{"target": {"0": ..}}`).
    #[arg(long, value_name = "JSON")]
    pub output: PathBuf,

    /// Also write MSE/RMSE as JSON.
    #[arg(long, value_name = "JSON")]
    pub metrics: Option<PathBuf>,
}
