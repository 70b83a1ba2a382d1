//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - resolves directories from flags, `.env` and the environment
//! - runs the pipeline stages for the chosen subcommand
//! - writes the CSV artifacts and prints summaries

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{
    AlignArgs, Cli, Command, EvaluateArgs, LabelArgs, RunArgs, SourceArgs, SplitArgs,
};
use crate::domain::{LabeledTable, PipelineConfig, RegionConfig, WideTable};
use crate::error::AppError;
use crate::label::LabelOptions;

pub mod pipeline;

pub const INPUT_DIR_ENV: &str = "GSP_INPUT_DIR";
pub const INTERIM_DIR_ENV: &str = "GSP_INTERIM_DIR";

/// Entry point for the `gsp` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::new(4, format!("failed to install log subscriber: {e}")))?;

    match cli.command {
        Command::Align(args) => handle_align(args),
        Command::Label(args) => handle_label(args),
        Command::Run(args) => handle_run(args),
        Command::Split(args) => handle_split(args),
        Command::Evaluate(args) => handle_evaluate(args),
    }
}

fn handle_align(args: AlignArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.source)?;
    let output = pipeline::align_dir(&config)?;
    println!("{}", crate::report::format_align_summary(&output));

    require_aligned_rows(&output.table)?;
    crate::io::export::write_wide_table(&args.output, &output.table)?;
    info!(path = %args.output.display(), "wrote wide table");
    Ok(())
}

fn handle_label(args: LabelArgs) -> Result<(), AppError> {
    let regions = RegionConfig::reference();
    let table = crate::io::ingest::read_wide_table(&args.input, &regions)?;
    let labeled = pipeline::label_table(table, &regions, &LabelOptions::default())?;
    write_labeled(&args.output, &labeled, &regions)
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.source)?;
    let output = pipeline::align_dir(&config)?;
    println!("{}", crate::report::format_align_summary(&output));

    require_aligned_rows(&output.table)?;
    if let Some(path) = &args.wide_output {
        crate::io::export::write_wide_table(path, &output.table)?;
    }

    let labeled = pipeline::label_table(output.table, &config.regions, &config.label_options)?;
    write_labeled(&args.output, &labeled, &config.regions)
}

fn handle_split(args: SplitArgs) -> Result<(), AppError> {
    let regions = RegionConfig::reference();
    let table = crate::io::ingest::read_labeled_table(&args.input, &regions)?;
    if table.rows.is_empty() {
        return Err(AppError::new(3, "Labeled table has no rows to split."));
    }

    let (train, holdout) = crate::handoff::chronological_split(&table.rows, args.holdout_fraction)?;
    println!("{}", crate::report::format_split_summary(train.len(), holdout.len()));

    for (path, rows) in [(&args.train, train), (&args.holdout, holdout)] {
        let part = LabeledTable {
            regions: table.regions.clone(),
            rows,
        };
        crate::io::export::write_labeled_table(path, &part)?;
    }
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let regions = RegionConfig::reference();
    let holdout = crate::io::ingest::read_labeled_table(&args.holdout, &regions)?;
    let predictions = crate::io::ingest::read_predictions(&args.predictions)?;

    let actual = crate::handoff::label_targets(&holdout.rows)?;
    let metrics = crate::handoff::evaluate_forecast(&actual, &predictions)?;
    println!("{}", crate::report::format_forecast_metrics(&metrics));

    crate::handoff::write_predictions_json(&args.output, &predictions)?;
    if let Some(path) = &args.metrics {
        crate::handoff::write_metrics_json(path, &metrics)?;
    }
    info!(path = %args.output.display(), "wrote predictions");
    Ok(())
}

/// Exit code 3 when nothing survived alignment.
fn require_aligned_rows(table: &WideTable) -> Result<(), AppError> {
    if table.rows.is_empty() {
        return Err(AppError::new(3, "No hourly rows survived alignment."));
    }
    Ok(())
}

fn write_labeled(
    path: &std::path::Path,
    labeled: &LabeledTable,
    regions: &RegionConfig,
) -> Result<(), AppError> {
    println!("{}", crate::report::format_label_summary(labeled, regions));
    if labeled.rows.is_empty() {
        return Err(AppError::new(3, "No rows to label."));
    }
    crate::io::export::write_labeled_table(path, labeled)?;
    info!(path = %path.display(), "wrote labeled table");
    Ok(())
}

/// Build the pipeline configuration from flags, falling back to the environment.
pub fn pipeline_config_from_args(args: &SourceArgs) -> Result<PipelineConfig, AppError> {
    dotenvy::dotenv().ok();

    let input_dir = args
        .input_dir
        .clone()
        .or_else(|| env_path(INPUT_DIR_ENV))
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("No input directory: pass --input-dir or set {INPUT_DIR_ENV} (env or .env)."),
            )
        })?;
    let interim_dir = args.interim_dir.clone().or_else(|| env_path(INTERIM_DIR_ENV));

    Ok(PipelineConfig {
        input_dir,
        interim_dir,
        regions: RegionConfig::reference(),
        label_options: LabelOptions::default(),
    })
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
