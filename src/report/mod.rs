//! Terminal summaries printed by the `gsp` subcommands.
//!
//! Formatting lives here so pipeline code never builds strings for humans.

use crate::app::pipeline::{AlignOutput, SeriesOutcome};
use crate::domain::{LabeledTable, RegionConfig};
use crate::handoff::ForecastMetrics;

/// Dataset-level summary of an alignment run.
pub fn format_align_summary(output: &AlignOutput) -> String {
    let mut out = String::new();
    let stats = output.total_stats();

    out.push_str("=== gsp - alignment ===\n");
    out.push_str(&format!("Series: n={}\n", output.outcomes.len()));
    out.push_str(&format!(
        "Records: in={} | hourly buckets out={}\n",
        stats.records_in, stats.buckets_out
    ));
    out.push_str(&format!(
        "Dropped: gaps={} | misaligned={} | Interpolated={} | left null={}\n",
        stats.dropped_gaps, stats.dropped_misaligned, stats.interpolated, stats.left_null
    ));
    out.push_str(&format!("Wide table: rows={}\n", output.table.rows.len()));
    if let (Some(first), Some(last)) = (output.table.rows.first(), output.table.rows.last()) {
        out.push_str(&format!("Span: {} .. {}\n", first.start_time, last.end_time));
    }

    out.push('\n');
    out.push_str(&format_series_table(&output.outcomes));
    out
}

fn format_series_table(outcomes: &[SeriesOutcome]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<18} {:>8} {:>8} {:>6} {:>10} {:>7}\n",
        "series", "records", "buckets", "gaps", "misaligned", "interp"
    ));
    out.push_str(&format!(
        "{:-<18} {:-<8} {:-<8} {:-<6} {:-<10} {:-<7}\n",
        "", "", "", "", "", ""
    ));
    for o in outcomes {
        out.push_str(&format!(
            "{:<18} {:>8} {:>8} {:>6} {:>10} {:>7}\n",
            o.series.key.to_string(),
            o.stats.records_in,
            o.stats.buckets_out,
            o.stats.dropped_gaps,
            o.stats.dropped_misaligned,
            o.stats.interpolated,
        ));
    }
    out
}

/// Label histogram in configured region order.
pub fn format_label_summary(table: &LabeledTable, config: &RegionConfig) -> String {
    let mut out = String::new();
    out.push_str("=== gsp - labels ===\n");
    out.push_str(&format!("Rows: n={}\n", table.rows.len()));

    out.push_str(&format!("{:<8} {:>4} {:>8}\n", "region", "id", "rows"));
    out.push_str(&format!("{:-<8} {:-<4} {:-<8}\n", "", "", ""));
    for entry in config.entries() {
        let count = table
            .rows
            .iter()
            .filter(|r| r.label == Some(entry.label_id))
            .count();
        out.push_str(&format!(
            "{:<8} {:>4} {:>8}\n",
            entry.region.code(),
            entry.label_id,
            count
        ));
    }

    let undefined = table.rows.iter().filter(|r| r.label.is_none()).count();
    if undefined > 0 {
        out.push_str(&format!("{:<8} {:>4} {:>8}\n", "(none)", "-", undefined));
    }
    out
}

pub fn format_forecast_metrics(metrics: &ForecastMetrics) -> String {
    format!(
        "Forecast: n={} | MSE={:.4} | RMSE={:.4}\n",
        metrics.n, metrics.mse, metrics.rmse
    )
}

pub fn format_split_summary(train: usize, holdout: usize) -> String {
    format!("Split: train={train} | holdout={holdout}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LabeledRow, Region, WideRow};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn label_summary_counts_per_region_and_undefined() {
        let config = RegionConfig::new(&[(Region::Spain, 0), (Region::Germany, 1)]).unwrap();
        let start = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let row = |h: i64, label| LabeledRow {
            row: WideRow::empty(start + Duration::hours(h), start + Duration::hours(h + 1)),
            label,
        };
        let table = LabeledTable {
            regions: vec![Region::Spain, Region::Germany],
            rows: vec![row(0, Some(1)), row(1, Some(1)), row(2, None)],
        };

        let text = format_label_summary(&table, &config);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Rows: n=3");
        assert!(lines[4].starts_with("SP") && lines[4].ends_with(" 0"));
        assert!(lines[5].starts_with("DE") && lines[5].ends_with(" 2"));
        assert!(lines[6].starts_with("(none)") && lines[6].ends_with(" 1"));
    }
}
