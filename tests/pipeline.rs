//! End-to-end runs over raw CSV directories.

use std::fs;
use std::path::{Path, PathBuf};

use green_surplus::app::pipeline::{align_dir, label_table};
use green_surplus::domain::{PipelineConfig, Region, RegionConfig};
use green_surplus::io::{export, ingest};
use green_surplus::label::LabelOptions;

fn write_generation(dir: &Path, region: Region, psr: &str, rows: &[(&str, &str, &str)]) {
    let mut text = String::from("StartTime,EndTime,AreaID,UnitName,PsrType,quantity\n");
    for (start, end, value) in rows {
        text.push_str(&format!("{start},{end},{},MAW,{psr},{value}\n", region.area_code()));
    }
    fs::write(dir.join(format!("gen_{}_{psr}.csv", region.code())), text).unwrap();
}

fn write_load(dir: &Path, region: Region, rows: &[(&str, &str, &str)]) {
    let mut text = String::from("StartTime,EndTime,AreaID,UnitName,Load\n");
    for (start, end, value) in rows {
        text.push_str(&format!("{start},{end},{},MAW,{value}\n", region.area_code()));
    }
    fs::write(dir.join(format!("load_{}.csv", region.code())), text).unwrap();
}

fn config(input_dir: PathBuf, regions: RegionConfig) -> PipelineConfig {
    PipelineConfig {
        input_dir,
        interim_dir: None,
        regions,
        label_options: LabelOptions { integer_columns: Vec::new() },
    }
}

const H0: (&str, &str) = ("2022-01-01T00:00Z", "2022-01-01T01:00Z");
const H1: (&str, &str) = ("2022-01-01T01:00Z", "2022-01-01T02:00Z");

/// Spain (A) and Germany (B) report generation and load; Italy (C) only load.
fn three_region_fixture(dir: &Path) -> RegionConfig {
    write_generation(dir, Region::Spain, "B16", &[(H0.0, H0.1, "100"), (H1.0, H1.1, "10")]);
    write_generation(dir, Region::Germany, "B19", &[(H0.0, H0.1, "30"), (H1.0, H1.1, "30")]);
    write_load(dir, Region::Spain, &[(H0.0, H0.1, "40"), (H1.0, H1.1, "40")]);
    write_load(dir, Region::Germany, &[(H0.0, H0.1, "50"), (H1.0, H1.1, "50")]);
    write_load(dir, Region::Italy, &[(H0.0, H0.1, "10"), (H1.0, H1.1, "5")]);
    RegionConfig::new(&[(Region::Spain, 0), (Region::Germany, 1), (Region::Italy, 2)]).unwrap()
}

#[test]
fn largest_surplus_region_labels_the_hour() {
    let dir = tempfile::tempdir().unwrap();
    let regions = three_region_fixture(dir.path());
    let cfg = config(dir.path().to_path_buf(), regions);

    let aligned = align_dir(&cfg).unwrap();
    let labeled = label_table(aligned.table, &cfg.regions, &cfg.label_options).unwrap();

    // Hour 0: SP 60, DE -20, IT -10.
    assert_eq!(labeled.rows[0].label, Some(0));
    // Hour 1: SP -30, DE -20, IT 0 - 5: the region without generation still competes.
    assert_eq!(labeled.rows[1].label, Some(2));
}

#[test]
fn repeated_runs_write_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let regions = three_region_fixture(dir.path());
    let out = tempfile::tempdir().unwrap();
    let cfg = config(dir.path().to_path_buf(), regions);

    let mut outputs = Vec::new();
    for run in 0..2 {
        let aligned = align_dir(&cfg).unwrap();
        let labeled = label_table(aligned.table, &cfg.regions, &cfg.label_options).unwrap();
        let path = out.path().join(format!("labeled_{run}.csv"));
        export::write_labeled_table(&path, &labeled).unwrap();
        outputs.push(fs::read(&path).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn duplicate_start_is_dropped_and_quarter_hours_sum() {
    let dir = tempfile::tempdir().unwrap();
    write_generation(
        dir.path(),
        Region::Spain,
        "B16",
        &[
            ("2022-01-01T00:05Z", "2022-01-01T00:20Z", "10"),
            ("2022-01-01T00:05Z", "2022-01-01T00:20Z", "999"),
            ("2022-01-01T00:45Z", "2022-01-01T01:00Z", "5"),
        ],
    );
    let regions = RegionConfig::new(&[(Region::Spain, 0)]).unwrap();
    let aligned = align_dir(&config(dir.path().to_path_buf(), regions)).unwrap();

    assert_eq!(aligned.table.rows.len(), 1);
    assert_eq!(aligned.table.rows[0].generation[Region::Spain], Some(15));
    let bucket = &aligned.outcomes[0].series.buckets[0];
    assert_eq!(bucket.end_time - bucket.start_time, chrono::Duration::hours(1));
}

#[test]
fn reference_regions_produce_unique_keys_and_bounded_labels() {
    let dir = tempfile::tempdir().unwrap();
    let hours = [
        ("2022-03-01T00:00Z", "2022-03-01T01:00Z"),
        ("2022-03-01T01:00Z", "2022-03-01T02:00Z"),
        ("2022-03-01T02:00Z", "2022-03-01T03:00Z"),
    ];
    for (i, region) in Region::ALL.into_iter().enumerate() {
        let generation: Vec<(&str, &str, String)> = hours
            .iter()
            .enumerate()
            .map(|(h, &(s, e))| (s, e, ((i * 7 + h * 13) % 40).to_string()))
            .collect();
        let rows: Vec<(&str, &str, &str)> =
            generation.iter().map(|(s, e, v)| (*s, *e, v.as_str())).collect();
        write_generation(dir.path(), region, "B16", &rows);
        write_load(dir.path(), region, &[(hours[0].0, hours[0].1, "12")]);
    }

    let cfg = config(dir.path().to_path_buf(), RegionConfig::reference());
    let aligned = align_dir(&cfg).unwrap();

    let mut keys: Vec<_> = aligned
        .table
        .rows
        .iter()
        .map(|r| (r.start_time, r.end_time))
        .collect();
    let n = keys.len();
    keys.dedup();
    assert_eq!(keys.len(), n);
    assert_eq!(n, 3);

    let labeled = label_table(aligned.table, &cfg.regions, &LabelOptions::default()).unwrap();
    for row in &labeled.rows {
        let label = row.label.unwrap();
        assert!(label <= 8);
    }
}

#[test]
fn interim_artifacts_and_wide_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let regions = three_region_fixture(dir.path());
    let interim = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path().to_path_buf(), regions);
    cfg.interim_dir = Some(interim.path().to_path_buf());

    let aligned = align_dir(&cfg).unwrap();
    assert!(interim.path().join("gen_SP_B16_processed.csv").exists());
    assert!(interim.path().join("load_IT_processed.csv").exists());
    assert!(interim.path().join("combined_gen_DE.csv").exists());
    assert!(!interim.path().join("combined_gen_IT.csv").exists());

    // The `label` subcommand reads the wide table back from disk.
    let wide = interim.path().join("wide.csv");
    export::write_wide_table(&wide, &aligned.table).unwrap();
    let reread = ingest::read_wide_table(&wide, &cfg.regions).unwrap();
    assert_eq!(reread.rows, aligned.table.rows);

    let labeled = label_table(reread, &cfg.regions, &cfg.label_options).unwrap();
    let labels: Vec<_> = labeled.rows.iter().map(|r| r.label).collect();
    assert_eq!(labels, [Some(0), Some(2)]);
}

#[test]
fn malformed_timestamp_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_load(dir.path(), Region::Spain, &[("yesterday", "2022-01-01T01:00Z", "1")]);
    let regions = RegionConfig::new(&[(Region::Spain, 0)]).unwrap();
    let err = align_dir(&config(dir.path().to_path_buf(), regions)).unwrap_err();
    assert!(err.is_input_error());
}
