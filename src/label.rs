//! Surplus label derivation.
//!
//! For each row, `surplus(region) = generation - load` for every configured
//! region, and the label is the id of the region with the largest surplus.
//! Ties go to the region listed first in the `RegionConfig`, which is not
//! necessarily the one with the lowest id. Surpluses are never stored on the
//! output rows.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Column, LabeledRow, LabeledTable, Region, RegionConfig, WideRow, WideTable};
use crate::error::PipelineError;

/// Options of the label stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelOptions {
    /// Columns whose missing values are set to 0 after labeling.
    ///
    /// Only these columns get the treatment; other missing values stay missing.
    pub integer_columns: Vec<Column>,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            integer_columns: vec![
                Column::generation(Region::UnitedKingdom),
                Column::generation(Region::Sweden),
                Column::load(Region::UnitedKingdom),
            ],
        }
    }
}

/// Annotate every row of `table` with its surplus label.
///
/// Exact duplicate rows are removed first (first occurrence kept).
pub fn derive_labels(
    mut table: WideTable,
    config: &RegionConfig,
    options: &LabelOptions,
) -> Result<LabeledTable, PipelineError> {
    for region in config.regions() {
        if !table.has_column(Column::generation(region)) && !table.has_column(Column::load(region)) {
            return Err(PipelineError::schema(format!(
                "region {region} has neither a generation nor a load column"
            )));
        }
    }

    let integer_columns: Vec<Column> = options
        .integer_columns
        .iter()
        .copied()
        .filter(|&c| table.has_column(c))
        .collect();

    let rows_in = table.rows.len();
    let rows = dedup_rows(std::mem::take(&mut table.rows));
    if rows.len() < rows_in {
        debug!(removed = rows_in - rows.len(), "removed duplicate wide rows");
    }

    let labeled = rows
        .into_iter()
        .map(|mut row| {
            let label = label_row(&row, &table, config);
            for &column in &integer_columns {
                row.slot_mut(column).get_or_insert(0);
            }
            LabeledRow { row, label }
        })
        .collect();

    Ok(LabeledTable {
        regions: table.regions,
        rows: labeled,
    })
}

/// Surplus of one region in one row.
///
/// A column that does not exist at all counts as 0; a missing value inside an
/// existing column makes the surplus undefined.
pub fn surplus(row: &WideRow, table: &WideTable, region: Region) -> Option<i64> {
    let value = |column: Column| {
        if table.has_column(column) {
            row.get(column)
        } else {
            Some(0)
        }
    };
    let generation = value(Column::generation(region))?;
    let load = value(Column::load(region))?;
    Some(generation.saturating_sub(load))
}

/// Label of the region with the largest defined surplus, or `None` if no
/// surplus is defined.
pub fn label_row(row: &WideRow, table: &WideTable, config: &RegionConfig) -> Option<u8> {
    let mut best: Option<(i64, u8)> = None;
    for entry in config.entries() {
        let Some(s) = surplus(row, table, entry.region) else {
            continue;
        };
        // Strictly greater: an equal surplus later in the order never wins.
        if best.is_none_or(|(max, _)| s > max) {
            best = Some((s, entry.label_id));
        }
    }
    best.map(|(_, id)| id)
}

fn dedup_rows(rows: Vec<WideRow>) -> Vec<WideRow> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 1, h, 0, 0).unwrap()
    }

    /// Table with every reference column present and the given (gen, load) per region.
    fn reference_table(values: &[(Region, i64, i64)]) -> WideTable {
        let config = RegionConfig::reference();
        let mut table = WideTable::new(&config);
        let mut row = WideRow::empty(hour(0), hour(0) + Duration::hours(1));
        for region in config.regions() {
            table.generation_present[region] = true;
            table.load_present[region] = true;
            row.generation[region] = Some(0);
            row.load[region] = Some(0);
        }
        for &(region, generation, load) in values {
            row.generation[region] = Some(generation);
            row.load[region] = Some(load);
        }
        table.rows.push(row);
        table
    }

    fn only_label(table: WideTable, config: &RegionConfig) -> Option<u8> {
        let out = derive_labels(table, config, &LabelOptions::default()).unwrap();
        out.rows[0].label
    }

    #[test]
    fn largest_surplus_wins() {
        let table = reference_table(&[(Region::Italy, 500, 100), (Region::Germany, 300, 0)]);
        assert_eq!(only_label(table, &RegionConfig::reference()), Some(6));
    }

    #[test]
    fn tie_between_uk_and_de_goes_to_uk() {
        let table = reference_table(&[(Region::UnitedKingdom, 70, 20), (Region::Germany, 60, 10)]);
        assert_eq!(only_label(table, &RegionConfig::reference()), Some(1));
    }

    /// Known quirk of the reference mapping: HU (id 5) is listed before SE
    /// (id 4), so a HU/SE tie resolves to 5, not to the lower id.
    #[test]
    fn hu_se_tie_follows_configured_order_not_id() {
        let table = reference_table(&[(Region::Sweden, 90, 0), (Region::Hungary, 100, 10)]);
        assert_eq!(only_label(table, &RegionConfig::reference()), Some(5));
    }

    #[test]
    fn all_zero_rows_resolve_to_first_configured_region() {
        let table = reference_table(&[]);
        assert_eq!(only_label(table, &RegionConfig::reference()), Some(0));
    }

    #[test]
    fn missing_generation_column_counts_as_zero() {
        let config = RegionConfig::new(&[
            (Region::Spain, 0),
            (Region::Germany, 1),
            (Region::Italy, 2),
        ])
        .unwrap();
        let mut table = WideTable::new(&config);
        table.generation_present[Region::Spain] = true;
        table.generation_present[Region::Germany] = true;
        table.load_present[Region::Spain] = true;
        table.load_present[Region::Germany] = true;
        table.load_present[Region::Italy] = true;

        let mut row = WideRow::empty(hour(0), hour(1));
        row.generation[Region::Spain] = Some(30);
        row.load[Region::Spain] = Some(50);
        row.generation[Region::Germany] = Some(10);
        row.load[Region::Germany] = Some(40);
        row.load[Region::Italy] = Some(5);
        table.rows.push(row);

        // SP -20, DE -30, IT 0 - 5 = -5.
        assert_eq!(only_label(table, &config), Some(2));
    }

    #[test]
    fn region_without_any_column_is_a_schema_error() {
        let config = RegionConfig::new(&[(Region::Spain, 0), (Region::Germany, 1)]).unwrap();
        let mut table = WideTable::new(&config);
        table.generation_present[Region::Spain] = true;
        let err = derive_labels(table, &config, &LabelOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn all_null_surpluses_leave_label_undefined() {
        let config = RegionConfig::new(&[(Region::Spain, 0), (Region::Germany, 1)]).unwrap();
        let mut table = WideTable::new(&config);
        table.generation_present[Region::Spain] = true;
        table.generation_present[Region::Germany] = true;
        table.load_present[Region::Spain] = true;
        table.load_present[Region::Germany] = true;
        let mut row = WideRow::empty(hour(0), hour(1));
        row.generation[Region::Spain] = Some(4);
        table.rows.push(row);

        assert_eq!(only_label(table, &config), None);
    }

    #[test]
    fn integer_columns_are_filled_and_others_left_alone() {
        let config = RegionConfig::reference();
        let mut table = reference_table(&[(Region::Spain, 10, 0)]);
        table.rows[0].generation[Region::UnitedKingdom] = None;
        table.rows[0].load[Region::UnitedKingdom] = None;
        table.rows[0].generation[Region::Germany] = None;

        let out = derive_labels(table, &config, &LabelOptions::default()).unwrap();
        let row = &out.rows[0].row;
        assert_eq!(row.generation[Region::UnitedKingdom], Some(0));
        assert_eq!(row.load[Region::UnitedKingdom], Some(0));
        assert_eq!(row.generation[Region::Germany], None);
        assert_eq!(out.rows[0].label, Some(0));
    }

    #[test]
    fn extreme_load_saturates_instead_of_overflowing() {
        let config = RegionConfig::new(&[(Region::Spain, 0), (Region::Germany, 1)]).unwrap();
        let mut table = WideTable::new(&config);
        for region in config.regions() {
            table.generation_present[region] = true;
            table.load_present[region] = true;
        }
        let mut row = WideRow::empty(hour(0), hour(1));
        row.generation[Region::Spain] = Some(1);
        row.load[Region::Spain] = Some(i64::MIN);
        row.generation[Region::Germany] = Some(5);
        row.load[Region::Germany] = Some(0);
        table.rows.push(row.clone());

        assert_eq!(surplus(&row, &table, Region::Spain), Some(i64::MAX));
        assert_eq!(only_label(table, &config), Some(0));
    }

    #[test]
    fn duplicate_rows_are_removed() {
        let mut table = reference_table(&[(Region::Spain, 1, 0)]);
        let copy = table.rows[0].clone();
        table.rows.push(copy);
        let out = derive_labels(table, &RegionConfig::reference(), &LabelOptions::default()).unwrap();
        assert_eq!(out.rows.len(), 1);
    }
}
