//! Cross-region merge into the wide table.
//!
//! 1) per region, sum generation sub-types sharing `(start, end, AreaID)`
//! 2) outer-join the per-region generation totals on `(start, end)`
//! 3) left-join each region's load series onto those keys
//! 4) fill every configured column that is still empty with 0
//!
//! Load intervals with no generation row in any region are not added (left join).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    CombinedBucket, HourlySeries, Metric, Region, RegionConfig, RegionMap, WideRow, WideTable,
};
use crate::error::PipelineError;

type IntervalKey = (DateTime<Utc>, DateTime<Utc>);

/// Collapse the sub-type dimension of one region's generation series.
///
/// Missing bucket values are skipped; a key whose values are all missing stays missing.
pub fn combine_generation(series: &[&HourlySeries]) -> Vec<CombinedBucket> {
    let mut totals: BTreeMap<(DateTime<Utc>, DateTime<Utc>, String), Option<i64>> = BTreeMap::new();
    for s in series {
        for b in &s.buckets {
            let slot = totals
                .entry((b.start_time, b.end_time, b.region_code.clone()))
                .or_insert(None);
            if let Some(v) = b.value {
                *slot = Some(slot.unwrap_or(0).saturating_add(v));
            }
        }
    }

    totals
        .into_iter()
        .map(|((start_time, end_time, region_code), quantity)| CombinedBucket {
            start_time,
            end_time,
            region_code,
            quantity,
        })
        .collect()
}

/// Merge resampled series of all configured regions into one wide table.
///
/// Each region may supply any number of generation series and at most one
/// load series. Series for regions outside `config` are a schema error.
pub fn merge(config: &RegionConfig, series: &[HourlySeries]) -> Result<WideTable, PipelineError> {
    let mut generation: RegionMap<Vec<&HourlySeries>> = RegionMap::default();
    let mut load: RegionMap<Option<&HourlySeries>> = RegionMap::filled(None);

    for s in series {
        let region = s.key.region;
        if !config.contains(region) {
            return Err(PipelineError::schema(format!(
                "series {} belongs to unconfigured region {region}",
                s.key
            )));
        }
        match s.key.metric {
            Metric::Generation => generation[region].push(s),
            Metric::Load => {
                if load[region].replace(s).is_some() {
                    return Err(PipelineError::schema(format!(
                        "region {region} has more than one load series"
                    )));
                }
            }
        }
    }

    let mut table = WideTable::new(config);
    let mut rows: BTreeMap<IntervalKey, WideRow> = BTreeMap::new();

    // 1) + 2) Generation totals, outer join.
    for region in config.regions() {
        if generation[region].is_empty() {
            continue;
        }
        table.generation_present[region] = true;
        for (key, value) in region_totals(&generation[region]) {
            let row = rows
                .entry(key)
                .or_insert_with(|| WideRow::empty(key.0, key.1));
            row.generation[region] = value;
        }
    }

    // 3) Load, left join.
    for region in config.regions() {
        let Some(series) = load[region] else {
            continue;
        };
        table.load_present[region] = true;
        for b in &series.buckets {
            if let Some(row) = rows.get_mut(&(b.start_time, b.end_time)) {
                row.load[region] = b.value;
            }
        }
    }

    // 4) Absence means "no contribution".
    for row in rows.values_mut() {
        fill_absent(row, &table.regions);
    }

    table.rows = rows.into_values().collect();
    Ok(table)
}

/// Per-interval generation total of one region.
fn region_totals(series: &[&HourlySeries]) -> BTreeMap<IntervalKey, Option<i64>> {
    let mut out: BTreeMap<IntervalKey, Option<i64>> = BTreeMap::new();
    for c in combine_generation(series) {
        let slot = out.entry((c.start_time, c.end_time)).or_insert(None);
        if let Some(v) = c.quantity {
            *slot = Some(slot.unwrap_or(0).saturating_add(v));
        }
    }
    out
}

fn fill_absent(row: &mut WideRow, regions: &[Region]) {
    for &region in regions {
        row.generation[region].get_or_insert(0);
        row.load[region].get_or_insert(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HourlyBucket, SeriesKey};
    use chrono::{Duration, TimeZone};

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 1, h, 0, 0).unwrap()
    }

    fn series(key: SeriesKey, values: &[(u32, Option<i64>)]) -> HourlySeries {
        let buckets = values
            .iter()
            .map(|&(h, value)| HourlyBucket {
                start_time: hour(h),
                end_time: hour(h) + Duration::hours(1),
                region_code: key.region.area_code().to_string(),
                unit: "MAW".to_string(),
                sub_type: key.sub_type.clone(),
                value,
            })
            .collect();
        HourlySeries { key, buckets }
    }

    fn config() -> RegionConfig {
        RegionConfig::new(&[(Region::Spain, 0), (Region::Germany, 1)]).unwrap()
    }

    #[test]
    fn sub_types_are_summed_per_interval() {
        let wind = series(SeriesKey::generation(Region::Spain, "B19"), &[(0, Some(5)), (1, Some(6))]);
        let solar = series(SeriesKey::generation(Region::Spain, "B16"), &[(0, Some(1)), (1, None)]);
        let combined = combine_generation(&[&wind, &solar]);
        let totals: Vec<_> = combined.iter().map(|c| c.quantity).collect();
        assert_eq!(totals, [Some(6), Some(6)]);
        assert_eq!(combined[0].region_code, Region::Spain.area_code());
    }

    #[test]
    fn outer_join_generation_left_join_load() {
        let table = merge(
            &config(),
            &[
                series(SeriesKey::generation(Region::Spain, "B16"), &[(0, Some(10))]),
                series(SeriesKey::generation(Region::Germany, "B19"), &[(1, Some(20))]),
                // Hour 5 has no generation anywhere and must not create a row.
                series(SeriesKey::load(Region::Spain), &[(0, Some(3)), (5, Some(9))]),
            ],
        )
        .unwrap();

        assert_eq!(table.rows.len(), 2);
        let first = &table.rows[0];
        assert_eq!(first.start_time, hour(0));
        assert_eq!(first.generation[Region::Spain], Some(10));
        assert_eq!(first.generation[Region::Germany], Some(0));
        assert_eq!(first.load[Region::Spain], Some(3));
        assert_eq!(first.load[Region::Germany], Some(0));

        let second = &table.rows[1];
        assert_eq!(second.generation[Region::Spain], Some(0));
        assert_eq!(second.generation[Region::Germany], Some(20));
        assert_eq!(second.load[Region::Spain], Some(0));

        assert!(table.generation_present[Region::Germany]);
        assert!(!table.load_present[Region::Germany]);
    }

    #[test]
    fn interval_keys_are_unique_and_sorted() {
        let table = merge(
            &config(),
            &[
                series(SeriesKey::generation(Region::Germany, "B19"), &[(3, Some(1)), (1, Some(1))]),
                series(SeriesKey::generation(Region::Spain, "B16"), &[(1, Some(2)), (2, Some(2))]),
                series(SeriesKey::generation(Region::Spain, "B19"), &[(1, Some(4))]),
            ],
        )
        .unwrap();
        let starts: Vec<_> = table.rows.iter().map(|r| r.start_time).collect();
        assert_eq!(starts, [hour(1), hour(2), hour(3)]);
        assert_eq!(table.rows[0].generation[Region::Spain], Some(6));
    }

    #[test]
    fn unconfigured_region_and_duplicate_load_are_schema_errors() {
        let err = merge(&config(), &[series(SeriesKey::load(Region::Italy), &[(0, Some(1))])])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));

        let err = merge(
            &config(),
            &[
                series(SeriesKey::load(Region::Spain), &[(0, Some(1))]),
                series(SeriesKey::load(Region::Spain), &[(1, Some(1))]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
