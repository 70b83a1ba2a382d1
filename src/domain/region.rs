//! Bidding-zone regions and the ordered region → label-id configuration.
//!
//! `Region` is a closed enum so per-region columns are typed fields
//! (`RegionMap<T>`) instead of string-built column names. Column names only
//! exist at the CSV boundary (`Column::name`).

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::PipelineError;

/// A bidding zone supplying generation and load telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    Spain,
    UnitedKingdom,
    Germany,
    Denmark,
    Sweden,
    Hungary,
    Italy,
    Poland,
    Netherlands,
}

impl Region {
    pub const COUNT: usize = 9;

    /// Declaration order. This is NOT the label tie-break order; that lives in `RegionConfig`.
    pub const ALL: [Region; Region::COUNT] = [
        Region::Spain,
        Region::UnitedKingdom,
        Region::Germany,
        Region::Denmark,
        Region::Sweden,
        Region::Hungary,
        Region::Italy,
        Region::Poland,
        Region::Netherlands,
    ];

    /// Two-letter code used in file and column names.
    pub fn code(self) -> &'static str {
        match self {
            Region::Spain => "SP",
            Region::UnitedKingdom => "UK",
            Region::Germany => "DE",
            Region::Denmark => "DK",
            Region::Sweden => "SE",
            Region::Hungary => "HU",
            Region::Italy => "IT",
            Region::Poland => "PO",
            Region::Netherlands => "NE",
        }
    }

    /// ENTSO-E area code (EIC) reported in the `AreaID` column.
    pub fn area_code(self) -> &'static str {
        match self {
            Region::Spain => "10YES-REE------0",
            Region::UnitedKingdom => "10Y1001A1001A92E",
            Region::Germany => "10Y1001A1001A83F",
            Region::Denmark => "10Y1001A1001A65H",
            Region::Sweden => "10YSE-1--------K",
            Region::Hungary => "10YHU-MAVIR----U",
            Region::Italy => "10YIT-GRTN-----B",
            Region::Poland => "10YPL-AREA-----S",
            Region::Netherlands => "10YNL----------L",
        }
    }

    pub fn from_code(code: &str) -> Option<Region> {
        let code = code.trim();
        Region::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(code))
    }

    pub fn from_area_code(area: &str) -> Option<Region> {
        let area = area.trim();
        Region::ALL.into_iter().find(|r| r.area_code() == area)
    }

    /// Whether an `AreaID` value identifies this region (EIC or two-letter code).
    pub fn matches_area(self, area: &str) -> bool {
        let area = area.trim();
        area == self.area_code() || area.eq_ignore_ascii_case(self.code())
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_code(s)
            .or_else(|| Region::from_area_code(s))
            .ok_or_else(|| PipelineError::schema(format!("unknown region code '{s}'")))
    }
}

/// One value per region, indexed by `Region`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegionMap<T>([T; Region::COUNT]);

impl<T: Copy> RegionMap<T> {
    pub fn filled(value: T) -> Self {
        Self([value; Region::COUNT])
    }
}

impl<T> Index<Region> for RegionMap<T> {
    type Output = T;

    fn index(&self, region: Region) -> &T {
        &self.0[region.slot()]
    }
}

impl<T> IndexMut<Region> for RegionMap<T> {
    fn index_mut(&mut self, region: Region) -> &mut T {
        &mut self.0[region.slot()]
    }
}

/// A configured region and the label id it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEntry {
    pub region: Region,
    pub label_id: u8,
}

/// Ordered region → label-id mapping.
///
/// Entry order is the iteration order of every per-region stage and the
/// tie-break order of label derivation (first listed region wins a tie).
/// It is independent of the numeric ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    entries: Vec<RegionEntry>,
}

impl RegionConfig {
    /// Build a validated configuration from ordered `(region, id)` pairs.
    ///
    /// Ids must be unique and lie in `[0, len)`; a region may appear once.
    pub fn new(pairs: &[(Region, u8)]) -> Result<Self, PipelineError> {
        if pairs.is_empty() {
            return Err(PipelineError::InvalidArgument(
                "region configuration is empty".to_string(),
            ));
        }

        let mut seen_region = RegionMap::filled(false);
        let mut seen_id = vec![false; pairs.len()];
        for &(region, id) in pairs {
            if seen_region[region] {
                return Err(PipelineError::InvalidArgument(format!(
                    "region {region} is configured twice"
                )));
            }
            seen_region[region] = true;

            let slot = seen_id.get_mut(id as usize).ok_or_else(|| {
                PipelineError::InvalidArgument(format!(
                    "label id {id} for {region} is outside [0, {})",
                    pairs.len()
                ))
            })?;
            if *slot {
                return Err(PipelineError::InvalidArgument(format!(
                    "label id {id} is assigned twice"
                )));
            }
            *slot = true;
        }

        Ok(Self {
            entries: pairs
                .iter()
                .map(|&(region, label_id)| RegionEntry { region, label_id })
                .collect(),
        })
    }

    /// The nine-region mapping of the reference system.
    ///
    /// Ids: SP 0, UK 1, DE 2, DK 3, SE 4, HU 5, IT 6, PO 7, NE 8.
    /// Order: SP, UK, DE, DK, HU, SE, IT, PO, NE. HU is listed before SE even
    /// though SE has the lower id, and ties resolve in this order.
    pub fn reference() -> Self {
        let pairs = [
            (Region::Spain, 0),
            (Region::UnitedKingdom, 1),
            (Region::Germany, 2),
            (Region::Denmark, 3),
            (Region::Hungary, 5),
            (Region::Sweden, 4),
            (Region::Italy, 6),
            (Region::Poland, 7),
            (Region::Netherlands, 8),
        ];
        Self {
            entries: pairs
                .into_iter()
                .map(|(region, label_id)| RegionEntry { region, label_id })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[RegionEntry] {
        &self.entries
    }

    /// Configured regions in configuration order.
    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.entries.iter().map(|e| e.region)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, region: Region) -> bool {
        self.entries.iter().any(|e| e.region == region)
    }

    pub fn label_id(&self, region: Region) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.region == region)
            .map(|e| e.label_id)
    }

    pub fn region_for_label(&self, label_id: u8) -> Option<Region> {
        self.entries
            .iter()
            .find(|e| e.label_id == label_id)
            .map(|e| e.region)
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self::reference()
    }
}
