//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - regions and the ordered region → label-id configuration (`RegionConfig`)
//! - records at each stage (`RawRecord`, `CanonicalRecord`, `HourlyBucket`)
//! - the wide table and its labeled form (`WideTable`, `LabeledTable`)

pub mod region;
pub mod types;

pub use region::*;
pub use types::*;
