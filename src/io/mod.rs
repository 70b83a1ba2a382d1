//! Input/output helpers.
//!
//! - raw series discovery, CSV ingest + validation (`ingest`)
//! - processed, combined, wide and labeled CSV writers (`export`)

pub mod export;
pub mod ingest;
