//! `green-surplus` library crate.
//!
//! Aligns per-region generation and load telemetry onto an hourly grid, merges
//! it into one wide table and labels each hour with the region holding the
//! largest green-energy surplus.
//!
//! The binary (`gsp`) is a thin wrapper around this library so that:
//!
//! - the pipeline stages are testable without spawning processes
//! - the stages can be driven from other front-ends (notebooks, schedulers)

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod handoff;
pub mod io;
pub mod label;
pub mod merge;
pub mod normalize;
pub mod report;
pub mod resample;
