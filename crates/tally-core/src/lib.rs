//! Core types for the tally estimate rollup.
//!
//! This crate holds the domain model shared by every other tally crate:
//! issue kinds, the tracker issue snapshot, per-project field mappings, the
//! epic/initiative/release aggregates, the estimation confidence heuristic
//! and the calendar distribution pass. Nothing here performs I/O.

pub mod aggregate;
pub mod calendar;
pub mod confidence;
pub mod issue;
pub mod kind;
pub mod mapping;
pub mod rounding;
pub mod skip;
