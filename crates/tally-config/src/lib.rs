//! Configuration management for the tally estimate rollup.
//!
//! This crate loads the run configuration (`.tally/config.yaml` layered with
//! `TALLY_` environment variables), discovers the `.tally/` directory, and
//! persists per-project field mappings between runs.

pub mod config;
pub mod mappings;
pub mod tally_dir;

pub use config::{ConfigError, Result, TallyConfig};
