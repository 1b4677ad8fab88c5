//! Terminal UI helpers for tally reports.
//!
//! Provides color styling and terminal detection for CLI output.

pub mod styles;
pub mod terminal;
