//! The rollup engine: resolves per-project field mappings, rolls estimates up
//! from subtasks to stories, and collects Epics, Initiatives and Releases into
//! aggregates ready for export or calendar distribution.
//!
//! All tracker access goes through [`tally_tracker::IssueTracker`]; a run is
//! driven by a [`RollupSession`](session::RollupSession).

pub mod error;
pub mod resolver;
pub mod rollup;
pub mod schedule;
pub mod session;

#[cfg(test)]
mod fixtures;

pub use error::{EngineError, Result};
pub use resolver::{FieldMappingResolver, MappingCache};
pub use rollup::{RollupOptions, apply_write_backs, rollup_issue};
pub use session::RollupSession;
