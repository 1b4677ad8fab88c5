//! Issue tracker access for the tally estimate rollup.
//!
//! Consumers depend on the [`IssueTracker`](traits::IssueTracker) trait; the
//! [`jira`] module provides the Jira Cloud REST implementation and
//! [`memory`] an in-process tracker for tests and fixtures.

pub mod error;
pub mod jira;
pub mod jql;
pub mod memory;
pub mod traits;

pub use error::{Result, TrackerError};
pub use traits::{FieldMeta, IssueTracker, IssueTypeMeta, ProjectMetadata};
