//! The tracker trait -- the only seam between the rollup and the outside world.

use serde::{Deserialize, Serialize};
use tally_core::issue::{ProjectRef, TrackerIssue};

use crate::error::Result;

/// A field available on an issue type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub id: String,
    pub name: String,
}

/// An issue type of a project, with its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTypeMeta {
    pub id: String,
    pub name: String,
    pub fields: Vec<FieldMeta>,
}

impl IssueTypeMeta {
    /// Finds a field by its display name.
    pub fn field_named(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Issue types and field schemas of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project: ProjectRef,
    pub issue_types: Vec<IssueTypeMeta>,
}

/// Remote issue tracker operations used by the rollup.
///
/// Every call is a fallible, blocking round-trip; implementations do not
/// retry.
pub trait IssueTracker {
    /// Fetches one issue. An empty `fields` slice requests the tracker's default set.
    fn get_issue(&self, key: &str, fields: &[&str]) -> Result<TrackerIssue>;

    /// Runs a search and returns at most `max_results` issues.
    fn search_issues(&self, jql: &str, fields: &[&str], max_results: usize)
    -> Result<Vec<TrackerIssue>>;

    /// Lists a project's issue types with their field schemas.
    fn project_metadata(&self, project: &ProjectRef) -> Result<ProjectMetadata>;

    /// Sets a numeric field; `None` clears it.
    fn update_issue_field(&self, key: &str, field_id: &str, value: Option<f64>) -> Result<()>;

    /// Fetches several issues with fresh field values.
    ///
    /// The default issues one [`get_issue`](Self::get_issue) per key and fails
    /// on the first error; implementations may batch.
    fn fetch_issues(&self, keys: &[String], fields: &[&str]) -> Result<Vec<TrackerIssue>> {
        keys.iter().map(|key| self.get_issue(key, fields)).collect()
    }
}
