//! Per-project mapping from issue kinds to tracker type ids and estimate fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::issue::TrackerIssue;
use crate::kind::IssueKind;

/// Tracker identifiers for one issue kind within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindFields {
    /// The project's issue-type id for this kind.
    pub type_id: String,
    /// Custom field holding the numeric estimate.
    #[serde(rename = "estimation_key", alias = "estimate_field_id")]
    pub estimate_field: String,
}

impl KindFields {
    pub fn new(type_id: impl Into<String>, estimate_field: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            estimate_field: estimate_field.into(),
        }
    }
}

/// A project could not map every operational kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("project {project} has no estimate field for: {}", join_kinds(.missing))]
pub struct IncompleteMapping {
    pub project: String,
    pub missing: Vec<IssueKind>,
}

fn join_kinds(kinds: &[IssueKind]) -> String {
    kinds
        .iter()
        .map(IssueKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The resolved field mapping for one project.
///
/// Always covers every kind in [`IssueKind::OPERATIONAL`]; an Initiative
/// entry is carried when the project defines one. Built once per project and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldMappingRecord", into = "FieldMappingRecord")]
pub struct FieldMapping {
    project_key: String,
    kinds: BTreeMap<IssueKind, KindFields>,
}

impl FieldMapping {
    /// Builds a mapping, failing if any operational kind is absent.
    pub fn try_new(
        project_key: impl Into<String>,
        kinds: BTreeMap<IssueKind, KindFields>,
    ) -> Result<Self, IncompleteMapping> {
        let project_key = project_key.into();
        let missing: Vec<IssueKind> = IssueKind::OPERATIONAL
            .into_iter()
            .filter(|kind| !kinds.contains_key(kind))
            .collect();
        if !missing.is_empty() {
            return Err(IncompleteMapping {
                project: project_key,
                missing,
            });
        }
        Ok(Self { project_key, kinds })
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn fields(&self, kind: IssueKind) -> Option<&KindFields> {
        self.kinds.get(&kind)
    }

    pub fn estimate_field(&self, kind: IssueKind) -> Option<&str> {
        self.kinds.get(&kind).map(|f| f.estimate_field.as_str())
    }

    /// Distinct estimate fields of the kinds that can sit directly under an Epic.
    pub fn child_estimate_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = [
            IssueKind::Story,
            IssueKind::Task,
            IssueKind::Bug,
            IssueKind::Subtask,
        ]
        .into_iter()
        .filter_map(|kind| self.estimate_field(kind))
        .collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    /// Classifies an issue: by type id first, then by type name for kinds the
    /// project does not map.
    pub fn kind_of(&self, issue: &TrackerIssue) -> Option<IssueKind> {
        self.kinds
            .iter()
            .find(|(_, f)| !f.type_id.is_empty() && f.type_id == issue.issue_type.id)
            .map(|(kind, _)| *kind)
            .or_else(|| IssueKind::from_type_name(&issue.issue_type.name))
    }
}

/// On-disk form: `{project_key, Epic: {...}, Story: {...}, ...}`.
///
/// Kinds may be absent in a hand-edited file; converting to a
/// [`FieldMapping`] reports them as an [`IncompleteMapping`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMappingRecord {
    #[serde(rename = "project_key", alias = "key")]
    project_key: String,
    #[serde(rename = "Epic", default, skip_serializing_if = "Option::is_none")]
    epic: Option<KindFields>,
    #[serde(rename = "Story", default, skip_serializing_if = "Option::is_none")]
    story: Option<KindFields>,
    #[serde(rename = "Task", default, skip_serializing_if = "Option::is_none")]
    task: Option<KindFields>,
    #[serde(rename = "Subtask", default, skip_serializing_if = "Option::is_none")]
    subtask: Option<KindFields>,
    #[serde(rename = "Bug", default, skip_serializing_if = "Option::is_none")]
    bug: Option<KindFields>,
    #[serde(rename = "Initiative", default, skip_serializing_if = "Option::is_none")]
    initiative: Option<KindFields>,
}

impl TryFrom<FieldMappingRecord> for FieldMapping {
    type Error = IncompleteMapping;

    fn try_from(record: FieldMappingRecord) -> Result<Self, Self::Error> {
        let kinds = [
            (IssueKind::Epic, record.epic),
            (IssueKind::Story, record.story),
            (IssueKind::Task, record.task),
            (IssueKind::Subtask, record.subtask),
            (IssueKind::Bug, record.bug),
            (IssueKind::Initiative, record.initiative),
        ]
        .into_iter()
        .filter_map(|(kind, fields)| fields.map(|f| (kind, f)))
        .collect();
        Self::try_new(record.project_key, kinds)
    }
}

impl From<FieldMapping> for FieldMappingRecord {
    fn from(mut mapping: FieldMapping) -> Self {
        let mut take = |kind: IssueKind| mapping.kinds.remove(&kind);
        Self {
            epic: take(IssueKind::Epic),
            story: take(IssueKind::Story),
            task: take(IssueKind::Task),
            subtask: take(IssueKind::Subtask),
            bug: take(IssueKind::Bug),
            initiative: take(IssueKind::Initiative),
            project_key: mapping.project_key,
        }
    }
}
