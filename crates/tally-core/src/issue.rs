//! Snapshot of a tracker issue as the rollup sees it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status name of completed work.
pub const DONE_STATUS: &str = "Done";

/// Status name of an Initiative that has not been broken into Epics yet.
pub const INITIAL_ESTIMATION_STATUS: &str = "Initial Estimation";

/// Project an issue belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ProjectRef {
    pub id: String,
    pub key: String,
}

/// Tracker issue type, as reported on the issue itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IssueTypeRef {
    pub id: String,
    pub name: String,
}

/// An issue linked to another one (used for Initiative → Epic links).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIssue {
    pub key: String,
    /// Issue-type name of the linked issue, when the tracker includes it.
    #[serde(default)]
    pub type_name: String,
}

/// A tracker issue with the fields the rollup reads.
///
/// Custom fields (estimates, start dates) stay in `fields` untouched; the
/// accessors below interpret them on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerIssue {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub project: ProjectRef,
    #[serde(default)]
    pub issue_type: IssueTypeRef,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkedIssue>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl TrackerIssue {
    /// Reads a numeric field. Numbers and numeric strings are accepted;
    /// anything else (including JSON null) is `None`.
    pub fn number_field(&self, field_id: &str) -> Option<f64> {
        match self.fields.get(field_id)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads a date field in `YYYY-MM-DD` form. A trailing time part is ignored.
    pub fn date_field(&self, field_id: &str) -> Option<NaiveDate> {
        let raw = self.fields.get(field_id)?.as_str()?;
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Returns `true` if the issue's status is [`DONE_STATUS`].
    pub fn is_done(&self) -> bool {
        self.status == DONE_STATUS
    }

    /// Returns `true` if the issue is still in [`INITIAL_ESTIMATION_STATUS`].
    pub fn is_initial_estimation(&self) -> bool {
        self.status == INITIAL_ESTIMATION_STATUS
    }
}

/// Builder for [`TrackerIssue`], mostly used by tests and fixtures.
#[derive(Debug, Clone)]
pub struct TrackerIssueBuilder {
    issue: TrackerIssue,
}

impl TrackerIssueBuilder {
    /// Starts a new issue with the given key and a "To Do" status.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let project_key = key.split('-').next().unwrap_or_default().to_string();
        Self {
            issue: TrackerIssue {
                id: String::new(),
                key,
                project: ProjectRef {
                    id: project_key.clone(),
                    key: project_key,
                },
                issue_type: IssueTypeRef::default(),
                summary: String::new(),
                status: "To Do".to_string(),
                subtasks: Vec::new(),
                links: Vec::new(),
                fields: Map::new(),
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.issue.id = id.into();
        self
    }

    pub fn project(mut self, id: impl Into<String>, key: impl Into<String>) -> Self {
        self.issue.project = ProjectRef {
            id: id.into(),
            key: key.into(),
        };
        self
    }

    pub fn issue_type(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.issue.issue_type = IssueTypeRef {
            id: id.into(),
            name: name.into(),
        };
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.issue.summary = summary.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.issue.status = status.into();
        self
    }

    pub fn subtask(mut self, key: impl Into<String>) -> Self {
        self.issue.subtasks.push(key.into());
        self
    }

    pub fn link(mut self, key: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.issue.links.push(LinkedIssue {
            key: key.into(),
            type_name: type_name.into(),
        });
        self
    }

    /// Sets an arbitrary raw field value.
    pub fn field(mut self, field_id: impl Into<String>, value: Value) -> Self {
        self.issue.fields.insert(field_id.into(), value);
        self
    }

    /// Sets a numeric field.
    pub fn number(self, field_id: impl Into<String>, value: f64) -> Self {
        self.field(field_id, Value::from(value))
    }

    /// Sets a date field from a `NaiveDate`.
    pub fn date(self, field_id: impl Into<String>, date: NaiveDate) -> Self {
        self.field(field_id, Value::String(date.format("%Y-%m-%d").to_string()))
    }

    pub fn build(self) -> TrackerIssue {
        self.issue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_field_accepts_numbers_and_numeric_strings() {
        let issue = TrackerIssueBuilder::new("PRJ-1")
            .field("a", json!(3))
            .field("b", json!("2.5"))
            .field("c", Value::Null)
            .field("d", json!("n/a"))
            .build();
        assert_eq!(issue.number_field("a"), Some(3.0));
        assert_eq!(issue.number_field("b"), Some(2.5));
        assert_eq!(issue.number_field("c"), None);
        assert_eq!(issue.number_field("d"), None);
        assert_eq!(issue.number_field("missing"), None);
    }

    #[test]
    fn date_field_ignores_time_part() {
        let issue = TrackerIssueBuilder::new("PRJ-1")
            .field("duedate", json!("2021-02-10"))
            .field("start", json!("2021-01-15T09:00:00.000+0000"))
            .field("bad", json!("soon"))
            .build();
        assert_eq!(
            issue.date_field("duedate"),
            NaiveDate::from_ymd_opt(2021, 2, 10)
        );
        assert_eq!(
            issue.date_field("start"),
            NaiveDate::from_ymd_opt(2021, 1, 15)
        );
        assert_eq!(issue.date_field("bad"), None);
    }

    #[test]
    fn builder_derives_project_from_key() {
        let issue = TrackerIssueBuilder::new("ABC-12").build();
        assert_eq!(issue.project.key, "ABC");
        assert!(!issue.is_done());
        let done = TrackerIssueBuilder::new("ABC-13").status("Done").build();
        assert!(done.is_done());
    }
}
