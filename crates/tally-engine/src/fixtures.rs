//! Shared test data: one project `PRJ` with a complete mapping.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tally_core::issue::{ProjectRef, TrackerIssueBuilder};
use tally_core::kind::IssueKind;
use tally_core::mapping::{FieldMapping, KindFields};
use tally_tracker::{FieldMeta, IssueTypeMeta, ProjectMetadata};

use crate::resolver::ESTIMATE_FIELD_NAME;

pub const ESTIMATE: &str = "customfield_10016";
pub const SUBTASK_ESTIMATE: &str = "customfield_10020";
pub const START: &str = "customfield_10015";
pub const DUE: &str = "duedate";

const TYPES: [(&str, &str, &str); 5] = [
    ("10000", "Epic", ESTIMATE),
    ("10001", "Story", ESTIMATE),
    ("10002", "Task", ESTIMATE),
    ("10003", "Sub-task", SUBTASK_ESTIMATE),
    ("10004", "Bug", ESTIMATE),
];

pub fn project() -> ProjectRef {
    ProjectRef {
        id: "PRJ".into(),
        key: "PRJ".into(),
    }
}

pub fn metadata() -> ProjectMetadata {
    ProjectMetadata {
        project: project(),
        issue_types: TYPES
            .iter()
            .map(|(id, name, field)| IssueTypeMeta {
                id: id.to_string(),
                name: name.to_string(),
                fields: vec![
                    FieldMeta {
                        id: "summary".into(),
                        name: "Summary".into(),
                    },
                    FieldMeta {
                        id: field.to_string(),
                        name: ESTIMATE_FIELD_NAME.into(),
                    },
                ],
            })
            .collect(),
    }
}

pub fn mapping() -> FieldMapping {
    let kinds: BTreeMap<IssueKind, KindFields> = TYPES
        .iter()
        .filter_map(|(id, name, field)| {
            IssueKind::from_type_name(name).map(|kind| (kind, KindFields::new(*id, *field)))
        })
        .collect();
    FieldMapping::try_new("PRJ", kinds).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn epic(key: &str) -> TrackerIssueBuilder {
    TrackerIssueBuilder::new(key)
        .issue_type("10000", "Epic")
        .summary(format!("Epic {key}"))
}

pub fn story(key: &str) -> TrackerIssueBuilder {
    TrackerIssueBuilder::new(key).issue_type("10001", "Story")
}

pub fn task(key: &str) -> TrackerIssueBuilder {
    TrackerIssueBuilder::new(key).issue_type("10002", "Task")
}

pub fn subtask(key: &str) -> TrackerIssueBuilder {
    TrackerIssueBuilder::new(key).issue_type("10003", "Sub-task")
}

pub fn bug(key: &str) -> TrackerIssueBuilder {
    TrackerIssueBuilder::new(key).issue_type("10004", "Bug")
}

pub fn initiative(key: &str) -> TrackerIssueBuilder {
    TrackerIssueBuilder::new(key)
        .issue_type("10200", "Initiative")
        .summary(format!("Initiative {key}"))
}
