//! In-process tracker for tests and offline fixtures.
//!
//! Searches are answered from queries registered up front with
//! [`MemoryTracker::with_search`]; every field write is applied to the stored
//! issue and logged so tests can assert on write-back behaviour.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tally_core::issue::{ProjectRef, TrackerIssue};

use crate::error::{Result, TrackerError};
use crate::traits::{IssueTracker, ProjectMetadata};

/// A field write observed by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub key: String,
    pub field_id: String,
    pub value: Option<f64>,
}

/// Tracker backed by in-memory maps. Single-threaded by construction.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    issues: RefCell<BTreeMap<String, TrackerIssue>>,
    searches: HashMap<String, Vec<String>>,
    metadata: HashMap<String, ProjectMetadata>,
    failing: HashSet<String>,
    writes: RefCell<Vec<FieldWrite>>,
    metadata_calls: Cell<usize>,
    fetch_calls: Cell<usize>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an issue, replacing any issue with the same key.
    pub fn with_issue(self, issue: TrackerIssue) -> Self {
        self.issues.borrow_mut().insert(issue.key.clone(), issue);
        self
    }

    /// Registers the keys a JQL query returns.
    pub fn with_search(mut self, jql: impl Into<String>, keys: &[&str]) -> Self {
        self.searches
            .insert(jql.into(), keys.iter().map(|k| k.to_string()).collect());
        self
    }

    /// Registers project metadata, looked up by project key.
    pub fn with_metadata(mut self, metadata: ProjectMetadata) -> Self {
        self.metadata.insert(metadata.project.key.clone(), metadata);
        self
    }

    /// Makes every call naming `key_or_query` (issue key, JQL, or project key) fail.
    pub fn failing_on(mut self, key_or_query: impl Into<String>) -> Self {
        self.failing.insert(key_or_query.into());
        self
    }

    /// Field writes in the order they happened.
    pub fn writes(&self) -> Vec<FieldWrite> {
        self.writes.borrow().clone()
    }

    /// Number of metadata lookups served.
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.get()
    }

    /// Number of child fetch batches served.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.get()
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.failing.contains(name) {
            return Err(TrackerError::Transport(format!("injected failure for {name}")));
        }
        Ok(())
    }
}

impl IssueTracker for MemoryTracker {
    fn get_issue(&self, key: &str, _fields: &[&str]) -> Result<TrackerIssue> {
        self.check(key)?;
        self.issues
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))
    }

    fn search_issues(
        &self,
        jql: &str,
        fields: &[&str],
        max_results: usize,
    ) -> Result<Vec<TrackerIssue>> {
        self.check(jql)?;
        let keys = self.searches.get(jql).cloned().unwrap_or_default();
        keys.iter()
            .take(max_results)
            .map(|key| self.get_issue(key, fields))
            .collect()
    }

    fn project_metadata(&self, project: &ProjectRef) -> Result<ProjectMetadata> {
        self.check(&project.key)?;
        self.metadata_calls.set(self.metadata_calls.get() + 1);
        self.metadata
            .get(&project.key)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("project {}", project.key)))
    }

    fn update_issue_field(&self, key: &str, field_id: &str, value: Option<f64>) -> Result<()> {
        self.check(key)?;
        let mut issues = self.issues.borrow_mut();
        let issue = issues
            .get_mut(key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))?;
        issue
            .fields
            .insert(field_id.to_string(), value.map_or(Value::Null, Value::from));
        self.writes.borrow_mut().push(FieldWrite {
            key: key.to_string(),
            field_id: field_id.to_string(),
            value,
        });
        Ok(())
    }

    fn fetch_issues(&self, keys: &[String], fields: &[&str]) -> Result<Vec<TrackerIssue>> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        keys.iter().map(|key| self.get_issue(key, fields)).collect()
    }
}
