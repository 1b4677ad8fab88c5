//! Jira Cloud REST (v3) implementation of [`IssueTracker`].

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::debug;
use ureq::Agent;

use tally_core::issue::{IssueTypeRef, LinkedIssue, ProjectRef, TrackerIssue};

use crate::error::{Result, TrackerError};
use crate::jql;
use crate::traits::{FieldMeta, IssueTracker, IssueTypeMeta, ProjectMetadata};

/// Page size requested from search endpoints.
const PAGE_SIZE: usize = 100;

/// Keys fetched per batched `key in (...)` search.
const FETCH_BATCH: usize = 50;

/// Fields every fetched issue carries, on top of the caller's.
const BASE_FIELDS: [&str; 6] = [
    "summary",
    "status",
    "issuetype",
    "project",
    "subtasks",
    "issuelinks",
];

/// Connection settings for a Jira Cloud site.
#[derive(Debug, Clone)]
pub struct JiraSettings {
    /// Site URL, e.g. `https://example.atlassian.net`.
    pub server: String,
    pub user: String,
    pub api_token: String,
    pub timeout: Duration,
}

/// Blocking Jira client.
pub struct JiraClient {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl JiraClient {
    pub fn new(settings: &JiraSettings) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .build();
        let credentials = STANDARD.encode(format!("{}:{}", settings.user, settings.api_token));
        Self {
            agent: Agent::new_with_config(config),
            base_url: settings.server.trim_end_matches('/').to_string(),
            authorization: format!("Basic {credentials}"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/3/{}", self.base_url, path)
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "GET");
        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json");
        for (name, value) in query {
            request = request.query(*name, value.as_str());
        }
        let mut response = request.call().map_err(|e| map_error(e, &url))?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|e| TrackerError::decode(e.to_string()))
    }

    fn issue_types(&self, project_key: &str) -> Result<Vec<(String, String)>> {
        let body = self.get_json(
            &format!("issue/createmeta/{project_key}/issuetypes"),
            &[("maxResults", "200".to_string())],
        )?;
        let types = body
            .get("issueTypes")
            .or_else(|| body.get("values"))
            .and_then(Value::as_array)
            .ok_or_else(|| TrackerError::decode("createmeta response without issue types"))?;
        Ok(types
            .iter()
            .filter_map(|t| Some((str_at(t, "id")?.to_string(), str_at(t, "name")?.to_string())))
            .collect())
    }

    fn issue_type_fields(&self, project_key: &str, type_id: &str) -> Result<Vec<FieldMeta>> {
        let body = self.get_json(
            &format!("issue/createmeta/{project_key}/issuetypes/{type_id}"),
            &[("maxResults", "200".to_string())],
        )?;
        let fields = body
            .get("fields")
            .or_else(|| body.get("results"))
            .or_else(|| body.get("values"))
            .and_then(Value::as_array)
            .ok_or_else(|| TrackerError::decode("createmeta response without fields"))?;
        Ok(fields
            .iter()
            .filter_map(|f| {
                Some(FieldMeta {
                    id: str_at(f, "fieldId").or_else(|| str_at(f, "key"))?.to_string(),
                    name: str_at(f, "name")?.to_string(),
                })
            })
            .collect())
    }
}

impl IssueTracker for JiraClient {
    fn get_issue(&self, key: &str, fields: &[&str]) -> Result<TrackerIssue> {
        let mut query = Vec::new();
        if !fields.is_empty() {
            query.push(("fields", field_list(fields)));
        }
        let body = self
            .get_json(&format!("issue/{key}"), &query)
            .map_err(|e| match e {
                TrackerError::Http { status: 404, .. } => TrackerError::NotFound(key.to_string()),
                other => other,
            })?;
        parse_issue(&body)
    }

    fn search_issues(
        &self,
        jql: &str,
        fields: &[&str],
        max_results: usize,
    ) -> Result<Vec<TrackerIssue>> {
        let mut issues = Vec::new();
        let mut page_token: Option<String> = None;
        while issues.len() < max_results {
            let mut query = vec![
                ("jql", jql.to_string()),
                ("fields", field_list(fields)),
                ("maxResults", PAGE_SIZE.min(max_results - issues.len()).to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("nextPageToken", token.clone()));
            }
            let body = self.get_json("search/jql", &query)?;
            let page = body
                .get("issues")
                .and_then(Value::as_array)
                .ok_or_else(|| TrackerError::decode("search response without issues"))?;
            for raw in page {
                issues.push(parse_issue(raw)?);
            }
            page_token = str_at(&body, "nextPageToken").map(str::to_string);
            let last = body.get("isLast").and_then(Value::as_bool).unwrap_or(true);
            if page.is_empty() || page_token.is_none() || last {
                break;
            }
        }
        issues.truncate(max_results);
        debug!(jql, count = issues.len(), "search complete");
        Ok(issues)
    }

    fn project_metadata(&self, project: &ProjectRef) -> Result<ProjectMetadata> {
        let mut issue_types = Vec::new();
        for (id, name) in self.issue_types(&project.key)? {
            let fields = self.issue_type_fields(&project.key, &id)?;
            issue_types.push(IssueTypeMeta { id, name, fields });
        }
        Ok(ProjectMetadata {
            project: project.clone(),
            issue_types,
        })
    }

    fn update_issue_field(&self, key: &str, field_id: &str, value: Option<f64>) -> Result<()> {
        let url = self.url(&format!("issue/{key}"));
        debug!(%url, field_id, ?value, "PUT");
        self.agent
            .put(&url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json")
            .send_json(json!({ "fields": { field_id: value } }))
            .map_err(|e| map_error(e, &url))?;
        Ok(())
    }

    fn fetch_issues(&self, keys: &[String], fields: &[&str]) -> Result<Vec<TrackerIssue>> {
        let mut fetched = Vec::with_capacity(keys.len());
        for batch in keys.chunks(FETCH_BATCH) {
            let found = self.search_issues(&jql::keys_in(batch), fields, batch.len())?;
            ensure_all_returned(batch, &found)?;
            fetched.extend(found);
        }
        Ok(fetched)
    }
}

/// Fails with [`TrackerError::NotFound`] naming every requested key a search
/// left out.
fn ensure_all_returned(requested: &[String], found: &[TrackerIssue]) -> Result<()> {
    let missing: Vec<&str> = requested
        .iter()
        .filter(|key| !found.iter().any(|issue| &issue.key == *key))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TrackerError::NotFound(missing.join(", ")))
    }
}

fn map_error(err: ureq::Error, url: &str) -> TrackerError {
    match err {
        ureq::Error::StatusCode(status @ (401 | 403)) => TrackerError::Unauthorized { status },
        ureq::Error::StatusCode(status) => TrackerError::Http {
            status,
            url: url.to_string(),
        },
        other => TrackerError::Transport(other.to_string()),
    }
}

fn field_list(fields: &[&str]) -> String {
    let mut all: Vec<&str> = BASE_FIELDS.to_vec();
    for field in fields {
        if !all.contains(field) {
            all.push(field);
        }
    }
    all.join(",")
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Converts a Jira issue document into a [`TrackerIssue`].
pub fn parse_issue(raw: &Value) -> Result<TrackerIssue> {
    let key = str_at(raw, "key")
        .ok_or_else(|| TrackerError::decode("issue without key"))?
        .to_string();
    let fields = raw
        .get("fields")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let project = fields
        .get("project")
        .map(|p| ProjectRef {
            id: str_at(p, "id").unwrap_or_default().to_string(),
            key: str_at(p, "key").unwrap_or_default().to_string(),
        })
        .unwrap_or_default();
    let issue_type = fields
        .get("issuetype")
        .map(|t| IssueTypeRef {
            id: str_at(t, "id").unwrap_or_default().to_string(),
            name: str_at(t, "name").unwrap_or_default().to_string(),
        })
        .unwrap_or_default();
    let status = fields
        .get("status")
        .and_then(|s| str_at(s, "name"))
        .unwrap_or_default()
        .to_string();
    let summary = fields
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let subtasks = fields
        .get("subtasks")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|s| str_at(s, "key").map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let links = fields
        .get("issuelinks")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(parse_link).collect())
        .unwrap_or_default();

    Ok(TrackerIssue {
        id: str_at(raw, "id").unwrap_or_default().to_string(),
        key,
        project,
        issue_type,
        summary,
        status,
        subtasks,
        links,
        fields,
    })
}

fn parse_link(link: &Value) -> Option<LinkedIssue> {
    let other = link.get("inwardIssue").or_else(|| link.get("outwardIssue"))?;
    Some(LinkedIssue {
        key: str_at(other, "key")?.to_string(),
        type_name: other
            .get("fields")
            .and_then(|f| f.get("issuetype"))
            .and_then(|t| str_at(t, "name"))
            .unwrap_or_default()
            .to_string(),
    })
}
