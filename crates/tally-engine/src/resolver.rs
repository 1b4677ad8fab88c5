//! Field Mapping Resolver.
//!
//! Finds, per project, the issue-type id and estimate field of every issue
//! kind. A mapping is resolved at most once per project per run: either read
//! from a previously exported file or discovered from project metadata.

use std::collections::BTreeMap;
use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tally_config::mappings;
use tally_core::issue::ProjectRef;
use tally_core::kind::IssueKind;
use tally_core::mapping::{FieldMapping, KindFields};
use tally_tracker::{IssueTracker, ProjectMetadata};

use crate::error::{EngineError, Result};

/// Display name of the estimate field looked up on every issue type.
pub const ESTIMATE_FIELD_NAME: &str = "Story point estimate";

/// Resolved mappings of one run, keyed by project id (or key when the id is
/// unknown). First resolution wins.
#[derive(Debug, Default)]
pub struct MappingCache {
    by_project: HashMap<String, FieldMapping>,
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached mapping, resolving it with `resolve` on a miss.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        project: &ProjectRef,
        resolve: F,
    ) -> Result<&FieldMapping>
    where
        F: FnOnce() -> Result<FieldMapping>,
    {
        match self.by_project.entry(cache_key(project)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(resolve()?)),
        }
    }

    /// Cached mappings ordered by project key.
    pub fn mappings(&self) -> Vec<&FieldMapping> {
        let mut all: Vec<&FieldMapping> = self.by_project.values().collect();
        all.sort_by(|a, b| a.project_key().cmp(b.project_key()));
        all
    }

    pub fn len(&self) -> usize {
        self.by_project.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_project.is_empty()
    }
}

fn cache_key(project: &ProjectRef) -> String {
    if project.id.is_empty() {
        project.key.clone()
    } else {
        project.id.clone()
    }
}

/// Resolves project mappings through a run-scoped [`MappingCache`].
#[derive(Debug, Default)]
pub struct FieldMappingResolver {
    cache: MappingCache,
    import_dir: Option<PathBuf>,
}

impl FieldMappingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefers mapping files found in `dir` over tracker discovery.
    pub fn with_import_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.import_dir = Some(dir.into());
        self
    }

    /// Returns the mapping for `project`, loading or discovering it on first use.
    ///
    /// # Errors
    ///
    /// [`EngineError::MappingIncomplete`] when discovery cannot map every
    /// operational kind, [`EngineError::Metadata`] when the tracker cannot
    /// list the project's issue types.
    pub fn resolve(
        &mut self,
        tracker: &dyn IssueTracker,
        project: &ProjectRef,
    ) -> Result<&FieldMapping> {
        let import_dir = self.import_dir.as_deref();
        self.cache.get_or_try_insert_with(project, || {
            if let Some(dir) = import_dir {
                if let Some(mapping) = mappings::load_mapping(dir, &project.key)? {
                    info!(project = %project.key, dir = %dir.display(), "using stored field mapping");
                    return Ok(mapping);
                }
            }
            discover(tracker, project)
        })
    }

    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    /// Writes every mapping resolved so far to `dir`.
    pub fn export_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for mapping in self.cache.mappings() {
            written.push(mappings::save_mapping(dir, mapping)?);
        }
        Ok(written)
    }
}

/// Queries project metadata and builds the mapping from it.
pub fn discover(tracker: &dyn IssueTracker, project: &ProjectRef) -> Result<FieldMapping> {
    debug!(project = %project.key, "discovering field mapping");
    let metadata = tracker
        .project_metadata(project)
        .map_err(|source| EngineError::Metadata {
            project: project.key.clone(),
            source,
        })?;
    mapping_from_metadata(&metadata)
}

/// Picks, for each known issue type, the field named [`ESTIMATE_FIELD_NAME`].
///
/// The first issue type of each kind that carries the field wins.
pub fn mapping_from_metadata(metadata: &ProjectMetadata) -> Result<FieldMapping> {
    let mut kinds = BTreeMap::new();
    for issue_type in &metadata.issue_types {
        let Some(kind) = IssueKind::from_type_name(&issue_type.name) else {
            continue;
        };
        if kinds.contains_key(&kind) {
            continue;
        }
        if let Some(field) = issue_type.field_named(ESTIMATE_FIELD_NAME) {
            kinds.insert(kind, KindFields::new(issue_type.id.clone(), field.id.clone()));
        }
    }
    Ok(FieldMapping::try_new(metadata.project.key.clone(), kinds)?)
}
