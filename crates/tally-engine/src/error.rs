//! Engine error types.

use tally_config::ConfigError;
use tally_core::kind::IssueKind;
use tally_core::mapping::IncompleteMapping;

/// Errors that abort a rollup run.
///
/// Failures scoped to a single Epic, Initiative or Release are not errors;
/// they are recorded as skips on the session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A project's estimate fields could not be resolved for every kind.
    #[error("project {project} has no estimate field for: {}", join_kinds(.missing))]
    MappingIncomplete {
        /// Key of the project being resolved.
        project: String,
        /// Every kind that could not be mapped.
        missing: Vec<IssueKind>,
    },

    /// Project metadata could not be read while resolving a mapping.
    #[error("failed to read metadata for project {project}: {source}")]
    Metadata {
        project: String,
        #[source]
        source: tally_tracker::TrackerError,
    },

    /// A mapping file could not be read or written.
    #[error(transparent)]
    Config(tally_config::ConfigError),
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<IncompleteMapping> for EngineError {
    fn from(err: IncompleteMapping) -> Self {
        Self::MappingIncomplete {
            project: err.project,
            missing: err.missing,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::IncompleteMapping(incomplete) => incomplete.into(),
            other => Self::Config(other),
        }
    }
}

fn join_kinds(kinds: &[IssueKind]) -> String {
    kinds
        .iter()
        .map(IssueKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
