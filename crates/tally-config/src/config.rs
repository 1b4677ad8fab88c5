//! Configuration types and loading.
//!
//! The main entry point is [`TallyConfig`], assembled by [`load_config`] from
//! built-in defaults, an optional YAML file, and `TALLY_`-prefixed
//! environment variables (`__` separates nesting levels, e.g.
//! `TALLY_TRACKER__API_TOKEN`).

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use tally_core::calendar::OverdueRemaining;
use tally_core::confidence::ConfidenceWeights;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layered configuration could not be assembled or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    /// A file could not be read or written.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// A field-mapping file contained invalid JSON.
    #[error("failed to parse mapping file: {0}")]
    Mapping(#[from] serde_json::Error),

    /// A field-mapping file does not cover every issue kind.
    #[error("incomplete mapping file: {0}")]
    IncompleteMapping(#[from] tally_core::mapping::IncompleteMapping),

    /// The configuration could not be rendered as YAML.
    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_yaml::Error),

    /// A value required for this run is missing.
    #[error("missing configuration value '{0}' (set it in .tally/config.yaml or TALLY_{1})")]
    Missing(&'static str, &'static str),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Issue tracker connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Site URL, e.g. `https://example.atlassian.net`.
    pub server: String,
    /// Account e-mail used for basic auth.
    pub user: String,
    /// API token paired with `user`.
    pub api_token: String,
    /// Upper bound on issues returned by one search.
    pub max_results: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            user: String::new(),
            api_token: String::new(),
            max_results: 1000,
            timeout_secs: 30,
        }
    }
}

impl TrackerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tracker field ids that are not part of a project's field mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// Start-date field of Epics and Initiatives.
    pub start_date: String,
    /// Due-date field of Epics and Initiatives.
    pub due_date: String,
    /// Estimate field read from Initiatives still in Initial Estimation.
    pub initiative_estimate: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            start_date: "customfield_10015".to_string(),
            due_date: "duedate".to_string(),
            initiative_estimate: "customfield_10016".to_string(),
        }
    }
}

/// Calendar distribution section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Where remaining time of already-ended spans goes.
    pub overdue_remaining: OverdueRemaining,
}

/// Field-mapping persistence section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MappingsConfig {
    /// Directory holding `<PROJECT>_config.json` files.
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full run configuration.
///
/// Every section defaults, so a partially specified file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TallyConfig {
    pub tracker: TrackerConfig,
    pub fields: FieldsConfig,
    pub confidence: ConfidenceWeights,
    pub schedule: ScheduleConfig,
    pub mappings: MappingsConfig,
}

impl TallyConfig {
    /// Checks that everything needed to talk to the tracker is present.
    pub fn require_tracker(&self) -> Result<()> {
        if self.tracker.server.trim().is_empty() {
            return Err(ConfigError::Missing("tracker.server", "TRACKER__SERVER"));
        }
        if self.tracker.user.trim().is_empty() {
            return Err(ConfigError::Missing("tracker.user", "TRACKER__USER"));
        }
        if self.tracker.api_token.trim().is_empty() {
            return Err(ConfigError::Missing("tracker.api_token", "TRACKER__API_TOKEN"));
        }
        Ok(())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        let weights = &self.confidence;
        if weights.story_point_weight <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "confidence.story_point_weight".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if weights.story_point_weight_ceiling < weights.story_point_weight {
            return Err(ConfigError::InvalidValue {
                key: "confidence.story_point_weight_ceiling".to_string(),
                reason: "must not be below story_point_weight".to_string(),
            });
        }
        if self.tracker.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tracker.max_results".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// A copy with the API token masked, for display.
    pub fn redacted(&self) -> TallyConfig {
        let mut shown = self.clone();
        if !shown.tracker.api_token.is_empty() {
            shown.tracker.api_token = "********".to_string();
        }
        shown
    }

    /// Renders the configuration as YAML with the API token masked.
    pub fn to_redacted_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.redacted())?)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Builds the provider stack: defaults, then the YAML file, then the environment.
pub fn figment(config_file: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(TallyConfig::default()));
    if let Some(path) = config_file {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(Env::prefixed("TALLY_").split("__"))
}

/// Loads and validates the configuration.
///
/// A missing file is not an error; defaults and the environment still apply.
pub fn load_config(config_file: Option<&Path>) -> Result<TallyConfig> {
    extract(figment(config_file))
}

/// Extracts and validates a configuration from any provider stack.
pub fn extract(figment: Figment) -> Result<TallyConfig> {
    let config: TallyConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
