//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds the global flags and knows how to load the
//! configuration and connect to the tracker on demand, so commands that work
//! offline never need credentials.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use tally_config::config::load_config;
use tally_config::tally_dir;
use tally_config::TallyConfig;
use tally_tracker::jira::{JiraClient, JiraSettings};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Explicit `--config` path, if given.
    pub config_path: Option<PathBuf>,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            config_path: global.config.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// The configuration file that will be read, if any.
    pub fn config_file(&self) -> Option<PathBuf> {
        let cwd = env::current_dir().ok()?;
        tally_dir::config_file(self.config_path.as_deref(), &cwd)
    }

    /// Loads defaults, the configuration file and `TALLY_` variables.
    pub fn load_config(&self) -> Result<TallyConfig> {
        let file = self.config_file();
        if let Some(path) = &self.config_path {
            if !path.is_file() {
                anyhow::bail!("config file not found: {}", path.display());
            }
        }
        load_config(file.as_deref()).with_context(|| match &file {
            Some(path) => format!("failed to load {}", path.display()),
            None => "failed to load configuration".to_string(),
        })
    }

    /// Builds a tracker client from the configuration.
    pub fn connect(&self, config: &TallyConfig) -> Result<JiraClient> {
        config
            .require_tracker()
            .context("tracker connection is not configured")?;
        let tracker = &config.tracker;
        Ok(JiraClient::new(&JiraSettings {
            server: tracker.server.clone(),
            user: tracker.user.clone(),
            api_token: tracker.api_token.clone(),
            timeout: tracker.timeout(),
        }))
    }
}
