//! Clap CLI definitions for the `tally` command.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use tally_core::calendar::YearMonth;
use tally_engine::RollupOptions;

/// tally -- roll up issue estimates and forecast them by month.
#[derive(Parser, Debug)]
#[command(
    name = "tally",
    about = "Roll up issue tracker estimates and forecast them by calendar month",
    long_about = "Rolls work estimates up from subtasks to stories, epics and initiatives, \
                  scores how much outstanding work is actually estimated, and spreads \
                  the result across calendar months.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (default: auto-discover .tally/config.yaml).
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Roll up one or more epics.
    Epic(EpicArgs),

    /// Roll up initiatives through their linked epics.
    Initiative(InitiativeArgs),

    /// Roll up every issue of one or more fix versions.
    Release(ReleaseArgs),

    /// Inspect per-project field mappings.
    Mapping(MappingArgs),

    /// Show the effective configuration.
    Config(ConfigArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

// ---------------------------------------------------------------------------
// Rollup commands
// ---------------------------------------------------------------------------

/// Flags shared by every rollup command.
#[derive(Args, Debug, Clone)]
pub struct RollupArgs {
    /// Write recomputed estimates back to the tracker.
    #[arg(long)]
    pub write_back: bool,

    /// Recompute stories from their subtasks even if they carry an estimate.
    #[arg(long)]
    pub force_recalculate: bool,

    /// Directory to write JSON estimate files into.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Read field mappings from this directory instead of discovering them.
    #[arg(long, value_name = "DIR")]
    pub import_mappings: Option<PathBuf>,

    /// Save the field mappings used by this run to this directory.
    #[arg(long, value_name = "DIR")]
    pub export_mappings: Option<PathBuf>,
}

impl RollupArgs {
    pub fn options(&self) -> RollupOptions {
        RollupOptions {
            force_recalculate: self.force_recalculate,
            write_back: self.write_back,
        }
    }
}

/// Arguments for `tally epic`.
#[derive(Args, Debug)]
pub struct EpicArgs {
    /// Epic keys, comma or space separated.
    #[arg(required = true, value_delimiter = ',', value_name = "KEY")]
    pub keys: Vec<String>,

    #[command(flatten)]
    pub rollup: RollupArgs,
}

/// Arguments for `tally initiative`.
#[derive(Args, Debug)]
pub struct InitiativeArgs {
    /// Initiative keys, comma or space separated.
    #[arg(required = true, value_delimiter = ',', value_name = "KEY")]
    pub keys: Vec<String>,

    /// Only collect epics due in this month (YYYY-MM).
    #[arg(long, value_name = "YYYY-MM", value_parser = parse_month)]
    pub due_month: Option<YearMonth>,

    /// Also distribute the epics across calendar months.
    #[arg(long)]
    pub schedule: bool,

    /// Reference date for the schedule (default: today).
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date, requires = "schedule")]
    pub today: Option<NaiveDate>,

    #[command(flatten)]
    pub rollup: RollupArgs,
}

/// Arguments for `tally release`.
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Fix version names, comma separated.
    #[arg(required = true, value_delimiter = ',', value_name = "NAME")]
    pub names: Vec<String>,

    #[command(flatten)]
    pub rollup: RollupArgs,
}

fn parse_month(s: &str) -> Result<YearMonth, String> {
    YearMonth::parse(s).ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Arguments for `tally mapping`.
#[derive(Args, Debug)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub command: MappingCommands,
}

/// Mapping subcommands.
#[derive(Subcommand, Debug)]
pub enum MappingCommands {
    /// Show a project's field mapping.
    Show(MappingShowArgs),
}

/// Arguments for `tally mapping show`.
#[derive(Args, Debug)]
pub struct MappingShowArgs {
    /// Project key.
    pub project: String,

    /// Read the stored mapping from this directory instead of the tracker.
    #[arg(long, value_name = "DIR")]
    pub from: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Arguments for `tally config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration with secrets masked.
    Show,
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Arguments for `tally completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}
