//! Session setup shared by the `epic`, `initiative` and `release` commands.

use anyhow::{Context, Result};
use tracing::info;

use tally_config::TallyConfig;
use tally_engine::{FieldMappingResolver, RollupSession};

use crate::cli::RollupArgs;
use crate::context::RuntimeContext;
use crate::export;

/// Loads configuration, connects to the tracker and runs `body` in a fresh
/// session. Mappings are exported afterwards when requested, and the skip
/// ledger is written next to the estimate files.
pub fn with_session<T>(
    ctx: &RuntimeContext,
    args: &RollupArgs,
    body: impl FnOnce(&mut RollupSession<'_>, &TallyConfig) -> Result<T>,
) -> Result<T> {
    let config = ctx.load_config()?;
    let tracker = ctx.connect(&config)?;

    let mut resolver = FieldMappingResolver::new();
    if let Some(dir) = args.import_mappings.as_ref().or(config.mappings.dir.as_ref()) {
        resolver = resolver.with_import_dir(dir);
    }
    let mut session = RollupSession::new(&tracker, resolver, &config, args.options());

    let output = body(&mut session, &config)?;

    if let Some(dir) = &args.export_mappings {
        let written = session
            .resolver()
            .export_to(dir)
            .with_context(|| format!("failed to export mappings to {}", dir.display()))?;
        info!(count = written.len(), dir = %dir.display(), "field mappings exported");
    }
    if let Some(dir) = &args.export_dir {
        export::write_skipped(dir, session.skipped())?;
    }
    Ok(output)
}

/// Logs the files an export produced.
pub fn report_written(ctx: &RuntimeContext, written: &[std::path::PathBuf]) {
    for path in written {
        info!(path = %path.display(), "wrote");
        if ctx.verbose && !ctx.json {
            eprintln!("wrote {}", path.display());
        }
    }
}
