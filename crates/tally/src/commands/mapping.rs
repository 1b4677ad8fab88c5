//! `tally mapping` -- inspect per-project field mappings.

use anyhow::{Context, Result};

use tally_config::mappings::load_mapping;
use tally_core::issue::ProjectRef;
use tally_core::kind::IssueKind;
use tally_core::mapping::FieldMapping;
use tally_engine::FieldMappingResolver;

use crate::cli::{MappingArgs, MappingCommands, MappingShowArgs};
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

/// Execute the `tally mapping` command.
pub fn run(ctx: &RuntimeContext, args: &MappingArgs) -> Result<()> {
    match &args.command {
        MappingCommands::Show(show) => run_show(ctx, show),
    }
}

fn run_show(ctx: &RuntimeContext, args: &MappingShowArgs) -> Result<()> {
    let mapping = match &args.from {
        Some(dir) => load_mapping(dir, &args.project)
            .with_context(|| format!("failed to read mapping from {}", dir.display()))?
            .with_context(|| format!("no mapping for {} in {}", args.project, dir.display()))?,
        None => resolve(ctx, &args.project)?,
    };

    if ctx.json {
        output_json(&mapping);
    } else {
        output_table(&["KIND", "TYPE ID", "ESTIMATE FIELD"], &mapping_rows(&mapping));
    }
    Ok(())
}

/// Uses the configured mapping directory, then the tracker.
fn resolve(ctx: &RuntimeContext, project: &str) -> Result<FieldMapping> {
    let config = ctx.load_config()?;
    if let Some(dir) = &config.mappings.dir {
        if let Some(mapping) = load_mapping(dir, project)? {
            return Ok(mapping);
        }
    }
    let tracker = ctx.connect(&config)?;
    let project = ProjectRef {
        id: String::new(),
        key: project.to_string(),
    };
    let mut resolver = FieldMappingResolver::new();
    let mapping = resolver.resolve(&tracker, &project)?;
    Ok(mapping.clone())
}

fn mapping_rows(mapping: &FieldMapping) -> Vec<Vec<String>> {
    IssueKind::OPERATIONAL
        .into_iter()
        .chain([IssueKind::Initiative])
        .filter_map(|kind| {
            mapping.fields(kind).map(|fields| {
                vec![
                    kind.to_string(),
                    fields.type_id.clone(),
                    fields.estimate_field.clone(),
                ]
            })
        })
        .collect()
}
