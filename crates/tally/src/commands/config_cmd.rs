//! `tally config` -- inspect the effective configuration.

use anyhow::Result;

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `tally config` command.
pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    match &args.command {
        ConfigCommands::Show => {
            let config = ctx.load_config()?;
            let source = ctx.config_file();
            if ctx.json {
                output_json(&serde_json::json!({
                    "file": source.as_ref().map(|p| p.display().to_string()),
                    "config": config.redacted(),
                }));
            } else {
                if !ctx.quiet {
                    match &source {
                        Some(path) => println!("# from {}", path.display()),
                        None => println!("# no config file found; defaults and environment only"),
                    }
                }
                print!("{}", config.to_redacted_yaml()?);
            }
        }
    }
    Ok(())
}
