//! `tally` -- estimate rollup and capacity forecast for Jira projects.
//!
//! Parses CLI arguments with clap, resolves the runtime context, sets up
//! logging and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod export;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Log filter selected by `--verbose`.
const VERBOSE_FILTER: &str = "tally=debug,tally_engine=debug,tally_tracker=debug";

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(130);
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);
    init_logging(&ctx);

    let result = match cli.command {
        Some(Commands::Epic(args)) => commands::epic::run(&ctx, &args),
        Some(Commands::Initiative(args)) => commands::initiative::run(&ctx, &args),
        Some(Commands::Release(args)) => commands::release::run(&ctx, &args),
        Some(Commands::Mapping(args)) => commands::mapping::run(&ctx, &args),
        Some(Commands::Config(args)) => commands::config_cmd::run(&ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, &args),
        Some(Commands::Version) => commands::version::run(&ctx),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(ctx: &RuntimeContext) {
    let filter = if ctx.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if ctx.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
