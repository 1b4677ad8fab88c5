//! `tally epic` -- roll up one or more epics.

use anyhow::Result;

use tally_core::aggregate::EpicAggregate;
use tally_ui::styles::format_time;
use tally_ui::terminal::{terminal_width, truncate};

use crate::cli::EpicArgs;
use crate::commands::rollup::{report_written, with_session};
use crate::context::RuntimeContext;
use crate::export::{self, EpicRecord};
use crate::output::{output_json, output_skips, output_table};

/// Execute the `tally epic` command.
pub fn run(ctx: &RuntimeContext, args: &EpicArgs) -> Result<()> {
    with_session(ctx, &args.rollup, |session, _config| {
        let epics = session.epics(&args.keys)?;

        if let Some(dir) = &args.rollup.export_dir {
            report_written(ctx, &export::write_epics(dir, &epics)?);
        }

        if ctx.json {
            let records: Vec<EpicRecord> = epics.iter().map(EpicRecord::from).collect();
            output_json(&serde_json::json!({
                "epics": records,
                "skipped": session.skipped(),
            }));
        } else {
            output_table(&EPIC_HEADERS, &epic_rows(&epics));
            output_skips(session.skipped());
        }
        Ok(())
    })
}

const EPIC_HEADERS: [&str; 7] = [
    "KEY",
    "SUMMARY",
    "ISSUES",
    "TIME",
    "REMAINING",
    "ESTIMATED",
    "UNESTIMATED",
];

/// One row per epic, in the order of [`EPIC_HEADERS`].
fn epic_rows(epics: &[EpicAggregate]) -> Vec<Vec<String>> {
    let summary_width = terminal_width().saturating_sub(70).max(20);
    epics
        .iter()
        .map(|epic| {
            vec![
                epic.key().to_string(),
                truncate(&epic.epic.summary, summary_width),
                epic.issues.len().to_string(),
                format_time(epic.totals.summed_time),
                format_time(epic.totals.remaining_time),
                epic.totals.incomplete_estimated_count.to_string(),
                epic.totals.incomplete_unestimated_count.to_string(),
            ]
        })
        .collect()
}
