//! `tally release` -- roll up the issues of fix versions.

use anyhow::Result;

use tally_ui::styles::format_time;

use crate::cli::ReleaseArgs;
use crate::commands::rollup::{report_written, with_session};
use crate::context::RuntimeContext;
use crate::export::{self, ReleaseRecord};
use crate::output::{output_json, output_skips, output_table};

/// Execute the `tally release` command.
pub fn run(ctx: &RuntimeContext, args: &ReleaseArgs) -> Result<()> {
    with_session(ctx, &args.rollup, |session, _config| {
        let releases = session.releases(&args.names)?;

        if let Some(dir) = &args.rollup.export_dir {
            report_written(ctx, &export::write_releases(dir, &releases)?);
        }

        if ctx.json {
            let records: Vec<ReleaseRecord> = releases.iter().map(ReleaseRecord::from).collect();
            output_json(&serde_json::json!({
                "releases": records,
                "skipped": session.skipped(),
            }));
            return Ok(());
        }

        let rows: Vec<Vec<String>> = releases
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    r.project_key.clone(),
                    r.issues.len().to_string(),
                    format_time(r.totals.summed_time),
                    format_time(r.totals.remaining_time),
                    r.totals.incomplete_estimated_count.to_string(),
                    r.totals.incomplete_unestimated_count.to_string(),
                ]
            })
            .collect();
        output_table(
            &[
                "RELEASE",
                "PROJECT",
                "ISSUES",
                "TIME",
                "REMAINING",
                "ESTIMATED",
                "UNESTIMATED",
            ],
            &rows,
        );
        output_skips(session.skipped());
        Ok(())
    })
}
