//! `tally initiative` -- roll up initiatives and optionally schedule them.

use anyhow::Result;
use chrono::Local;

use tally_core::aggregate::{InitiativeAggregate, InitiativeSource};
use tally_core::calendar::MonthWorkload;
use tally_engine::schedule::build_schedule;
use tally_ui::styles::{
    TREE_CHILD, TREE_LAST, format_time, render_bold, render_category, render_confidence,
    render_muted, render_unestimated,
};

use crate::cli::InitiativeArgs;
use crate::commands::rollup::{report_written, with_session};
use crate::context::RuntimeContext;
use crate::export::{self, InitiativeRecord, MonthRecord};
use crate::output::{output_json, output_skips, output_table};

/// Execute the `tally initiative` command.
pub fn run(ctx: &RuntimeContext, args: &InitiativeArgs) -> Result<()> {
    with_session(ctx, &args.rollup, |session, config| {
        let initiatives = session.initiatives(&args.keys, args.due_month)?;

        let months = if args.schedule {
            let today = args.today.unwrap_or_else(|| Local::now().date_naive());
            let schedule = build_schedule(
                &initiatives,
                session.fields(),
                today,
                config.schedule.overdue_remaining,
            );
            for skip in schedule.skipped {
                session.skip(skip);
            }
            Some(schedule.months)
        } else {
            None
        };

        if let Some(dir) = &args.rollup.export_dir {
            report_written(ctx, &export::write_initiatives(dir, &initiatives)?);
            if let Some(months) = &months {
                report_written(ctx, &export::write_schedule(dir, months)?);
            }
        }

        if ctx.json {
            let records: Vec<InitiativeRecord> =
                initiatives.iter().map(InitiativeRecord::from).collect();
            let schedule: Option<Vec<MonthRecord>> = months
                .as_ref()
                .map(|months| months.iter().map(MonthRecord::from).collect());
            output_json(&serde_json::json!({
                "initiatives": records,
                "schedule": schedule,
                "skipped": session.skipped(),
            }));
            return Ok(());
        }

        for initiative in &initiatives {
            print_initiative(initiative, ctx.quiet);
        }
        if let Some(months) = &months {
            print_schedule(months);
        }
        output_skips(session.skipped());
        Ok(())
    })
}

fn print_initiative(initiative: &InitiativeAggregate, quiet: bool) {
    let totals = &initiative.totals;
    println!(
        "{} {}  time {}  remaining {}  confidence {}",
        render_bold(initiative.key()),
        initiative.initiative.summary,
        format_time(totals.summed_time),
        format_time(totals.remaining_time),
        render_confidence(initiative.estimation_confidence),
    );
    if initiative.source == InitiativeSource::InitialEstimate {
        println!(
            "  {}",
            render_muted("in initial estimation; own estimate used")
        );
        println!();
        return;
    }
    println!(
        "  {} estimated, {} unestimated outstanding issues",
        totals.incomplete_estimated_count,
        render_unestimated(totals.incomplete_unestimated_count),
    );
    if quiet || initiative.epics.is_empty() {
        println!();
        return;
    }
    let last = initiative.epics.len() - 1;
    for (i, epic) in initiative.epics.iter().enumerate() {
        let branch = if i == last { TREE_LAST } else { TREE_CHILD };
        println!(
            "  {}{} {}  {} / {}",
            render_muted(branch),
            epic.key(),
            epic.epic.summary,
            format_time(epic.totals.summed_time),
            format_time(epic.totals.remaining_time),
        );
    }
    println!();
}

fn print_schedule(months: &[MonthWorkload]) {
    println!("{}", render_category("schedule"));
    let rows: Vec<Vec<String>> = months
        .iter()
        .map(|m| {
            vec![
                m.month.padded(),
                format_time(m.summed_total()),
                format_time(m.remaining_total()),
                m.contributions
                    .iter()
                    .map(|c| c.epic_key.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect();
    output_table(&["MONTH", "TIME", "REMAINING", "EPICS"], &rows);
}
