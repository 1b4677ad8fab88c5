//! Turns rolled-up Initiatives into calendar month buckets.

use chrono::NaiveDate;
use tracing::debug;

use tally_config::config::FieldsConfig;
use tally_core::aggregate::InitiativeAggregate;
use tally_core::calendar::{EpicSpan, InitiativeSpan, OverdueRemaining, Schedule, distribute};

/// Reads start and due dates off the aggregates' issues.
pub fn initiative_spans(
    initiatives: &[InitiativeAggregate],
    fields: &FieldsConfig,
) -> Vec<InitiativeSpan> {
    initiatives
        .iter()
        .map(|initiative| InitiativeSpan {
            key: initiative.key().to_string(),
            start: initiative.initiative.date_field(&fields.start_date),
            due: initiative.initiative.date_field(&fields.due_date),
            epics: initiative
                .epics
                .iter()
                .map(|epic| EpicSpan {
                    key: epic.key().to_string(),
                    summary: epic.epic.summary.clone(),
                    start: epic.epic.date_field(&fields.start_date),
                    due: epic.epic.date_field(&fields.due_date),
                    summed_time: epic.totals.summed_time,
                    remaining_time: epic.totals.remaining_time,
                })
                .collect(),
        })
        .collect()
}

/// Distributes every Epic of `initiatives` into month buckets as of `today`.
///
/// Epics without a usable due date end up in [`Schedule::skipped`].
pub fn build_schedule(
    initiatives: &[InitiativeAggregate],
    fields: &FieldsConfig,
    today: NaiveDate,
    overdue: OverdueRemaining,
) -> Schedule {
    let spans = initiative_spans(initiatives, fields);
    let schedule = distribute(&spans, today, overdue);
    debug!(months = schedule.months.len(), %today, "schedule built");
    schedule
}
