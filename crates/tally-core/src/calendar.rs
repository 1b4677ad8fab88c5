//! Calendar distribution: spreads each Epic's time across the months it spans.
//!
//! Summed time is allocated by the share of the Epic's day span falling in
//! each month. Remaining time is allocated over the part of the span that is
//! still ahead of `today`, so months already past receive none of it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::rounding::round2;
use crate::skip::{Skip, SkipReason};

/// A calendar month key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Zero-padded `YYYY-MM`, suitable for file names.
    pub fn padded(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Parses `YYYY-MM` (the month may or may not be zero-padded).
    pub fn parse(s: &str) -> Option<Self> {
        let (year, month) = s.trim().split_once('-')?;
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

/// What happens to the remaining time of a span that ended before today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverdueRemaining {
    /// The month containing today takes all of it (only when the span ends
    /// in that month).
    #[default]
    CurrentMonth,
    /// The span's final month takes all of it, even if already past.
    FinalMonth,
    /// It is not allocated anywhere.
    Drop,
}

/// Epic input to the distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct EpicSpan {
    pub key: String,
    pub summary: String,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub summed_time: f64,
    pub remaining_time: f64,
}

/// Initiative input: its own dates bound and default its Epics' dates.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiativeSpan {
    pub key: String,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub epics: Vec<EpicSpan>,
}

/// One Epic's share of a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicContribution {
    pub epic_key: String,
    pub summary: String,
    pub initiative_key: String,
    pub summed_time: f64,
    pub remaining_time: f64,
}

/// A month bucket with every Epic contribution that touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthWorkload {
    pub month: YearMonth,
    pub contributions: Vec<EpicContribution>,
}

impl MonthWorkload {
    /// Sum of the per-epic summed-time contributions.
    pub fn summed_total(&self) -> f64 {
        round2(self.contributions.iter().map(|c| c.summed_time).sum())
    }

    /// Sum of the per-epic remaining-time contributions.
    pub fn remaining_total(&self) -> f64 {
        round2(self.contributions.iter().map(|c| c.remaining_time).sum())
    }
}

/// Result of a distribution pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    /// Month buckets in calendar order.
    pub months: Vec<MonthWorkload>,
    /// Epics left out for lack of dates.
    pub skipped: Vec<Skip>,
}

/// A single month's allocation for one span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthShare {
    pub month: YearMonth,
    pub summed_time: f64,
    pub remaining_time: f64,
}

/// Distributes every Epic of every Initiative into month buckets.
pub fn distribute(
    initiatives: &[InitiativeSpan],
    today: NaiveDate,
    overdue: OverdueRemaining,
) -> Schedule {
    let mut buckets: BTreeMap<YearMonth, Vec<EpicContribution>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for initiative in initiatives {
        for epic in &initiative.epics {
            let Some((start, end)) = resolve_span(initiative, epic) else {
                skipped.push(Skip::new(
                    &epic.key,
                    SkipReason::DateResolutionGap,
                    format!(
                        "neither the epic nor initiative {} has a due date",
                        initiative.key
                    ),
                ));
                continue;
            };
            let shares = allocate(
                start,
                end,
                epic.summed_time,
                epic.remaining_time,
                today,
                overdue,
            );
            for share in shares {
                buckets.entry(share.month).or_default().push(EpicContribution {
                    epic_key: epic.key.clone(),
                    summary: epic.summary.clone(),
                    initiative_key: initiative.key.clone(),
                    summed_time: share.summed_time,
                    remaining_time: share.remaining_time,
                });
            }
        }
    }

    Schedule {
        months: buckets
            .into_iter()
            .map(|(month, contributions)| MonthWorkload {
                month,
                contributions,
            })
            .collect(),
        skipped,
    }
}

/// Resolves the `[start, end]` span of an Epic, or `None` without a due date.
///
/// The start is the Epic's own start clamped to the Initiative's start, or
/// the end date when the Epic has none.
pub fn resolve_span(
    initiative: &InitiativeSpan,
    epic: &EpicSpan,
) -> Option<(NaiveDate, NaiveDate)> {
    let end = epic.due.or(initiative.due)?;
    let start = match (epic.start, initiative.start) {
        (Some(own), Some(bound)) => own.max(bound),
        (Some(own), None) => own,
        (None, _) => end,
    };
    Some((start.min(end), end))
}

/// Allocates one span's summed and remaining time across its months.
pub fn allocate(
    start: NaiveDate,
    end: NaiveDate,
    summed_time: f64,
    remaining_time: f64,
    today: NaiveDate,
    overdue: OverdueRemaining,
) -> Vec<MonthShare> {
    let total_span_days = days_inclusive(start, end);
    // A span on its last day still has that day left.
    let remaining_span_days = if start <= today && today <= end {
        days_inclusive(today, end)
    } else {
        total_span_days
    };
    let current = YearMonth::of(today);
    let overdue_span = end < today;

    let mut shares = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let month = YearMonth::of(cursor);
        let next = first_of_next_month(cursor);
        let month_end = match next.and_then(|n| n.pred_opt()) {
            Some(last) => last.min(end),
            None => end,
        };
        let days = days_inclusive(cursor, month_end);

        let remaining_days = if month < current {
            if overdue == OverdueRemaining::FinalMonth && month_end == end && overdue_span {
                remaining_span_days
            } else {
                0
            }
        } else if month == current {
            if overdue_span {
                match overdue {
                    OverdueRemaining::CurrentMonth | OverdueRemaining::FinalMonth => {
                        remaining_span_days
                    }
                    OverdueRemaining::Drop => 0,
                }
            } else {
                days_inclusive(today.max(cursor), month_end)
            }
        } else {
            days
        };

        shares.push(MonthShare {
            month,
            summed_time: round2(summed_time * days as f64 / total_span_days as f64),
            remaining_time: round2(
                remaining_time * remaining_days as f64 / remaining_span_days as f64,
            ),
        });

        match next {
            Some(n) => cursor = n,
            None => break,
        }
    }
    shares
}

fn days_inclusive(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days() + 1
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}
