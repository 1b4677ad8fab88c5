//! Rolled-up issues and the Epic / Initiative / Release aggregates built from them.

use serde::{Deserialize, Serialize};

use crate::confidence::{ConfidenceWeights, estimation_confidence};
use crate::issue::{DONE_STATUS, TrackerIssue};
use crate::kind::IssueKind;
use crate::rounding::round2;

/// An Epic child (Story, Task, Bug, ...) after its estimate was rolled up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRollup {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub kind: Option<IssueKind>,
    /// Subtask keys, in tracker order.
    pub children: Vec<String>,
    /// Subtasks that had no estimate when the sum was taken.
    pub unestimated_children: Vec<String>,
    pub summed_time: f64,
    /// Recomputed estimate to store once the whole unit has rolled up.
    #[serde(skip)]
    pub write_back: Option<EstimateWrite>,
}

/// A Story estimate waiting to be written to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateWrite {
    pub key: String,
    pub field_id: String,
    pub value: f64,
}

impl StoryRollup {
    /// Starts a rollup for `issue` with no time accounted yet.
    pub fn pending(issue: &TrackerIssue, kind: Option<IssueKind>) -> Self {
        Self {
            key: issue.key.clone(),
            summary: issue.summary.clone(),
            status: issue.status.clone(),
            kind,
            children: issue.subtasks.clone(),
            unestimated_children: Vec::new(),
            summed_time: 0.0,
            write_back: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == DONE_STATUS
    }
}

/// Summed and outstanding work over a set of issues.
///
/// `incomplete_estimated_count + incomplete_unestimated_count` always equals
/// the number of recorded issues that are not Done.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkTotals {
    pub summed_time: f64,
    pub remaining_time: f64,
    pub incomplete_estimated_count: u32,
    pub incomplete_unestimated_count: u32,
}

impl WorkTotals {
    /// Accounts for one rolled-up issue.
    ///
    /// Done issues only add to `summed_time`.
    pub fn record(&mut self, issue: &StoryRollup) {
        self.summed_time += issue.summed_time;
        if issue.is_done() {
            return;
        }
        self.remaining_time += issue.summed_time;
        if issue.summed_time > 0.0 {
            self.incomplete_estimated_count += 1;
        } else {
            self.incomplete_unestimated_count += 1;
        }
    }

    /// Adds another set of totals to this one.
    pub fn absorb(&mut self, other: &WorkTotals) {
        self.summed_time += other.summed_time;
        self.remaining_time += other.remaining_time;
        self.incomplete_estimated_count += other.incomplete_estimated_count;
        self.incomplete_unestimated_count += other.incomplete_unestimated_count;
    }

    pub fn incomplete_count(&self) -> u32 {
        self.incomplete_estimated_count + self.incomplete_unestimated_count
    }
}

/// An Epic with its rolled-up child issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicAggregate {
    pub epic: TrackerIssue,
    pub issues: Vec<StoryRollup>,
    pub totals: WorkTotals,
}

impl EpicAggregate {
    pub fn new(epic: TrackerIssue) -> Self {
        Self {
            epic,
            issues: Vec::new(),
            totals: WorkTotals::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.epic.key
    }

    /// Adds already rolled-up issues to the epic.
    pub fn add_rolled_up(&mut self, issues: impl IntoIterator<Item = StoryRollup>) {
        for issue in issues {
            self.totals.record(&issue);
            self.issues.push(issue);
        }
    }
}

/// Where an Initiative's numbers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiativeSource {
    /// Summed from linked Epics.
    Epics,
    /// Read from the Initiative's own estimate while it is still in
    /// Initial Estimation.
    InitialEstimate,
}

/// An Initiative with its Epics and estimation confidence.
///
/// The confidence is derived once per aggregation pass and only changes on an
/// explicit [`recalculate`](Self::recalculate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeAggregate {
    pub initiative: TrackerIssue,
    pub epics: Vec<EpicAggregate>,
    pub source: InitiativeSource,
    pub totals: WorkTotals,
    pub estimation_confidence: f64,
}

impl InitiativeAggregate {
    /// Full rollup from the Initiative's Epics.
    pub fn from_epics(
        initiative: TrackerIssue,
        epics: Vec<EpicAggregate>,
        weights: &ConfidenceWeights,
    ) -> Self {
        let mut aggregate = Self {
            initiative,
            epics,
            source: InitiativeSource::Epics,
            totals: WorkTotals::default(),
            estimation_confidence: 0.0,
        };
        aggregate.recalculate(weights);
        aggregate
    }

    /// Degenerate path for an Initiative without Epic decomposition: its own
    /// estimate is both summed and remaining time, with counts fixed at 1/1.
    pub fn initial_estimate(
        initiative: TrackerIssue,
        estimate: f64,
        weights: &ConfidenceWeights,
    ) -> Self {
        let mut aggregate = Self {
            initiative,
            epics: Vec::new(),
            source: InitiativeSource::InitialEstimate,
            totals: WorkTotals {
                summed_time: estimate,
                remaining_time: estimate,
                incomplete_estimated_count: 1,
                incomplete_unestimated_count: 1,
            },
            estimation_confidence: 0.0,
        };
        aggregate.recalculate(weights);
        aggregate
    }

    pub fn key(&self) -> &str {
        &self.initiative.key
    }

    /// Re-derives the totals (for Epic-sourced initiatives) and the confidence.
    pub fn recalculate(&mut self, weights: &ConfidenceWeights) {
        if self.source == InitiativeSource::Epics {
            let mut totals = WorkTotals::default();
            for epic in &self.epics {
                totals.absorb(&epic.totals);
            }
            self.totals = totals;
        }
        self.estimation_confidence = estimation_confidence(
            self.totals.incomplete_estimated_count,
            self.totals.incomplete_unestimated_count,
            self.totals.remaining_time,
            weights,
        );
    }
}

/// Issues carrying one fix version, rolled up like an Epic's children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAggregate {
    pub name: String,
    pub project_key: String,
    pub issues: Vec<StoryRollup>,
    pub totals: WorkTotals,
}

impl ReleaseAggregate {
    pub fn new(name: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project_key: project_key.into(),
            issues: Vec::new(),
            totals: WorkTotals::default(),
        }
    }

    pub fn add_rolled_up(&mut self, issues: impl IntoIterator<Item = StoryRollup>) {
        for issue in issues {
            self.totals.record(&issue);
            self.issues.push(issue);
        }
    }
}

/// Rounds every total to two decimals for reporting.
pub fn rounded(totals: &WorkTotals) -> WorkTotals {
    WorkTotals {
        summed_time: round2(totals.summed_time),
        remaining_time: round2(totals.remaining_time),
        ..*totals
    }
}
