//! Estimate Rollup Engine.
//!
//! Computes one issue's time from its own estimate field or, for Stories,
//! from its Subtasks.

use tracing::{debug, warn};

use tally_core::aggregate::{EstimateWrite, StoryRollup};
use tally_core::issue::TrackerIssue;
use tally_core::kind::IssueKind;
use tally_core::mapping::FieldMapping;
use tally_tracker::{IssueTracker, Result};

/// How a rollup treats existing estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupOptions {
    /// Recompute Stories from their Subtasks even when they carry an estimate.
    pub force_recalculate: bool,
    /// Write recomputed estimates back to the tracker.
    pub write_back: bool,
}

/// Rolls up a single Epic child.
///
/// Leaves (Task, Subtask, Bug) report their own estimate, or 0. Stories keep
/// an existing estimate unless `force_recalculate` is set and they have
/// Subtasks; otherwise the Subtasks are re-read and their non-null estimates
/// summed. Epics, Initiatives and unknown kinds contribute 0.
///
/// With `write_back` set, a recomputed Story carries the value to store in
/// [`StoryRollup::write_back`]; nothing is written here. Callers apply the
/// writes with [`apply_write_backs`] once the enclosing unit has succeeded.
///
/// # Errors
///
/// Fails only when the Subtask read fails.
pub fn rollup_issue(
    tracker: &dyn IssueTracker,
    issue: &TrackerIssue,
    mapping: &FieldMapping,
    options: RollupOptions,
) -> Result<StoryRollup> {
    let kind = mapping.kind_of(issue);
    let mut rollup = StoryRollup::pending(issue, kind);

    match kind {
        Some(leaf) if leaf.is_leaf() => {
            rollup.summed_time = own_estimate(issue, mapping, leaf);
        }
        Some(IssueKind::Story) => roll_up_story(tracker, issue, mapping, options, &mut rollup)?,
        _ => {
            debug!(key = %issue.key, issue_type = %issue.issue_type.name, "not an estimable child, counting 0");
        }
    }

    debug!(key = %issue.key, kind = ?kind, time = rollup.summed_time, "rolled up");
    Ok(rollup)
}

/// Stores the deferred Story estimates of a fully rolled-up unit.
///
/// A failed write is logged; the rolled-up values stand.
pub fn apply_write_backs(tracker: &dyn IssueTracker, rollups: &[StoryRollup]) {
    for write in rollups.iter().filter_map(|r| r.write_back.as_ref()) {
        if let Err(err) = tracker.update_issue_field(&write.key, &write.field_id, Some(write.value)) {
            warn!(key = %write.key, error = %err, "estimate write-back failed");
        }
    }
}

fn own_estimate(issue: &TrackerIssue, mapping: &FieldMapping, kind: IssueKind) -> f64 {
    mapping
        .estimate_field(kind)
        .and_then(|field| issue.number_field(field))
        .unwrap_or(0.0)
}

fn roll_up_story(
    tracker: &dyn IssueTracker,
    story: &TrackerIssue,
    mapping: &FieldMapping,
    options: RollupOptions,
    rollup: &mut StoryRollup,
) -> Result<()> {
    let story_field = mapping.estimate_field(IssueKind::Story).unwrap_or_default();
    let existing = story.number_field(story_field);

    if story.subtasks.is_empty() || (existing.is_some() && !options.force_recalculate) {
        rollup.summed_time = existing.unwrap_or(0.0);
        return Ok(());
    }

    let subtask_field = mapping
        .estimate_field(IssueKind::Subtask)
        .unwrap_or_default();
    let subtasks = tracker.fetch_issues(&story.subtasks, &[subtask_field])?;
    let mut summed = 0.0;
    for subtask in &subtasks {
        match subtask.number_field(subtask_field) {
            Some(value) => summed += value,
            None => rollup.unestimated_children.push(subtask.key.clone()),
        }
    }
    if !rollup.unestimated_children.is_empty() {
        debug!(
            key = %story.key,
            unestimated = ?rollup.unestimated_children,
            "subtasks without estimate"
        );
    }
    rollup.summed_time = summed;

    if options.write_back {
        // Never overwrite a nonzero estimate with a zero sum.
        rollup.write_back = Some(EstimateWrite {
            key: story.key.clone(),
            field_id: story_field.to_string(),
            value: existing.unwrap_or(0.0).max(summed),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, ESTIMATE, SUBTASK_ESTIMATE};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tally_tracker::memory::{FieldWrite, MemoryTracker};

    const FORCE: RollupOptions = RollupOptions {
        force_recalculate: true,
        write_back: false,
    };
    const FORCE_WRITE: RollupOptions = RollupOptions {
        force_recalculate: true,
        write_back: true,
    };

    fn with_subtasks(tracker: MemoryTracker, values: &[(&str, Option<f64>)]) -> MemoryTracker {
        values.iter().fold(tracker, |tracker, (key, value)| {
            let builder = fixtures::subtask(key);
            let builder = match value {
                Some(v) => builder.number(SUBTASK_ESTIMATE, *v),
                None => builder.field(SUBTASK_ESTIMATE, Value::Null),
            };
            tracker.with_issue(builder.build())
        })
    }

    #[test]
    fn task_uses_own_estimate_or_zero() {
        let tracker = MemoryTracker::new();
        let mapping = fixtures::mapping();
        let estimated = fixtures::task("PRJ-1").number(ESTIMATE, 3.0).build();
        let bare = fixtures::task("PRJ-2").build();

        for _ in 0..2 {
            let rollup = rollup_issue(&tracker, &estimated, &mapping, RollupOptions::default()).unwrap();
            assert_eq!(rollup.summed_time, 3.0);
        }
        let rollup = rollup_issue(&tracker, &bare, &mapping, FORCE).unwrap();
        assert_eq!(rollup.summed_time, 0.0);
        assert_eq!(tracker.fetch_calls(), 0);
    }

    #[test]
    fn bug_and_subtask_are_leaves() {
        let tracker = MemoryTracker::new();
        let mapping = fixtures::mapping();
        let bug = fixtures::bug("PRJ-3").number(ESTIMATE, 2.0).build();
        let subtask = fixtures::subtask("PRJ-4").number(SUBTASK_ESTIMATE, 1.5).build();
        assert_eq!(rollup_issue(&tracker, &bug, &mapping, FORCE).unwrap().summed_time, 2.0);
        assert_eq!(rollup_issue(&tracker, &subtask, &mapping, FORCE).unwrap().summed_time, 1.5);
    }

    #[test]
    fn nested_epic_counts_zero() {
        let tracker = MemoryTracker::new();
        let epic = fixtures::epic("PRJ-5").number(ESTIMATE, 40.0).build();
        let rollup = rollup_issue(&tracker, &epic, &fixtures::mapping(), FORCE).unwrap();
        assert_eq!(rollup.summed_time, 0.0);
        assert_eq!(rollup.kind, Some(IssueKind::Epic));
    }

    #[test]
    fn story_keeps_existing_estimate_without_force() {
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(2.0))]);
        let story = fixtures::story("PRJ-10")
            .number(ESTIMATE, 8.0)
            .subtask("PRJ-11")
            .build();
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), RollupOptions::default()).unwrap();
        assert_eq!(rollup.summed_time, 8.0);
        assert_eq!(rollup.children, vec!["PRJ-11".to_string()]);
        assert_eq!(tracker.fetch_calls(), 0);
    }

    #[test]
    fn story_without_estimate_sums_subtasks() {
        let tracker = with_subtasks(
            MemoryTracker::new(),
            &[("PRJ-11", Some(2.0)), ("PRJ-12", None), ("PRJ-13", Some(1.5))],
        );
        let story = fixtures::story("PRJ-10")
            .subtask("PRJ-11")
            .subtask("PRJ-12")
            .subtask("PRJ-13")
            .build();
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), RollupOptions::default()).unwrap();
        assert_eq!(rollup.summed_time, 3.5);
        assert_eq!(rollup.unestimated_children, vec!["PRJ-12".to_string()]);
        assert_eq!(tracker.fetch_calls(), 1);
        assert!(tracker.writes().is_empty());
    }

    #[test]
    fn forced_story_ignores_existing_estimate() {
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(2.0)), ("PRJ-12", Some(3.0))]);
        let story = fixtures::story("PRJ-10")
            .number(ESTIMATE, 13.0)
            .subtask("PRJ-11")
            .subtask("PRJ-12")
            .build();
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE).unwrap();
        assert_eq!(rollup.summed_time, 5.0);
    }

    #[test]
    fn story_without_subtasks_keeps_its_value_even_when_forced() {
        let tracker = MemoryTracker::new();
        let story = fixtures::story("PRJ-10").number(ESTIMATE, 5.0).build();
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE_WRITE).unwrap();
        assert_eq!(rollup.summed_time, 5.0);
        assert!(tracker.writes().is_empty());
    }

    fn planned_write(rollup: &StoryRollup) -> Option<f64> {
        rollup.write_back.as_ref().map(|w| w.value)
    }

    #[test]
    fn write_back_never_flattens_a_nonzero_estimate() {
        let story = fixtures::story("PRJ-10")
            .number(ESTIMATE, 8.0)
            .subtask("PRJ-11")
            .build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", None)]).with_issue(story.clone());

        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE_WRITE).unwrap();

        assert_eq!(rollup.summed_time, 0.0);
        assert_eq!(
            rollup.write_back,
            Some(EstimateWrite {
                key: "PRJ-10".into(),
                field_id: ESTIMATE.into(),
                value: 8.0,
            })
        );
        assert!(tracker.writes().is_empty());
    }

    #[test]
    fn write_back_takes_the_larger_value() {
        let story = fixtures::story("PRJ-10")
            .number(ESTIMATE, 3.0)
            .subtask("PRJ-11")
            .build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(5.0))]).with_issue(story.clone());
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE_WRITE).unwrap();
        assert_eq!(planned_write(&rollup), Some(5.0));
    }

    #[test]
    fn write_back_defaults_to_zero() {
        let story = fixtures::story("PRJ-10").subtask("PRJ-11").build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", None)]).with_issue(story.clone());
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE_WRITE).unwrap();
        assert_eq!(planned_write(&rollup), Some(0.0));
    }

    #[test]
    fn no_write_planned_without_write_back() {
        let story = fixtures::story("PRJ-10").subtask("PRJ-11").build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(2.0))]);
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE).unwrap();
        assert_eq!(planned_write(&rollup), None);
    }

    #[test]
    fn applied_writes_reach_the_tracker() {
        let story = fixtures::story("PRJ-10").subtask("PRJ-11").build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(2.0))]).with_issue(story.clone());
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE_WRITE).unwrap();

        apply_write_backs(&tracker, &[rollup]);

        assert_eq!(
            tracker.writes(),
            vec![FieldWrite {
                key: "PRJ-10".into(),
                field_id: ESTIMATE.into(),
                value: Some(2.0),
            }]
        );
    }

    #[test]
    fn failed_write_back_keeps_the_rollup() {
        let story = fixtures::story("PRJ-10").subtask("PRJ-11").build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(2.0))]).failing_on("PRJ-10");
        let rollup = rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE_WRITE).unwrap();
        apply_write_backs(&tracker, std::slice::from_ref(&rollup));
        assert_eq!(rollup.summed_time, 2.0);
        assert!(tracker.writes().is_empty());
    }

    #[test]
    fn subtask_read_failure_is_returned() {
        let story = fixtures::story("PRJ-10").subtask("PRJ-11").build();
        let tracker = with_subtasks(MemoryTracker::new(), &[("PRJ-11", Some(2.0))]).failing_on("PRJ-11");
        assert!(rollup_issue(&tracker, &story, &fixtures::mapping(), FORCE).is_err());
    }
}
