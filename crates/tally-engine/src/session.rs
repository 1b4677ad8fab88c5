//! A single rollup run: tracker, resolved mappings, options and skip ledger.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use tally_config::TallyConfig;
use tally_config::config::FieldsConfig;
use tally_core::aggregate::{EpicAggregate, InitiativeAggregate, ReleaseAggregate, StoryRollup};
use tally_core::calendar::YearMonth;
use tally_core::confidence::ConfidenceWeights;
use tally_core::issue::TrackerIssue;
use tally_core::kind::IssueKind;
use tally_core::mapping::FieldMapping;
use tally_core::skip::{Skip, SkipReason};
use tally_tracker::{IssueTracker, jql};

use crate::error::Result;
use crate::resolver::FieldMappingResolver;
use crate::rollup::{RollupOptions, apply_write_backs, rollup_issue};

/// Issue-type name identifying an Initiative's linked Epics.
const EPIC_TYPE_NAME: &str = "Epic";

/// Drives one batch run against a tracker.
///
/// Units that cannot be processed are recorded with [`skip`](Self::skip) and
/// left out of the results; only mapping resolution failures abort the run.
pub struct RollupSession<'a> {
    tracker: &'a dyn IssueTracker,
    resolver: FieldMappingResolver,
    options: RollupOptions,
    fields: FieldsConfig,
    weights: ConfidenceWeights,
    max_results: usize,
    skipped: Vec<Skip>,
}

impl<'a> RollupSession<'a> {
    pub fn new(
        tracker: &'a dyn IssueTracker,
        resolver: FieldMappingResolver,
        config: &TallyConfig,
        options: RollupOptions,
    ) -> Self {
        Self {
            tracker,
            resolver,
            options,
            fields: config.fields.clone(),
            weights: config.confidence,
            max_results: config.tracker.max_results,
            skipped: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &FieldMappingResolver {
        &self.resolver
    }

    pub fn fields(&self) -> &FieldsConfig {
        &self.fields
    }

    /// Units skipped so far, in the order they were recorded.
    pub fn skipped(&self) -> &[Skip] {
        &self.skipped
    }

    /// Records a skipped unit.
    pub fn skip(&mut self, skip: Skip) {
        warn!(key = %skip.key, reason = %skip.reason, detail = %skip.detail, "skipped");
        self.skipped.push(skip);
    }

    // -----------------------------------------------------------------------
    // Epics
    // -----------------------------------------------------------------------

    /// Rolls up each Epic in `keys`. Unreachable Epics are skipped.
    pub fn epics(&mut self, keys: &[String]) -> Result<Vec<EpicAggregate>> {
        let fields = self.fields.clone();
        let wanted = [fields.start_date.as_str(), fields.due_date.as_str()];
        let mut aggregates = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(epic) = self.fetch_unit(key, &wanted)? {
                aggregates.push(self.collect_epic(epic)?);
            }
        }
        Ok(aggregates)
    }

    /// Populates an Epic from its child issues.
    ///
    /// A failed child search or Subtask read leaves the Epic empty, records a
    /// [`SkipReason::ChildFetch`] and writes nothing back.
    pub fn collect_epic(&mut self, epic: TrackerIssue) -> Result<EpicAggregate> {
        let mapping = self.resolver.resolve(self.tracker, &epic.project)?.clone();
        let mut aggregate = EpicAggregate::new(epic);

        match self.roll_up_children(&aggregate.epic, &mapping) {
            Ok(children) => aggregate.add_rolled_up(children),
            Err(detail) => {
                self.skip(Skip::new(aggregate.key(), SkipReason::ChildFetch, detail));
                return Ok(aggregate);
            }
        }

        info!(
            epic = %aggregate.key(),
            issues = aggregate.issues.len(),
            time = aggregate.totals.summed_time,
            remaining = aggregate.totals.remaining_time,
            "epic rolled up"
        );
        if self.options.write_back {
            apply_write_backs(self.tracker, &aggregate.issues);
            self.write_back_epic(&aggregate, &mapping);
        }
        Ok(aggregate)
    }

    fn roll_up_children(
        &self,
        epic: &TrackerIssue,
        mapping: &FieldMapping,
    ) -> std::result::Result<Vec<StoryRollup>, String> {
        let fields = mapping.child_estimate_fields();
        let children = self
            .tracker
            .search_issues(&jql::children_of(&epic.key), &fields, self.max_results)
            .map_err(|err| format!("child search failed: {err}"))?;
        children
            .iter()
            .map(|child| {
                rollup_issue(self.tracker, child, mapping, self.options)
                    .map_err(|err| format!("subtasks of {} unreadable: {err}", child.key))
            })
            .collect()
    }

    /// Stores the rolled-up sum on the Epic, keeping a nonzero existing value
    /// when the sum is zero.
    fn write_back_epic(&self, aggregate: &EpicAggregate, mapping: &FieldMapping) {
        let Some(field) = mapping.estimate_field(IssueKind::Epic) else {
            return;
        };
        let key = aggregate.key();
        let summed = aggregate.totals.summed_time;
        let value = if summed != 0.0 {
            summed
        } else {
            match self.tracker.get_issue(key, &[field]) {
                Ok(fresh) => fresh.number_field(field).unwrap_or(0.0),
                Err(err) => {
                    warn!(key, error = %err, "could not read epic estimate, skipping write-back");
                    return;
                }
            }
        };
        if let Err(err) = self.tracker.update_issue_field(key, field, Some(value)) {
            warn!(key, error = %err, "epic estimate write-back failed");
        }
    }

    // -----------------------------------------------------------------------
    // Initiatives
    // -----------------------------------------------------------------------

    /// Rolls up each Initiative in `keys`.
    ///
    /// With `due_month` set, only Epics due in that month are collected.
    pub fn initiatives(
        &mut self,
        keys: &[String],
        due_month: Option<YearMonth>,
    ) -> Result<Vec<InitiativeAggregate>> {
        let mut aggregates = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(initiative) = self.initiative(key, due_month)? {
                aggregates.push(initiative);
            }
        }
        Ok(aggregates)
    }

    fn initiative(
        &mut self,
        key: &str,
        due_month: Option<YearMonth>,
    ) -> Result<Option<InitiativeAggregate>> {
        let fields = self.fields.clone();
        let wanted = [
            fields.start_date.as_str(),
            fields.due_date.as_str(),
            fields.initiative_estimate.as_str(),
        ];
        let Some(initiative) = self.fetch_unit(key, &wanted)? else {
            return Ok(None);
        };

        if initiative.is_initial_estimation() {
            let estimate = initiative
                .number_field(&fields.initiative_estimate)
                .unwrap_or(0.0);
            info!(initiative = key, estimate, "initiative in initial estimation");
            return Ok(Some(InitiativeAggregate::initial_estimate(
                initiative,
                estimate,
                &self.weights,
            )));
        }

        let mut epics = Vec::new();
        for epic_key in linked_epics(&initiative) {
            let Some(epic) = self.fetch_unit(&epic_key, &wanted[..2])? else {
                continue;
            };
            if let Some(month) = due_month {
                let due_in_month = epic
                    .date_field(&fields.due_date)
                    .is_some_and(|due| month.contains(due));
                if !due_in_month {
                    debug!(epic = %epic.key, %month, "not due in selected month");
                    continue;
                }
            }
            epics.push(self.collect_epic(epic)?);
        }

        let aggregate = InitiativeAggregate::from_epics(initiative, epics, &self.weights);
        info!(
            initiative = key,
            epics = aggregate.epics.len(),
            time = aggregate.totals.summed_time,
            confidence = aggregate.estimation_confidence,
            "initiative rolled up"
        );
        Ok(Some(aggregate))
    }

    // -----------------------------------------------------------------------
    // Releases
    // -----------------------------------------------------------------------

    /// Rolls up the issues of each fix version in `names`.
    pub fn releases(&mut self, names: &[String]) -> Result<Vec<ReleaseAggregate>> {
        let mut aggregates = Vec::with_capacity(names.len());
        for name in names {
            if let Some(release) = self.release(name)? {
                aggregates.push(release);
            }
        }
        Ok(aggregates)
    }

    fn release(&mut self, name: &str) -> Result<Option<ReleaseAggregate>> {
        let found = match self
            .tracker
            .search_issues(&jql::fix_version(name), &[], self.max_results)
        {
            Ok(found) => found,
            Err(err) => {
                self.skip(Skip::new(name, SkipReason::Access, err.to_string()));
                return Ok(None);
            }
        };

        let projects: BTreeSet<&str> = found.iter().map(|i| i.project.key.as_str()).collect();
        if projects.len() > 1 {
            let listed = projects.into_iter().collect::<Vec<_>>().join(", ");
            self.skip(Skip::new(
                name,
                SkipReason::Access,
                format!("multiple projects: {listed}"),
            ));
            return Ok(None);
        }
        let Some(first) = found.first() else {
            self.skip(Skip::new(name, SkipReason::Access, "no issues in release"));
            return Ok(None);
        };
        let project = first.project.clone();

        let mapping = self.resolver.resolve(self.tracker, &project)?.clone();
        let keys: Vec<String> = found.iter().map(|i| i.key.clone()).collect();
        let rolled = self
            .tracker
            .fetch_issues(&keys, &mapping.child_estimate_fields())
            .map_err(|err| err.to_string())
            .and_then(|issues| {
                issues
                    .iter()
                    .map(|issue| {
                        rollup_issue(self.tracker, issue, &mapping, self.options)
                            .map_err(|err| err.to_string())
                    })
                    .collect::<std::result::Result<Vec<_>, String>>()
            });

        let mut aggregate = ReleaseAggregate::new(name, project.key);
        match rolled {
            Ok(issues) => aggregate.add_rolled_up(issues),
            Err(detail) => {
                self.skip(Skip::new(name, SkipReason::ChildFetch, detail));
                return Ok(None);
            }
        }
        if self.options.write_back {
            apply_write_backs(self.tracker, &aggregate.issues);
        }
        info!(
            release = name,
            issues = aggregate.issues.len(),
            time = aggregate.totals.summed_time,
            "release rolled up"
        );
        Ok(Some(aggregate))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Fetches an Epic, Initiative or similar unit; a failure becomes an
    /// [`SkipReason::Access`] record.
    fn fetch_unit(&mut self, key: &str, fields: &[&str]) -> Result<Option<TrackerIssue>> {
        match self.tracker.get_issue(key, fields) {
            Ok(issue) => Ok(Some(issue)),
            Err(err) => {
                self.skip(Skip::new(key, SkipReason::Access, err.to_string()));
                Ok(None)
            }
        }
    }
}

/// Keys of the Initiative's linked Epics, first occurrence kept.
fn linked_epics(initiative: &TrackerIssue) -> Vec<String> {
    let mut seen = BTreeSet::new();
    initiative
        .links
        .iter()
        .filter(|link| link.type_name == EPIC_TYPE_NAME)
        .filter(|link| seen.insert(link.key.clone()))
        .map(|link| link.key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use crate::fixtures::{self, DUE, ESTIMATE, SUBTASK_ESTIMATE, date};
    use pretty_assertions::assert_eq;
    use tally_core::aggregate::InitiativeSource;
    use tally_core::issue::{DONE_STATUS, INITIAL_ESTIMATION_STATUS};
    use tally_tracker::memory::{FieldWrite, MemoryTracker};

    fn config() -> TallyConfig {
        TallyConfig::default()
    }

    /// Epic PRJ-1: a Done story (5), an open task (3), an open unestimated
    /// story with one unestimated subtask, and an open bug (2).
    fn epic_tracker() -> MemoryTracker {
        MemoryTracker::new()
            .with_metadata(fixtures::metadata())
            .with_issue(fixtures::epic("PRJ-1").date(DUE, date(2021, 2, 10)).build())
            .with_issue(
                fixtures::story("PRJ-2")
                    .status(DONE_STATUS)
                    .number(ESTIMATE, 5.0)
                    .build(),
            )
            .with_issue(fixtures::task("PRJ-3").number(ESTIMATE, 3.0).build())
            .with_issue(fixtures::story("PRJ-4").subtask("PRJ-5").build())
            .with_issue(fixtures::subtask("PRJ-5").build())
            .with_issue(fixtures::bug("PRJ-6").number(ESTIMATE, 2.0).build())
            .with_search("parent = PRJ-1", &["PRJ-2", "PRJ-3", "PRJ-4", "PRJ-6"])
    }

    fn session<'a>(tracker: &'a MemoryTracker, options: RollupOptions) -> RollupSession<'a> {
        RollupSession::new(tracker, FieldMappingResolver::new(), &config(), options)
    }

    #[test]
    fn epic_totals_count_only_outstanding_work() {
        let tracker = epic_tracker();
        let mut session = session(&tracker, RollupOptions::default());

        let epics = session.epics(&["PRJ-1".to_string()]).unwrap();

        let totals = epics[0].totals;
        assert_eq!(totals.summed_time, 10.0);
        assert_eq!(totals.remaining_time, 5.0);
        assert_eq!(totals.incomplete_estimated_count, 2);
        assert_eq!(totals.incomplete_unestimated_count, 1);
        assert_eq!(epics[0].issues.len(), 4);
        assert!(session.skipped().is_empty());
    }

    #[test]
    fn unreachable_epic_is_skipped_and_run_continues() {
        let tracker = epic_tracker();
        let mut session = session(&tracker, RollupOptions::default());

        let epics = session
            .epics(&["PRJ-404".to_string(), "PRJ-1".to_string()])
            .unwrap();

        assert_eq!(epics.len(), 1);
        assert_eq!(session.skipped().len(), 1);
        assert_eq!(session.skipped()[0].key, "PRJ-404");
        assert_eq!(session.skipped()[0].reason, SkipReason::Access);
    }

    #[test]
    fn failed_child_search_leaves_epic_empty() {
        let tracker = epic_tracker().failing_on("parent = PRJ-1");
        let mut session = session(&tracker, RollupOptions::default());

        let epics = session.epics(&["PRJ-1".to_string()]).unwrap();

        assert_eq!(epics.len(), 1);
        assert!(epics[0].issues.is_empty());
        assert_eq!(epics[0].totals.summed_time, 0.0);
        assert_eq!(session.skipped()[0].reason, SkipReason::ChildFetch);
    }

    #[test]
    fn skipped_epic_writes_nothing_back() {
        let tracker = MemoryTracker::new()
            .with_metadata(fixtures::metadata())
            .with_issue(fixtures::epic("PRJ-1").build())
            .with_issue(fixtures::story("PRJ-2").subtask("PRJ-3").build())
            .with_issue(fixtures::subtask("PRJ-3").number(SUBTASK_ESTIMATE, 4.0).build())
            .with_issue(fixtures::story("PRJ-4").subtask("PRJ-5").build())
            .with_issue(fixtures::subtask("PRJ-5").build())
            .with_search("parent = PRJ-1", &["PRJ-2", "PRJ-4"])
            .failing_on("PRJ-5");
        let options = RollupOptions {
            force_recalculate: false,
            write_back: true,
        };
        let mut session = session(&tracker, options);

        let epics = session.epics(&["PRJ-1".to_string()]).unwrap();

        assert!(epics[0].issues.is_empty());
        assert_eq!(session.skipped()[0].reason, SkipReason::ChildFetch);
        assert!(tracker.writes().is_empty());
    }

    #[test]
    fn incomplete_mapping_aborts_the_run() {
        let mut metadata = fixtures::metadata();
        metadata.issue_types.retain(|t| t.name != "Task");
        let tracker = MemoryTracker::new()
            .with_metadata(metadata)
            .with_issue(fixtures::epic("PRJ-1").build());
        let mut session = session(&tracker, RollupOptions::default());

        let err = session.epics(&["PRJ-1".to_string()]).unwrap_err();
        assert!(matches!(err, EngineError::MappingIncomplete { .. }));
    }

    #[test]
    fn write_back_updates_stories_and_epic() {
        let tracker = epic_tracker();
        let options = RollupOptions {
            force_recalculate: false,
            write_back: true,
        };
        let mut session = session(&tracker, options);
        session.epics(&["PRJ-1".to_string()]).unwrap();

        assert_eq!(
            tracker.writes(),
            vec![
                FieldWrite {
                    key: "PRJ-4".into(),
                    field_id: ESTIMATE.into(),
                    value: Some(0.0),
                },
                FieldWrite {
                    key: "PRJ-1".into(),
                    field_id: ESTIMATE.into(),
                    value: Some(10.0),
                },
            ]
        );
    }

    #[test]
    fn epic_write_back_keeps_existing_value_over_zero_sum() {
        let tracker = MemoryTracker::new()
            .with_metadata(fixtures::metadata())
            .with_issue(fixtures::epic("PRJ-1").number(ESTIMATE, 21.0).build())
            .with_search("parent = PRJ-1", &[]);
        let options = RollupOptions {
            force_recalculate: false,
            write_back: true,
        };
        let mut session = session(&tracker, options);
        session.epics(&["PRJ-1".to_string()]).unwrap();

        assert_eq!(tracker.writes()[0].value, Some(21.0));
    }

    fn initiative_tracker() -> MemoryTracker {
        epic_tracker()
            .with_issue(
                fixtures::initiative("INIT-1")
                    .link("PRJ-1", "Epic")
                    .link("PRJ-7", "Epic")
                    .link("PRJ-1", "Epic")
                    .link("OPS-3", "Story")
                    .link("PRJ-404", "Epic")
                    .build(),
            )
            .with_issue(fixtures::epic("PRJ-7").date(DUE, date(2021, 3, 5)).build())
            .with_issue(fixtures::task("PRJ-8").number(ESTIMATE, 4.0).build())
            .with_search("parent = PRJ-7", &["PRJ-8"])
    }

    #[test]
    fn initiative_collects_linked_epics() {
        let tracker = initiative_tracker();
        let mut session = session(&tracker, RollupOptions::default());

        let initiatives = session.initiatives(&["INIT-1".to_string()], None).unwrap();

        let initiative = &initiatives[0];
        assert_eq!(initiative.source, InitiativeSource::Epics);
        let keys: Vec<&str> = initiative.epics.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["PRJ-1", "PRJ-7"]);
        assert_eq!(initiative.totals.summed_time, 14.0);
        assert_eq!(initiative.totals.remaining_time, 9.0);
        assert_eq!(initiative.totals.incomplete_estimated_count, 3);
        assert_eq!(initiative.totals.incomplete_unestimated_count, 1);
        // 75% estimated, average ticket 3 clamps to the floor weight.
        assert_eq!(initiative.estimation_confidence, 75.0);
        assert_eq!(session.skipped().len(), 1);
        assert_eq!(session.skipped()[0].key, "PRJ-404");
    }

    #[test]
    fn due_month_filter_keeps_matching_epics_only() {
        let tracker = initiative_tracker();
        let mut session = session(&tracker, RollupOptions::default());
        let month = YearMonth::parse("2021-03");

        let initiatives = session.initiatives(&["INIT-1".to_string()], month).unwrap();

        let keys: Vec<&str> = initiatives[0].epics.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["PRJ-7"]);
    }

    #[test]
    fn initial_estimation_uses_own_estimate() {
        let tracker = MemoryTracker::new().with_issue(
            fixtures::initiative("INIT-2")
                .status(INITIAL_ESTIMATION_STATUS)
                .number("customfield_10016", 40.0)
                .link("PRJ-1", "Epic")
                .build(),
        );
        let mut session = session(&tracker, RollupOptions::default());

        let initiatives = session.initiatives(&["INIT-2".to_string()], None).unwrap();

        let initiative = &initiatives[0];
        assert_eq!(initiative.source, InitiativeSource::InitialEstimate);
        assert!(initiative.epics.is_empty());
        assert_eq!(initiative.totals.summed_time, 40.0);
        assert_eq!(initiative.totals.remaining_time, 40.0);
        assert_eq!(initiative.totals.incomplete_estimated_count, 1);
        assert_eq!(initiative.totals.incomplete_unestimated_count, 1);
        assert_eq!(tracker.metadata_calls(), 0);
    }

    #[test]
    fn release_rolls_up_issues_of_one_project() {
        let tracker = MemoryTracker::new()
            .with_metadata(fixtures::metadata())
            .with_issue(fixtures::story("PRJ-20").number(ESTIMATE, 8.0).build())
            .with_issue(
                fixtures::task("PRJ-21")
                    .status(DONE_STATUS)
                    .number(ESTIMATE, 2.0)
                    .build(),
            )
            .with_issue(fixtures::subtask("PRJ-22").number(SUBTASK_ESTIMATE, 1.0).build())
            .with_search("fixVersion = \"1.0\"", &["PRJ-20", "PRJ-21", "PRJ-22"]);
        let mut session = session(&tracker, RollupOptions::default());

        let releases = session.releases(&["1.0".to_string()]).unwrap();

        let release = &releases[0];
        assert_eq!(release.project_key, "PRJ");
        assert_eq!(release.totals.summed_time, 11.0);
        assert_eq!(release.totals.remaining_time, 9.0);
        assert_eq!(release.totals.incomplete_count(), 2);
        assert_eq!(tracker.fetch_calls(), 1);
    }

    #[test]
    fn release_spanning_projects_is_skipped() {
        let tracker = MemoryTracker::new()
            .with_issue(fixtures::task("PRJ-20").build())
            .with_issue(fixtures::task("OPS-1").build())
            .with_search("fixVersion = \"2.0\"", &["PRJ-20", "OPS-1"]);
        let mut session = session(&tracker, RollupOptions::default());

        let releases = session.releases(&["2.0".to_string()]).unwrap();

        assert!(releases.is_empty());
        assert_eq!(session.skipped()[0].reason, SkipReason::Access);
        assert_eq!(session.skipped()[0].detail, "multiple projects: OPS, PRJ");
    }

    #[test]
    fn empty_release_is_skipped() {
        let tracker = MemoryTracker::new();
        let mut session = session(&tracker, RollupOptions::default());
        assert!(session.releases(&["3.0".to_string()]).unwrap().is_empty());
        assert_eq!(session.skipped()[0].key, "3.0");
    }
}
