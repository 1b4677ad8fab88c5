//! JSON estimate records and the files they are written to.
//!
//! Every time value is rounded to two decimals on the way out; the
//! aggregates themselves keep full precision.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use tally_core::aggregate::{
    EpicAggregate, InitiativeAggregate, InitiativeSource, ReleaseAggregate, StoryRollup,
    WorkTotals, rounded,
};
use tally_core::calendar::MonthWorkload;
use tally_core::rounding::round2;
use tally_core::skip::Skip;

/// File written when any unit was skipped.
pub const SKIPPED_FILE: &str = "skipped.json";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub time: f64,
}

impl From<&StoryRollup> for IssueRecord {
    fn from(issue: &StoryRollup) -> Self {
        Self {
            key: issue.key.clone(),
            summary: issue.summary.clone(),
            status: issue.status.clone(),
            time: round2(issue.summed_time),
        }
    }
}

/// Totals shared by epic, initiative and release records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRecord {
    pub time: f64,
    pub remaining_time: f64,
    pub incomplete_estimated_count: u32,
    pub incomplete_unestimated_count: u32,
}

impl From<&WorkTotals> for TotalsRecord {
    fn from(totals: &WorkTotals) -> Self {
        let totals = rounded(totals);
        Self {
            time: totals.summed_time,
            remaining_time: totals.remaining_time,
            incomplete_estimated_count: totals.incomplete_estimated_count,
            incomplete_unestimated_count: totals.incomplete_unestimated_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicRecord {
    pub key: String,
    pub summary: String,
    #[serde(flatten)]
    pub totals: TotalsRecord,
    pub subticket_count: usize,
    pub issues: Vec<IssueRecord>,
}

impl From<&EpicAggregate> for EpicRecord {
    fn from(epic: &EpicAggregate) -> Self {
        Self {
            key: epic.key().to_string(),
            summary: epic.epic.summary.clone(),
            totals: TotalsRecord::from(&epic.totals),
            subticket_count: epic.issues.len(),
            issues: epic.issues.iter().map(IssueRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiativeRecord {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub source: InitiativeSource,
    #[serde(flatten)]
    pub totals: TotalsRecord,
    pub estimation_confidence: f64,
    pub epics: Vec<EpicRecord>,
}

impl From<&InitiativeAggregate> for InitiativeRecord {
    fn from(initiative: &InitiativeAggregate) -> Self {
        Self {
            key: initiative.key().to_string(),
            summary: initiative.initiative.summary.clone(),
            status: initiative.initiative.status.clone(),
            source: initiative.source,
            totals: TotalsRecord::from(&initiative.totals),
            estimation_confidence: initiative.estimation_confidence,
            epics: initiative.epics.iter().map(EpicRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseRecord {
    pub name: String,
    pub project: String,
    #[serde(flatten)]
    pub totals: TotalsRecord,
    pub subticket_count: usize,
    pub issues: Vec<IssueRecord>,
}

impl From<&ReleaseAggregate> for ReleaseRecord {
    fn from(release: &ReleaseAggregate) -> Self {
        Self {
            name: release.name.clone(),
            project: release.project_key.clone(),
            totals: TotalsRecord::from(&release.totals),
            subticket_count: release.issues.len(),
            issues: release.issues.iter().map(IssueRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRecord {
    pub key: String,
    pub summary: String,
    pub initiative: String,
    pub time: f64,
    pub remaining_time: f64,
}

/// One month bucket; totals are sums of the listed contributions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRecord {
    pub month: String,
    pub time: f64,
    pub remaining_time: f64,
    pub epics: Vec<ContributionRecord>,
}

impl From<&MonthWorkload> for MonthRecord {
    fn from(workload: &MonthWorkload) -> Self {
        Self {
            month: workload.month.padded(),
            time: workload.summed_total(),
            remaining_time: workload.remaining_total(),
            epics: workload
                .contributions
                .iter()
                .map(|c| ContributionRecord {
                    key: c.epic_key.clone(),
                    summary: c.summary.clone(),
                    initiative: c.initiative_key.clone(),
                    time: c.summed_time,
                    remaining_time: c.remaining_time,
                })
                .collect(),
        }
    }
}

/// Groups epic records by project key.
pub fn epics_by_project(epics: &[EpicAggregate]) -> BTreeMap<String, Vec<EpicRecord>> {
    let mut grouped: BTreeMap<String, Vec<EpicRecord>> = BTreeMap::new();
    for epic in epics {
        grouped
            .entry(epic.epic.project.key.clone())
            .or_default()
            .push(EpicRecord::from(epic));
    }
    grouped
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// `<PROJECT>_estimates.json` per project.
pub fn write_epics(dir: &Path, epics: &[EpicAggregate]) -> Result<Vec<PathBuf>> {
    epics_by_project(epics)
        .iter()
        .map(|(project, records)| write_json(dir, &format!("{project}_estimates.json"), records))
        .collect()
}

/// `<INITIATIVE>_estimates.json` per initiative.
pub fn write_initiatives(dir: &Path, initiatives: &[InitiativeAggregate]) -> Result<Vec<PathBuf>> {
    initiatives
        .iter()
        .map(|i| {
            write_json(
                dir,
                &format!("{}_estimates.json", i.key()),
                &InitiativeRecord::from(i),
            )
        })
        .collect()
}

/// `<RELEASE>_estimates.json` per release.
pub fn write_releases(dir: &Path, releases: &[ReleaseAggregate]) -> Result<Vec<PathBuf>> {
    releases
        .iter()
        .map(|r| {
            write_json(
                dir,
                &format!("{}_estimates.json", file_stem(&r.name)),
                &ReleaseRecord::from(r),
            )
        })
        .collect()
}

/// `<YYYY-MM>_schedule.json` per month bucket.
pub fn write_schedule(dir: &Path, months: &[MonthWorkload]) -> Result<Vec<PathBuf>> {
    months
        .iter()
        .map(|m| {
            write_json(
                dir,
                &format!("{}_schedule.json", m.month.padded()),
                &MonthRecord::from(m),
            )
        })
        .collect()
}

/// `skipped.json`, only when something was skipped.
pub fn write_skipped(dir: &Path, skipped: &[Skip]) -> Result<Option<PathBuf>> {
    if skipped.is_empty() {
        return Ok(None);
    }
    write_json(dir, SKIPPED_FILE, &skipped).map(Some)
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(name);
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Release names may contain path separators.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tally_core::calendar::{EpicContribution, YearMonth};
    use tally_core::issue::{DONE_STATUS, TrackerIssueBuilder};
    use tally_core::skip::SkipReason;
    use tempfile::TempDir;

    fn rollup(key: &str, status: &str, time: f64) -> StoryRollup {
        let issue = TrackerIssueBuilder::new(key)
            .summary(format!("Issue {key}"))
            .status(status)
            .build();
        let mut rollup = StoryRollup::pending(&issue, None);
        rollup.summed_time = time;
        rollup
    }

    fn epic(key: &str) -> EpicAggregate {
        let mut epic = EpicAggregate::new(TrackerIssueBuilder::new(key).summary("Checkout").build());
        epic.add_rolled_up([
            rollup("PRJ-2", DONE_STATUS, 5.0),
            rollup("PRJ-3", "In Progress", 1.0 / 3.0),
            rollup("PRJ-4", "To Do", 0.0),
        ]);
        epic
    }

    #[test]
    fn epic_record_shape() {
        let value = serde_json::to_value(EpicRecord::from(&epic("PRJ-1"))).unwrap();
        assert_eq!(
            value,
            json!({
                "key": "PRJ-1",
                "summary": "Checkout",
                "time": 5.33,
                "remaining_time": 0.33,
                "incomplete_estimated_count": 1,
                "incomplete_unestimated_count": 1,
                "subticket_count": 3,
                "issues": [
                    {"key": "PRJ-2", "summary": "Issue PRJ-2", "status": "Done", "time": 5.0},
                    {"key": "PRJ-3", "summary": "Issue PRJ-3", "status": "In Progress", "time": 0.33},
                    {"key": "PRJ-4", "summary": "Issue PRJ-4", "status": "To Do", "time": 0.0},
                ]
            })
        );
    }

    #[test]
    fn epics_are_written_per_project() {
        let tmp = TempDir::new().unwrap();
        let written = write_epics(tmp.path(), &[epic("PRJ-1"), epic("OPS-1"), epic("PRJ-9")]).unwrap();
        assert_eq!(
            written,
            vec![
                tmp.path().join("OPS_estimates.json"),
                tmp.path().join("PRJ_estimates.json"),
            ]
        );
        let text = fs::read_to_string(tmp.path().join("PRJ_estimates.json")).unwrap();
        let records: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 2);
    }

    #[test]
    fn schedule_files_use_padded_months() {
        let tmp = TempDir::new().unwrap();
        let month = MonthWorkload {
            month: YearMonth { year: 2021, month: 1 },
            contributions: vec![
                EpicContribution {
                    epic_key: "PRJ-1".into(),
                    summary: "Checkout".into(),
                    initiative_key: "INIT-1".into(),
                    summed_time: 18.89,
                    remaining_time: 10.0,
                },
                EpicContribution {
                    epic_key: "PRJ-7".into(),
                    summary: "Search".into(),
                    initiative_key: "INIT-1".into(),
                    summed_time: 1.11,
                    remaining_time: 0.0,
                },
            ],
        };
        let written = write_schedule(tmp.path(), &[month]).unwrap();
        assert_eq!(written, vec![tmp.path().join("2021-01_schedule.json")]);

        let record: Value = serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(record["month"], "2021-01");
        assert_eq!(record["time"], 20.0);
        assert_eq!(record["epics"][1]["key"], "PRJ-7");
    }

    #[test]
    fn skipped_file_only_when_needed() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(write_skipped(tmp.path(), &[]).unwrap(), None);
        let skip = Skip::new("PRJ-404", SkipReason::Access, "not found: PRJ-404");
        let path = write_skipped(tmp.path(), &[skip]).unwrap().unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value[0]["reason"], "access");
    }

    #[test]
    fn release_names_are_safe_file_names() {
        assert_eq!(file_stem("web/2.0"), "web_2.0");
        let tmp = TempDir::new().unwrap();
        let mut release = ReleaseAggregate::new("web/2.0", "PRJ");
        release.add_rolled_up([rollup("PRJ-5", "To Do", 2.0)]);
        let written = write_releases(tmp.path(), &[release]).unwrap();
        assert_eq!(written, vec![tmp.path().join("web_2.0_estimates.json")]);
    }
}
