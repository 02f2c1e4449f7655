//! Result aggregation and reporting.
//!
//! Collects check results and defects into a [`RunReport`], computes totals,
//! and finalizes the report exactly once.

use crate::engine::classifier::{Defect, DefectEvent, DefectKey};
use crate::{timefmt, CheckName, CheckResult, NetVerifyError, Result, Severity, Timestamp};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Run-level counts. Written only by [`finalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub execution_errors: u32,
    pub by_severity: BTreeMap<Severity, u32>,
    /// Percentage of evaluated (non-skipped) checks that passed
    pub pass_rate: f64,
}

/// Output of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(serialize_with = "timefmt::serialize")]
    started_at: Timestamp,
    #[serde(serialize_with = "timefmt::serialize_option")]
    finished_at: Option<Timestamp>,
    results: Vec<CheckResult>,
    defects: BTreeMap<DefectKey, Defect>,
    defect_events: Vec<DefectEvent>,
    totals: Totals,
    #[serde(skip)]
    finalized: bool,
}

impl RunReport {
    /// Open a new report stamped with the current time.
    pub fn begin() -> Self {
        RunReport {
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
            defects: BTreeMap::new(),
            defect_events: Vec::new(),
            totals: Totals::default(),
            finalized: false,
        }
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn defects(&self) -> &BTreeMap<DefectKey, Defect> {
        &self.defects
    }

    pub fn defect_events(&self) -> &[DefectEvent] {
        &self.defect_events
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn defect(&self, device_id: &str, check_name: CheckName) -> Option<&Defect> {
        self.defects.get(&DefectKey::new(device_id, check_name))
    }

    /// Results for one device, in recorded order.
    pub fn results_for<'a>(&'a self, device_id: &'a str) -> impl Iterator<Item = &'a CheckResult> + 'a {
        self.results.iter().filter(move |r| r.device_id() == device_id)
    }

    /// Device ids in first-seen order.
    pub fn device_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.results
            .iter()
            .map(|r| r.device_id())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.passed())
    }

    pub fn failures(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| !r.passed()).collect()
    }

    /// Wall-clock duration, once finalized.
    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            Err(NetVerifyError::AlreadyFinalized)
        } else {
            Ok(())
        }
    }
}

/// Compute totals, stamp `finished_at`, and freeze the report.
///
/// A pure reduction over `results` and `defects`. Fails with
/// `AlreadyFinalized` on a report that has already been finalized.
pub fn finalize(report: &mut RunReport) -> Result<()> {
    report.ensure_open()?;

    let mut totals = Totals::default();
    for result in &report.results {
        totals.total += 1;
        if result.is_skipped() {
            totals.skipped += 1;
        } else if result.passed() {
            totals.passed += 1;
        } else {
            totals.failed += 1;
            if result.is_execution_failure() {
                totals.execution_errors += 1;
            }
        }
    }

    for defect in report.defects.values() {
        *totals.by_severity.entry(defect.severity).or_insert(0) += 1;
    }

    let evaluated = totals.passed + totals.failed;
    totals.pass_rate = if evaluated > 0 {
        totals.passed as f64 / evaluated as f64 * 100.0
    } else {
        0.0
    };

    report.totals = totals;
    report.finished_at = Some(Utc::now());
    report.finalized = true;
    Ok(())
}

/// Sole writer of a [`RunReport`] while a run is in progress.
pub struct ReportAggregator {
    report: RunReport,
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportAggregator {
    /// Create a new aggregator with a freshly opened report
    pub fn new() -> Self {
        ReportAggregator {
            report: RunReport::begin(),
        }
    }

    /// Resume aggregation over an existing report
    pub fn from_report(report: RunReport) -> Self {
        ReportAggregator { report }
    }

    /// Add a completed check result
    pub fn add_result(&mut self, result: CheckResult) -> Result<()> {
        self.report.ensure_open()?;
        self.report.results.push(result);
        Ok(())
    }

    /// Merge classified defects and their event log
    pub fn add_defects(
        &mut self,
        defects: BTreeMap<DefectKey, Defect>,
        events: Vec<DefectEvent>,
    ) -> Result<()> {
        self.report.ensure_open()?;
        self.report.defects.extend(defects);
        self.report.defect_events.extend(events);
        Ok(())
    }

    /// Check if there are any failures
    pub fn has_failures(&self) -> bool {
        self.report.has_failures()
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Finalize and hand out the report. A second call fails.
    pub fn finalize(&mut self) -> Result<RunReport> {
        finalize(&mut self.report)?;
        Ok(self.report.clone())
    }
}
