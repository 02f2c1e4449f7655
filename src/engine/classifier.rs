//! Defect classification.
//!
//! Turns failing check results into severity-classified, deduplicated defects.
//!
//! # Severity Policy
//!
//! - Connectivity failure: Critical
//! - Status failure: Major when CPU or memory exceeds 95% or the temperature is
//!   more than 10°C outside the rated range, otherwise Minor
//! - Interface failure: Major
//! - Alarm failure: the highest severity among the blocking alarms
//! - Execution failure (device could not be evaluated): Critical
//!
//! # Deduplication
//!
//! One open defect exists per (device, check) pair per classifier. A repeated
//! failure only increments `occurrence_count`. Severity and description are
//! fixed at first occurrence and are never re-evaluated, even if a later
//! failure is worse. Reimplementations must keep this sticky behavior.
//!
//! # Concurrency
//!
//! Each key owns its own slot. The slot map lock is held only long enough to
//! find or insert a slot; the create-or-increment decision happens under the
//! slot's own lock, so two concurrent failures for the same key can never
//! create two defects, and different keys never contend.

use crate::{timefmt, CheckName, CheckResult, Severity, Timestamp, EXECUTION_ERROR_KEY};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

/// CPU or memory utilization above which a status failure is Major.
pub const CRITICAL_UTILIZATION_PCT: f64 = 95.0;

/// Degrees beyond the rated range at which a status failure is Major.
pub const TEMPERATURE_MARGIN_C: f64 = 10.0;

/// Default owner recorded on new defects.
pub const DEFAULT_ASSIGNEE: &str = "verification_team";

/// Identity of a defect within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefectKey {
    pub device_id: String,
    pub check_name: CheckName,
}

impl DefectKey {
    pub fn new(device_id: impl Into<String>, check_name: CheckName) -> Self {
        DefectKey {
            device_id: device_id.into(),
            check_name,
        }
    }
}

impl fmt::Display for DefectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.check_name)
    }
}

// Rendered as "device/check" so it can key a JSON object.
impl Serialize for DefectKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefectStatus {
    Open,
}

/// A classified, deduplicated record of a recurring check failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Defect {
    pub defect_id: String,
    pub device_id: String,
    pub check_name: CheckName,
    pub severity: Severity,
    pub description: String,
    #[serde(serialize_with = "timefmt::serialize")]
    pub first_seen: Timestamp,
    pub occurrence_count: u32,
    pub status: DefectStatus,
    pub assigned_to: String,
}

impl Defect {
    pub fn key(&self) -> DefectKey {
        DefectKey::new(self.device_id.clone(), self.check_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectEventKind {
    Created,
    Updated,
}

/// One defect creation or update, in the order the classifier applied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectEvent {
    pub kind: DefectEventKind,
    pub defect_id: String,
    pub device_id: String,
    pub check_name: CheckName,
    pub severity: Severity,
    pub occurrence_count: u32,
    #[serde(serialize_with = "timefmt::serialize")]
    pub at: Timestamp,
}

impl DefectEvent {
    fn from_defect(kind: DefectEventKind, defect: &Defect) -> Self {
        DefectEvent {
            kind,
            defect_id: defect.defect_id.clone(),
            device_id: defect.device_id.clone(),
            check_name: defect.check_name,
            severity: defect.severity,
            occurrence_count: defect.occurrence_count,
            at: Utc::now(),
        }
    }
}

type Slot = Arc<Mutex<Option<Defect>>>;

/// Per-run defect ledger.
///
/// Counters are scoped to the instance, so concurrent runs with separate
/// classifiers never share defect ids.
pub struct DefectClassifier {
    slots: Mutex<HashMap<DefectKey, Slot>>,
    events: Mutex<Vec<DefectEvent>>,
    next_id: AtomicU32,
    assignee: String,
}

impl Default for DefectClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DefectClassifier {
    pub fn new() -> Self {
        Self::with_assignee(DEFAULT_ASSIGNEE)
    }

    pub fn with_assignee(assignee: impl Into<String>) -> Self {
        DefectClassifier {
            slots: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
            assignee: assignee.into(),
        }
    }

    /// Record a failing result and return the defect it maps to.
    ///
    /// Passing and skipped results are not defects; they return `None`.
    pub fn classify(&self, result: &CheckResult) -> Option<Defect> {
        if result.passed() {
            return None;
        }

        let key = DefectKey::new(result.device_id(), result.check_name());
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key).or_default())
        };

        let mut entry = slot.lock();
        let (defect, kind) = match entry.as_mut() {
            Some(existing) => {
                existing.occurrence_count += 1;
                warn!(
                    defect = %existing.defect_id,
                    device = %existing.device_id,
                    check = %existing.check_name,
                    occurrences = existing.occurrence_count,
                    "defect recurred"
                );
                (existing.clone(), DefectEventKind::Updated)
            }
            None => {
                let defect = Defect {
                    defect_id: self.allocate_id(),
                    device_id: result.device_id().to_string(),
                    check_name: result.check_name(),
                    severity: severity_for(result),
                    description: describe(result),
                    first_seen: result.timestamp(),
                    occurrence_count: 1,
                    status: DefectStatus::Open,
                    assigned_to: self.assignee.clone(),
                };
                error!(
                    defect = %defect.defect_id,
                    device = %defect.device_id,
                    check = %defect.check_name,
                    severity = %defect.severity,
                    "defect created: {}",
                    defect.description
                );
                *entry = Some(defect.clone());
                (defect, DefectEventKind::Created)
            }
        };

        // Pushed while the slot is held so per-key events stay ordered.
        self.events
            .lock()
            .push(DefectEvent::from_defect(kind, &defect));
        Some(defect)
    }

    /// Current state of the defect for a key, if any.
    pub fn get(&self, device_id: &str, check_name: CheckName) -> Option<Defect> {
        let slot = self
            .slots
            .lock()
            .get(&DefectKey::new(device_id, check_name))
            .cloned()?;
        let defect = slot.lock().clone();
        defect
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the ledger into the keyed defect map and the event log.
    pub fn into_parts(self) -> (BTreeMap<DefectKey, Defect>, Vec<DefectEvent>) {
        let defects = self
            .slots
            .into_inner()
            .into_iter()
            .filter_map(|(key, slot)| slot.lock().take().map(|defect| (key, defect)))
            .collect();
        (defects, self.events.into_inner())
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("DEF-{:04}", n)
    }
}

fn detail_f64(result: &CheckResult, key: &str) -> Option<f64> {
    result.detail(key).and_then(Value::as_f64)
}

fn detail_strings(result: &CheckResult, key: &str) -> Vec<String> {
    result
        .detail(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn blocking_alarms(result: &CheckResult) -> Vec<(String, Severity)> {
    result
        .detail("blocking_alarms")
        .and_then(Value::as_array)
        .map(|alarms| {
            alarms
                .iter()
                .filter_map(|alarm| {
                    let code = alarm.get("code")?.as_str()?.to_string();
                    let severity = serde_json::from_value(alarm.get("severity")?.clone()).ok()?;
                    Some((code, severity))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Deterministic severity for a failing result.
pub fn severity_for(result: &CheckResult) -> Severity {
    if result.is_execution_failure() {
        return Severity::Critical;
    }

    match result.check_name() {
        CheckName::Connectivity => Severity::Critical,
        CheckName::Interface => Severity::Major,
        CheckName::Status => {
            let over = |key: &str| {
                detail_f64(result, key)
                    .map(|v| v > CRITICAL_UTILIZATION_PCT)
                    .unwrap_or(false)
            };
            let excursion = detail_f64(result, "temperature_excursion_c").unwrap_or(0.0);

            if over("cpu_pct") || over("mem_pct") || excursion > TEMPERATURE_MARGIN_C {
                Severity::Major
            } else {
                Severity::Minor
            }
        }
        CheckName::Alarm => blocking_alarms(result)
            .into_iter()
            .map(|(_, severity)| severity)
            .min()
            .unwrap_or(Severity::Major),
    }
}

/// Human-readable description fixed at first occurrence.
pub fn describe(result: &CheckResult) -> String {
    if let Some(error) = result.detail(EXECUTION_ERROR_KEY).and_then(Value::as_str) {
        return format!("Execution failure - device unreachable for evaluation: {}", error);
    }

    match result.check_name() {
        CheckName::Connectivity => {
            let failed = detail_strings(result, "failed_conditions");
            if failed.is_empty() {
                "Connectivity failed - device unreachable".to_string()
            } else {
                format!("Connectivity failed - device unreachable ({})", failed.join(", "))
            }
        }
        CheckName::Status => {
            let issues = detail_strings(result, "issues");
            if issues.is_empty() {
                "Status out of bounds".to_string()
            } else {
                issues.join("; ")
            }
        }
        CheckName::Interface => {
            let mismatched = detail_strings(result, "mismatched");
            format!("Interfaces administratively up but operationally down: {}", mismatched.join(", "))
        }
        CheckName::Alarm => {
            let alarms: Vec<String> = blocking_alarms(result)
                .into_iter()
                .map(|(code, severity)| format!("{} ({})", code, severity))
                .collect();
            format!("Blocking alarms active: {}", alarms.join(", "))
        }
    }
}
