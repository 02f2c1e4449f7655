//! Alarm check.
//!
//! Fails while any Critical or Major alarm is raised. Minor and Warning alarms
//! are listed for visibility but never fail the check.

use crate::device::{Alarm, DeviceSnapshot};
use crate::{CheckName, CheckResult, Details};
use serde_json::{json, Value};

fn describe(alarm: &Alarm) -> Value {
    json!({
        "code": alarm.code,
        "severity": alarm.severity,
        "message": alarm.message,
    })
}

/// Execute the alarm check
pub fn run(snapshot: &DeviceSnapshot) -> CheckResult {
    if let Some(skip) = super::skip_if_unsupported(snapshot, CheckName::Alarm) {
        return skip;
    }

    let (blocking, advisory): (Vec<&Alarm>, Vec<&Alarm>) = snapshot
        .alarms
        .values()
        .partition(|alarm| alarm.severity.is_blocking());

    let mut details = Details::new();
    details.insert("alarm_count".to_string(), json!(snapshot.alarms.len()));
    if !blocking.is_empty() {
        details.insert(
            "blocking_alarms".to_string(),
            Value::Array(blocking.iter().map(|a| describe(a)).collect()),
        );
    }
    if !advisory.is_empty() {
        details.insert(
            "advisory_alarms".to_string(),
            Value::Array(advisory.iter().map(|a| describe(a)).collect()),
        );
    }

    CheckResult::new(
        snapshot.device_id.clone(),
        CheckName::Alarm,
        blocking.is_empty(),
        details,
    )
}
