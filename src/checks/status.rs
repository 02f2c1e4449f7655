//! Status check.
//!
//! Verifies utilization, temperature, and uptime against fixed bounds and the
//! device kind's rated temperature range. The raw metrics are always copied
//! into the details so defect classification can grade the failure.

use crate::device::DeviceSnapshot;
use crate::{CheckName, CheckResult, Details};
use serde_json::json;

/// Highest acceptable CPU or memory utilization, in percent.
pub const UTILIZATION_LIMIT_PCT: f64 = 90.0;

/// Execute the status check
pub fn run(snapshot: &DeviceSnapshot) -> CheckResult {
    if let Some(skip) = super::skip_if_unsupported(snapshot, CheckName::Status) {
        return skip;
    }

    let status = &snapshot.status;
    let rated = snapshot.device_kind.spec();

    let mut violations = Vec::new();
    let mut issues = Vec::new();

    if status.cpu_pct > UTILIZATION_LIMIT_PCT {
        violations.push("cpu_pct");
        issues.push(format!("High CPU usage: {:.1}%", status.cpu_pct));
    }
    if status.mem_pct > UTILIZATION_LIMIT_PCT {
        violations.push("mem_pct");
        issues.push(format!("High memory usage: {:.1}%", status.mem_pct));
    }
    if !rated.temperature_in_range(status.temperature_c) {
        violations.push("temperature_c");
        issues.push(format!(
            "Temperature {:.1}°C outside rated range {:.0}..{:.0}°C",
            status.temperature_c, rated.rated_temp_min_c, rated.rated_temp_max_c
        ));
    }
    if status.uptime_s == 0 {
        violations.push("uptime_s");
        issues.push("Device reports zero uptime".to_string());
    }

    let mut details = Details::new();
    details.insert("cpu_pct".to_string(), json!(status.cpu_pct));
    details.insert("mem_pct".to_string(), json!(status.mem_pct));
    details.insert("temperature_c".to_string(), json!(status.temperature_c));
    details.insert("uptime_s".to_string(), json!(status.uptime_s));
    details.insert("rated_min_c".to_string(), json!(rated.rated_temp_min_c));
    details.insert("rated_max_c".to_string(), json!(rated.rated_temp_max_c));
    details.insert(
        "temperature_excursion_c".to_string(),
        json!(rated.temperature_excursion(status.temperature_c)),
    );
    if !violations.is_empty() {
        details.insert("violations".to_string(), json!(violations));
        details.insert("issues".to_string(), json!(issues));
    }

    CheckResult::new(
        snapshot.device_id.clone(),
        CheckName::Status,
        violations.is_empty(),
        details,
    )
}
