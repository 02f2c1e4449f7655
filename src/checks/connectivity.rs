//! Connectivity check.
//!
//! Passes when the simulated reachability probe succeeds and the management
//! port is reported open.

use crate::device::DeviceSnapshot;
use crate::{CheckName, CheckResult, Details};
use serde_json::json;

/// Execute the connectivity check
pub fn run(snapshot: &DeviceSnapshot) -> CheckResult {
    if let Some(skip) = super::skip_if_unsupported(snapshot, CheckName::Connectivity) {
        return skip;
    }

    let conn = &snapshot.connectivity;
    let probe_ok = conn.reachable && conn.response_time_ms > 0.0;

    let mut failed_conditions = Vec::new();
    if !probe_ok {
        failed_conditions.push("reachability_probe");
    }
    if !conn.port_open {
        failed_conditions.push("management_port");
    }

    let mut details = Details::new();
    details.insert("address".to_string(), json!(conn.address));
    details.insert("probe_ok".to_string(), json!(probe_ok));
    details.insert("response_time_ms".to_string(), json!(conn.response_time_ms));
    details.insert("management_port".to_string(), json!(conn.management_port));
    details.insert("port_open".to_string(), json!(conn.port_open));
    if !failed_conditions.is_empty() {
        details.insert("failed_conditions".to_string(), json!(failed_conditions));
    }

    CheckResult::new(
        snapshot.device_id.clone(),
        CheckName::Connectivity,
        failed_conditions.is_empty(),
        details,
    )
}
