//! Interface check.
//!
//! Every administratively-up interface must also be operationally up.

use crate::device::DeviceSnapshot;
use crate::{CheckName, CheckResult, Details};
use serde_json::json;

/// Execute the interface check
pub fn run(snapshot: &DeviceSnapshot) -> CheckResult {
    if let Some(skip) = super::skip_if_unsupported(snapshot, CheckName::Interface) {
        return skip;
    }

    let admin_up: Vec<_> = snapshot.interfaces.iter().filter(|i| i.admin_up).collect();
    let mismatched: Vec<&str> = admin_up
        .iter()
        .filter(|i| !i.oper_up)
        .map(|i| i.name.as_str())
        .collect();

    let mut details = Details::new();
    details.insert("interface_count".to_string(), json!(snapshot.interfaces.len()));
    details.insert("expected_interfaces".to_string(), json!(snapshot.expected_interfaces));
    details.insert("admin_up_count".to_string(), json!(admin_up.len()));
    if !mismatched.is_empty() {
        details.insert("mismatched".to_string(), json!(mismatched));
    }

    // Zero admin-up interfaces passes vacuously.
    CheckResult::new(
        snapshot.device_id.clone(),
        CheckName::Interface,
        mismatched.is_empty(),
        details,
    )
}
