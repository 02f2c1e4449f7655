//! Verification check library.
//!
//! Four independent checks, each a pure function from a device snapshot to a
//! [`CheckResult`]:
//! - Connectivity: reachability probe and management port
//! - Status: CPU, memory, temperature, and uptime bounds
//! - Interface: admin/oper state agreement
//! - Alarm: no Critical or Major alarm raised
//!
//! # Capability Gating
//!
//! Every check first looks at the snapshot's capability set. A device that does
//! not expose the capability a check needs gets a skipped result, never a
//! failure. Checks never mutate the snapshot, so re-running one on the same
//! snapshot yields the same verdict and details.

pub mod alarm;
pub mod connectivity;
pub mod interface;
pub mod status;

use crate::device::DeviceSnapshot;
use crate::{CheckName, CheckResult};

/// Signature shared by every check.
pub type CheckFn = fn(&DeviceSnapshot) -> CheckResult;

/// Look up the implementation of a check.
pub fn check_fn(name: CheckName) -> CheckFn {
    match name {
        CheckName::Connectivity => connectivity::run,
        CheckName::Status => status::run,
        CheckName::Interface => interface::run,
        CheckName::Alarm => alarm::run,
    }
}

/// Run one check against a snapshot.
pub fn run_check(name: CheckName, snapshot: &DeviceSnapshot) -> CheckResult {
    check_fn(name)(snapshot)
}

/// Skipped result when the device lacks the capability `name` needs.
pub(crate) fn skip_if_unsupported(snapshot: &DeviceSnapshot, name: CheckName) -> Option<CheckResult> {
    let capability = name.required_capability();
    if snapshot.exposes(capability) {
        None
    } else {
        Some(CheckResult::skipped(
            snapshot.device_id.clone(),
            name,
            format!("{} does not expose the {} capability", snapshot.device_kind, capability),
        ))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::config::DeviceSpec;
    use crate::device::model::nominal_snapshot;
    use crate::device::{DeviceKind, DeviceSnapshot};

    pub fn optical(device_id: &str) -> DeviceSnapshot {
        nominal_snapshot(device_id, &DeviceSpec::new(DeviceKind::OpticalTransponder, "10.0.0.1"))
    }

    pub fn radio(device_id: &str) -> DeviceSnapshot {
        nominal_snapshot(device_id, &DeviceSpec::new(DeviceKind::MicrowaveRadio, "10.0.0.2"))
    }
}
