//! Mock device provider and scenario builders.
//!
//! Simulates:
//! - Nominal optical transponders and microwave radios
//! - A degraded transponder (hot CPU, a dead link, a Critical alarm)
//! - Reduced-capability devices
//! - Devices whose snapshot fetch fails or panics

use chrono::Utc;
use netverify::config::DeviceSpec;
use netverify::device::model::nominal_snapshot;
use netverify::device::{Alarm, Capability, DeviceKind, DeviceProvider, DeviceSnapshot};
use netverify::{NetVerifyError, Result, Severity};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider serving fixed snapshots.
#[derive(Default)]
pub struct MockProvider {
    snapshots: BTreeMap<String, DeviceSnapshot>,
    unreachable: BTreeSet<String>,
    panicking: BTreeSet<String>,
    fetches: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, snapshot: DeviceSnapshot) -> Self {
        self.snapshots.insert(snapshot.device_id.clone(), snapshot);
        self
    }

    /// Listed in `device_ids` but every fetch fails with `NotFound`.
    pub fn with_vanished_device(mut self, device_id: &str) -> Self {
        self.unreachable.insert(device_id.to_string());
        self
    }

    /// Listed in `device_ids` but every fetch panics.
    pub fn with_panicking_device(mut self, device_id: &str) -> Self {
        self.panicking.insert(device_id.to_string());
        self
    }

    /// Number of snapshot fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DeviceProvider for MockProvider {
    fn get_snapshot(&self, device_id: &str) -> Result<DeviceSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(device_id) {
            panic!("management agent crashed on {}", device_id);
        }
        if self.unreachable.contains(device_id) {
            return Err(NetVerifyError::NotFound {
                device_id: device_id.to_string(),
            });
        }
        self.snapshots
            .get(device_id)
            .cloned()
            .ok_or_else(|| NetVerifyError::NotFound {
                device_id: device_id.to_string(),
            })
    }

    fn device_ids(&self) -> Vec<String> {
        self.snapshots
            .keys()
            .chain(self.unreachable.iter())
            .chain(self.panicking.iter())
            .cloned()
            .collect()
    }
}

pub fn nominal_optical(device_id: &str) -> DeviceSnapshot {
    nominal_snapshot(
        device_id,
        &DeviceSpec::new(DeviceKind::OpticalTransponder, "192.168.1.100"),
    )
}

pub fn nominal_radio(device_id: &str) -> DeviceSnapshot {
    nominal_snapshot(
        device_id,
        &DeviceSpec::new(DeviceKind::MicrowaveRadio, "192.168.1.101"),
    )
}

/// Reachable transponder at 96% CPU with eth1 admin-up/oper-down and a
/// Critical LOS alarm.
pub fn degraded_optical(device_id: &str) -> DeviceSnapshot {
    let mut snapshot = nominal_optical(device_id);
    snapshot.status.cpu_pct = 96.0;
    if let Some(iface) = snapshot.interface_mut("eth1") {
        iface.admin_up = true;
        iface.oper_up = false;
    }
    snapshot.raise_alarm(Alarm {
        code: "LOS".to_string(),
        severity: Severity::Critical,
        message: "Loss of signal on line port".to_string(),
        raised_at: Utc::now(),
    });
    snapshot
}

/// Radio exposing only the given capabilities.
pub fn reduced_radio(device_id: &str, capabilities: &[Capability]) -> DeviceSnapshot {
    let mut snapshot = nominal_radio(device_id);
    snapshot.capabilities = capabilities.iter().copied().collect();
    snapshot
}

/// The standard two-device scenario: degraded `opt-1`, nominal `mw-1`.
pub fn standard_lab() -> MockProvider {
    MockProvider::new()
        .with_device(degraded_optical("opt-1"))
        .with_device(nominal_radio("mw-1"))
}
