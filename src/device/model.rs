//! In-memory device model.
//!
//! Holds one snapshot per device and applies bounded perturbations to them.
//! Snapshot reads and writes go through a `parking_lot::RwLock`, so the model
//! can be shared with a parallel test run while a scenario perturbs it.

use super::{
    Alarm, Capability, ConnectivityState, DeviceProvider, DeviceSnapshot, Interface, StatusMetrics,
};
use crate::config::{DeviceSpec, Inventory};
use crate::{NetVerifyError, Result, Severity};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Nominal telemetry for freshly built devices.
const NOMINAL_CPU_PCT: f64 = 15.2;
const NOMINAL_MEM_PCT: f64 = 45.8;
const NOMINAL_TEMPERATURE_C: f64 = 35.2;
const NOMINAL_UPTIME_S: u64 = 72 * 3600 + 15 * 60 + 30;
const NOMINAL_RESPONSE_TIME_MS: f64 = 4.0;

/// Bounds applied to metric shifts.
const PCT_RANGE: (f64, f64) = (0.0, 100.0);
const TEMPERATURE_RANGE_C: (f64, f64) = (-60.0, 150.0);

/// Status metric addressed by [`Mutation::ShiftMetric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    CpuPct,
    MemPct,
    TemperatureC,
    UptimeS,
}

/// A bounded change to a device's simulated state.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Raise (or replace) an alarm by code
    RaiseAlarm {
        code: String,
        severity: Severity,
        message: String,
    },
    /// Clear an alarm by code; clearing an absent code is a no-op
    ClearAlarm { code: String },
    SetAdminState { interface: String, up: bool },
    SetOperState { interface: String, up: bool },
    SetSpeed { interface: String, speed: String },
    /// Add `delta` to a metric, clamped to its physical range
    ShiftMetric { metric: Metric, delta: f64 },
    SetReachable(bool),
    SetPortOpen(bool),
}

impl Mutation {
    /// Capability the target device must expose.
    pub fn required_capability(&self) -> Capability {
        match self {
            Mutation::RaiseAlarm { .. } | Mutation::ClearAlarm { .. } => Capability::Alarms,
            Mutation::SetAdminState { .. }
            | Mutation::SetOperState { .. }
            | Mutation::SetSpeed { .. } => Capability::Interfaces,
            Mutation::ShiftMetric { .. } => Capability::Status,
            Mutation::SetReachable(_) | Mutation::SetPortOpen(_) => Capability::Connectivity,
        }
    }

    fn apply(&self, snapshot: &mut DeviceSnapshot) -> std::result::Result<(), String> {
        let capability = self.required_capability();
        if !snapshot.exposes(capability) {
            return Err(format!(
                "{} devices do not expose the {} capability",
                snapshot.device_kind, capability
            ));
        }

        match self {
            Mutation::RaiseAlarm {
                code,
                severity,
                message,
            } => {
                snapshot.raise_alarm(Alarm {
                    code: code.clone(),
                    severity: *severity,
                    message: message.clone(),
                    raised_at: Utc::now(),
                });
            }
            Mutation::ClearAlarm { code } => {
                snapshot.clear_alarm(code);
            }
            Mutation::SetAdminState { interface, up } => {
                find_interface(snapshot, interface)?.admin_up = *up;
            }
            Mutation::SetOperState { interface, up } => {
                find_interface(snapshot, interface)?.oper_up = *up;
            }
            Mutation::SetSpeed { interface, speed } => {
                if speed.trim().is_empty() {
                    return Err("interface speed must not be empty".to_string());
                }
                find_interface(snapshot, interface)?.speed = speed.clone();
            }
            Mutation::ShiftMetric { metric, delta } => {
                if !delta.is_finite() {
                    return Err(format!("metric delta must be finite, got {}", delta));
                }
                let status = &mut snapshot.status;
                match metric {
                    Metric::CpuPct => status.cpu_pct = clamp(status.cpu_pct + delta, PCT_RANGE),
                    Metric::MemPct => status.mem_pct = clamp(status.mem_pct + delta, PCT_RANGE),
                    Metric::TemperatureC => {
                        status.temperature_c =
                            clamp(status.temperature_c + delta, TEMPERATURE_RANGE_C)
                    }
                    Metric::UptimeS => {
                        let shifted = status.uptime_s as f64 + delta;
                        status.uptime_s = if shifted <= 0.0 { 0 } else { shifted as u64 };
                    }
                }
            }
            Mutation::SetReachable(reachable) => {
                snapshot.connectivity.reachable = *reachable;
            }
            Mutation::SetPortOpen(open) => {
                snapshot.connectivity.port_open = *open;
            }
        }

        Ok(())
    }
}

fn find_interface<'a>(
    snapshot: &'a mut DeviceSnapshot,
    name: &str,
) -> std::result::Result<&'a mut Interface, String> {
    snapshot
        .interface_mut(name)
        .ok_or_else(|| format!("no interface named {}", name))
}

fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}

/// Build a nominal, healthy snapshot for an inventory entry.
pub fn nominal_snapshot(device_id: &str, spec: &DeviceSpec) -> DeviceSnapshot {
    let kind_spec = spec.kind.spec();
    let interface_count = spec.interface_count();

    DeviceSnapshot {
        device_id: device_id.to_string(),
        device_kind: spec.kind,
        capabilities: kind_spec.capabilities,
        status: StatusMetrics {
            cpu_pct: NOMINAL_CPU_PCT,
            mem_pct: NOMINAL_MEM_PCT,
            temperature_c: NOMINAL_TEMPERATURE_C,
            uptime_s: NOMINAL_UPTIME_S,
        },
        interfaces: (0..interface_count)
            .map(|i| Interface::new(format!("eth{}", i), true, true, kind_spec.interface_speed))
            .collect(),
        alarms: BTreeMap::new(),
        connectivity: ConnectivityState {
            address: spec.address.clone(),
            reachable: true,
            response_time_ms: NOMINAL_RESPONSE_TIME_MS,
            management_port: spec.management_port(),
            port_open: true,
        },
        protocols: spec.protocols(),
        expected_interfaces: interface_count,
    }
}

/// Snapshot store for every simulated device in a run.
#[derive(Debug, Default)]
pub struct DeviceModel {
    devices: RwLock<BTreeMap<String, DeviceSnapshot>>,
}

impl DeviceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build nominal snapshots for every device in the inventory.
    pub fn from_inventory(inventory: &Inventory) -> Result<Self> {
        let model = DeviceModel::new();
        for (device_id, spec) in inventory.devices() {
            model.insert(nominal_snapshot(device_id, spec))?;
        }
        Ok(model)
    }

    /// Register a snapshot. Ids must be unique and snapshots valid.
    pub fn insert(&self, snapshot: DeviceSnapshot) -> Result<()> {
        snapshot.validate()?;

        let mut devices = self.devices.write();
        if devices.contains_key(&snapshot.device_id) {
            return Err(NetVerifyError::DuplicateDevice {
                device_id: snapshot.device_id,
            });
        }
        debug!(device = %snapshot.device_id, kind = %snapshot.device_kind, "registered device");
        devices.insert(snapshot.device_id.clone(), snapshot);
        Ok(())
    }

    pub fn get_snapshot(&self, device_id: &str) -> Result<DeviceSnapshot> {
        self.devices
            .read()
            .get(device_id)
            .cloned()
            .ok_or_else(|| NetVerifyError::NotFound {
                device_id: device_id.to_string(),
            })
    }

    /// Apply a mutation and return the updated snapshot.
    ///
    /// A rejected mutation leaves the stored snapshot untouched.
    pub fn perturb(&self, device_id: &str, mutation: Mutation) -> Result<DeviceSnapshot> {
        let mut devices = self.devices.write();
        let stored = devices
            .get_mut(device_id)
            .ok_or_else(|| NetVerifyError::NotFound {
                device_id: device_id.to_string(),
            })?;

        let mut updated = stored.clone();
        mutation
            .apply(&mut updated)
            .map_err(|reason| NetVerifyError::InvalidMutation {
                device_id: device_id.to_string(),
                reason,
            })?;

        debug!(device = device_id, ?mutation, "perturbed device");
        *stored = updated.clone();
        Ok(updated)
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.devices.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl DeviceProvider for DeviceModel {
    fn get_snapshot(&self, device_id: &str) -> Result<DeviceSnapshot> {
        DeviceModel::get_snapshot(self, device_id)
    }

    fn device_ids(&self) -> Vec<String> {
        DeviceModel::device_ids(self)
    }
}
