//! Simulated device model.
//!
//! A device is described by a snapshot of its attributes plus the set of
//! capabilities its kind exposes. Checks branch on capability presence rather
//! than on the device kind, so kinds exposing a strict subset of
//! {Connectivity, Status, Interfaces, Alarms} are supported without changes to
//! the check library.

pub mod model;

pub use model::{DeviceModel, Metric, Mutation};

use crate::data::specs;
use crate::{NetVerifyError, Result, Severity, Timestamp};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Device family under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    OpticalTransponder,
    MicrowaveRadio,
}

impl DeviceKind {
    /// Rated hardware data for this kind.
    pub fn spec(self) -> &'static specs::KindSpec {
        specs::spec_for(self)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::OpticalTransponder => write!(f, "optical_transponder"),
            DeviceKind::MicrowaveRadio => write!(f, "microwave_radio"),
        }
    }
}

/// Attribute group a device may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Connectivity,
    Status,
    Interfaces,
    Alarms,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Connectivity,
        Capability::Status,
        Capability::Interfaces,
        Capability::Alarms,
    ];

    const fn bit(self) -> u8 {
        match self {
            Capability::Connectivity => 0b0001,
            Capability::Status => 0b0010,
            Capability::Interfaces => 0b0100,
            Capability::Alarms => 0b1000,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Connectivity => write!(f, "connectivity"),
            Capability::Status => write!(f, "status"),
            Capability::Interfaces => write!(f, "interfaces"),
            Capability::Alarms => write!(f, "alarms"),
        }
    }
}

/// Compact flag set over [`Capability`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    pub const fn all() -> Self {
        CapabilitySet(0b1111)
    }

    pub const fn with(self, capability: Capability) -> Self {
        CapabilitySet(self.0 | capability.bit())
    }

    pub const fn without(self, capability: Capability) -> Self {
        CapabilitySet(self.0 & !capability.bit())
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(CapabilitySet::EMPTY, CapabilitySet::with)
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for capability in self.iter() {
            seq.serialize_element(&capability)?;
        }
        seq.end()
    }
}

/// Resource utilization and health counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMetrics {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub temperature_c: f64,
    pub uptime_s: u64,
}

/// One physical or logical port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interface {
    pub name: String,
    pub admin_up: bool,
    pub oper_up: bool,
    pub speed: String,
}

impl Interface {
    pub fn new(name: impl Into<String>, admin_up: bool, oper_up: bool, speed: impl Into<String>) -> Self {
        Interface {
            name: name.into(),
            admin_up,
            oper_up,
            speed: speed.into(),
        }
    }
}

/// An active alarm. Codes are unique per device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alarm {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    #[serde(serialize_with = "crate::timefmt::serialize")]
    pub raised_at: Timestamp,
}

/// Management-plane reachability as last probed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityState {
    pub address: String,
    pub reachable: bool,
    pub response_time_ms: f64,
    pub management_port: u16,
    pub port_open: bool,
}

/// Point-in-time view of one simulated device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub device_kind: DeviceKind,
    pub capabilities: CapabilitySet,
    pub status: StatusMetrics,
    pub interfaces: Vec<Interface>,
    pub alarms: BTreeMap<String, Alarm>,
    pub connectivity: ConnectivityState,
    pub protocols: Vec<String>,
    pub expected_interfaces: usize,
}

impl DeviceSnapshot {
    pub fn exposes(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Raise an alarm, replacing any alarm with the same code.
    pub fn raise_alarm(&mut self, alarm: Alarm) {
        self.alarms.insert(alarm.code.clone(), alarm);
    }

    pub fn clear_alarm(&mut self, code: &str) -> Option<Alarm> {
        self.alarms.remove(code)
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.name == name)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| NetVerifyError::InvalidDevice {
            device_id: self.device_id.clone(),
            reason: reason.to_string(),
        };

        if self.device_id.trim().is_empty() {
            return Err(invalid("device id is empty"));
        }

        if self.exposes(Capability::Interfaces) && self.interfaces.is_empty() {
            return Err(invalid("device exposes interfaces but has none"));
        }

        let metrics = [
            ("cpu_pct", self.status.cpu_pct),
            ("mem_pct", self.status.mem_pct),
            ("temperature_c", self.status.temperature_c),
        ];
        if let Some((name, value)) = metrics.iter().find(|(_, value)| !value.is_finite()) {
            return Err(invalid(&format!("{} is not finite ({})", name, value)));
        }

        let mut seen = HashSet::new();
        for iface in &self.interfaces {
            if !seen.insert(iface.name.as_str()) {
                return Err(invalid(&format!("duplicate interface name {}", iface.name)));
            }
        }

        if let Some((code, _)) = self.alarms.iter().find(|(code, alarm)| *code != &alarm.code) {
            return Err(invalid(&format!("alarm keyed as {} carries a different code", code)));
        }

        Ok(())
    }
}

/// Source of device snapshots consumed by the test runner.
pub trait DeviceProvider: Send + Sync {
    /// Fetch the current snapshot, or `NotFound` for unknown ids.
    fn get_snapshot(&self, device_id: &str) -> Result<DeviceSnapshot>;

    /// Every device id the provider knows about.
    fn device_ids(&self) -> Vec<String>;
}
