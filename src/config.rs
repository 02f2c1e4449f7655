//! Device inventory configuration.
//!
//! An inventory maps device ids to their kind and management details. It can
//! be loaded from TOML or JSON (chosen by file extension); JSON files may use
//! either the wrapped `{"devices": {...}}` layout or a flat id-to-device map.
//!
//! ```toml
//! [devices.optical_device_1]
//! kind = "optical_transponder"
//! address = "192.168.1.100"
//! management_port = 8080
//! expected_interfaces = 4
//! protocols = ["REST", "SNMP", "CLI"]
//! ```

use crate::device::DeviceKind;
use crate::{NetVerifyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One inventory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    #[serde(alias = "type")]
    pub kind: DeviceKind,
    #[serde(alias = "ip")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_interfaces: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
}

impl DeviceSpec {
    /// Entry using every default of the kind.
    pub fn new(kind: DeviceKind, address: impl Into<String>) -> Self {
        DeviceSpec {
            kind,
            address: address.into(),
            management_port: None,
            expected_interfaces: None,
            protocols: Vec::new(),
        }
    }

    pub fn management_port(&self) -> u16 {
        self.management_port
            .unwrap_or(self.kind.spec().default_management_port)
    }

    pub fn interface_count(&self) -> usize {
        self.expected_interfaces
            .unwrap_or(self.kind.spec().default_interfaces)
    }

    pub fn protocols(&self) -> Vec<String> {
        if self.protocols.is_empty() {
            self.kind
                .spec()
                .default_protocols
                .iter()
                .map(|p| p.to_string())
                .collect()
        } else {
            self.protocols.clone()
        }
    }
}

/// Set of devices available to a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    #[serde(default)]
    devices: BTreeMap<String, DeviceSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInventory {
    Wrapped(Inventory),
    Flat(BTreeMap<String, DeviceSpec>),
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in lab with one device of each kind.
    pub fn default_lab() -> Self {
        let mut inventory = Inventory::new();
        inventory.devices.insert(
            "optical_device_1".to_string(),
            DeviceSpec {
                kind: DeviceKind::OpticalTransponder,
                address: "192.168.1.100".to_string(),
                management_port: Some(8080),
                expected_interfaces: Some(4),
                protocols: vec!["REST".to_string(), "SNMP".to_string(), "CLI".to_string()],
            },
        );
        inventory.devices.insert(
            "microwave_device_1".to_string(),
            DeviceSpec {
                kind: DeviceKind::MicrowaveRadio,
                address: "192.168.1.101".to_string(),
                management_port: Some(443),
                expected_interfaces: Some(2),
                protocols: vec!["REST".to_string(), "NETCONF".to_string()],
            },
        );
        inventory
    }

    /// Load an inventory file, choosing the parser by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| NetVerifyError::Io {
            context: format!("reading inventory {}", path.display()),
            source: e,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };

        parsed.map_err(|e| match e {
            NetVerifyError::Config { message, .. } => NetVerifyError::Config {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let inventory: Inventory = toml::from_str(content).map_err(|e| NetVerifyError::Config {
            path: "<toml>".to_string(),
            message: e.to_string(),
        })?;
        inventory.validated("<toml>")
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let parsed: JsonInventory =
            serde_json::from_str(content).map_err(|e| NetVerifyError::Config {
                path: "<json>".to_string(),
                message: e.to_string(),
            })?;
        let inventory = match parsed {
            JsonInventory::Wrapped(inventory) => inventory,
            JsonInventory::Flat(devices) => Inventory { devices },
        };
        inventory.validated("<json>")
    }

    fn validated(self, origin: &str) -> Result<Self> {
        for (device_id, spec) in &self.devices {
            let problem = if device_id.trim().is_empty() {
                Some("device id must not be empty".to_string())
            } else if spec.expected_interfaces == Some(0) {
                Some(format!("{}: expected_interfaces must be at least 1", device_id))
            } else if spec.management_port == Some(0) {
                Some(format!("{}: management_port must be non-zero", device_id))
            } else {
                None
            };

            if let Some(message) = problem {
                return Err(NetVerifyError::Config {
                    path: origin.to_string(),
                    message,
                });
            }
        }
        Ok(self)
    }

    /// Add or replace a device entry.
    pub fn insert(&mut self, device_id: impl Into<String>, spec: DeviceSpec) {
        self.devices.insert(device_id.into(), spec);
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceSpec> {
        self.devices.get(device_id)
    }

    pub fn devices(&self) -> impl Iterator<Item = (&String, &DeviceSpec)> {
        self.devices.iter()
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
