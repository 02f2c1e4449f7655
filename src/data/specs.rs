//! Device kind specifications
//!
//! Provides rated operating data for each supported device kind.

use crate::device::{CapabilitySet, DeviceKind};

/// Rated data for one device kind
#[derive(Debug, Clone, PartialEq)]
pub struct KindSpec {
    pub kind: DeviceKind,
    pub rated_temp_min_c: f64,
    pub rated_temp_max_c: f64,
    pub default_management_port: u16,
    pub default_interfaces: usize,
    pub default_protocols: &'static [&'static str],
    pub interface_speed: &'static str,
    pub capabilities: CapabilitySet,
}

impl KindSpec {
    /// Whether a temperature lies inside the rated range (inclusive)
    pub fn temperature_in_range(&self, temperature_c: f64) -> bool {
        temperature_c >= self.rated_temp_min_c && temperature_c <= self.rated_temp_max_c
    }

    /// Degrees outside the rated range; 0.0 when within it
    pub fn temperature_excursion(&self, temperature_c: f64) -> f64 {
        if temperature_c > self.rated_temp_max_c {
            temperature_c - self.rated_temp_max_c
        } else if temperature_c < self.rated_temp_min_c {
            self.rated_temp_min_c - temperature_c
        } else {
            0.0
        }
    }
}

static KIND_SPECS: [KindSpec; 2] = [
    KindSpec {
        kind: DeviceKind::OpticalTransponder,
        rated_temp_min_c: 0.0,
        rated_temp_max_c: 70.0,
        default_management_port: 8080,
        default_interfaces: 4,
        default_protocols: &["REST", "SNMP", "CLI"],
        interface_speed: "10Gbps",
        capabilities: CapabilitySet::all(),
    },
    // Outdoor unit rating
    KindSpec {
        kind: DeviceKind::MicrowaveRadio,
        rated_temp_min_c: -33.0,
        rated_temp_max_c: 55.0,
        default_management_port: 443,
        default_interfaces: 2,
        default_protocols: &["REST", "NETCONF"],
        interface_speed: "10Gbps",
        capabilities: CapabilitySet::all(),
    },
];

/// Get the specification for a device kind
pub fn spec_for(kind: DeviceKind) -> &'static KindSpec {
    match kind {
        DeviceKind::OpticalTransponder => &KIND_SPECS[0],
        DeviceKind::MicrowaveRadio => &KIND_SPECS[1],
    }
}

/// All known kind specifications
pub fn all_specs() -> &'static [KindSpec] {
    &KIND_SPECS
}
