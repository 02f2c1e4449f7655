//! netverify library
//!
//! Test orchestration and defect classification for simulated network devices.
//!
//! This library drives a fixed battery of verification checks against
//! simulated optical transponders and microwave radios:
//! - Device model with capability-gated snapshots and bounded perturbation
//! - Connectivity, status, interface, and alarm checks
//! - Test runner with per-device ordering and cross-device parallelism
//! - Defect classification with per-run deduplication
//! - Run-level aggregation consumed by console, JSON, JUnit, and log formatters
//!
//! # Example
//!
//! ```no_run
//! use netverify::config::Inventory;
//! use netverify::device::DeviceModel;
//! use netverify::{run_suite, RunConfig};
//!
//! let model = DeviceModel::from_inventory(&Inventory::default_lab()).expect("valid inventory");
//! let report = run_suite(&model, &RunConfig::default()).expect("run failed");
//! println!("Checks passed: {}", report.totals().passed);
//! ```

pub mod checks;
pub mod cli;
pub mod config;
pub mod data;
pub mod device;
pub mod engine;
pub mod timefmt;
pub mod version;

use chrono::{DateTime, Utc};
use cli::args::Args;
use device::{Capability, DeviceProvider};
use engine::orchestrator::{OrchestratorConfig, TestRunner};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-exports for public API
pub use engine::classifier::{Defect, DefectClassifier, DefectKey};
pub use engine::result::{RunReport, Totals};

/// Point-in-time stamp used across results, defects, and reports.
pub type Timestamp = DateTime<Utc>;

/// Diagnostic key/value pairs attached to a check result.
pub type Details = BTreeMap<String, serde_json::Value>;

/// The fixed battery of checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckName {
    /// Reachability probe plus management port
    Connectivity,
    /// CPU, memory, temperature, and uptime bounds
    Status,
    /// Admin/oper state agreement on every interface
    Interface,
    /// No Critical or Major alarm raised
    Alarm,
}

impl CheckName {
    /// Default execution order.
    pub const ALL: [CheckName; 4] = [
        CheckName::Connectivity,
        CheckName::Status,
        CheckName::Interface,
        CheckName::Alarm,
    ];

    /// Capability a device must expose for this check to be evaluated.
    pub fn required_capability(self) -> Capability {
        match self {
            CheckName::Connectivity => Capability::Connectivity,
            CheckName::Status => Capability::Status,
            CheckName::Interface => Capability::Interfaces,
            CheckName::Alarm => Capability::Alarms,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckName::Connectivity => "connectivity",
            CheckName::Status => "status",
            CheckName::Interface => "interface",
            CheckName::Alarm => "alarm",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckName {
    type Err = NetVerifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "connectivity" => Ok(CheckName::Connectivity),
            "status" => Ok(CheckName::Status),
            "interface" | "interfaces" => Ok(CheckName::Interface),
            "alarm" | "alarms" => Ok(CheckName::Alarm),
            _ => Err(NetVerifyError::UnknownCheck {
                name: s.to_string(),
            }),
        }
    }
}

/// Ordinal class of impact. Ordering follows declaration: Critical sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl Severity {
    /// Whether an alarm of this severity fails the alarm check.
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Critical | Severity::Major)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Major => write!(f, "MAJOR"),
            Severity::Minor => write!(f, "MINOR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            "warning" => Ok(Severity::Warning),
            _ => Err(format!(
                "Unknown severity: '{}'. Valid severities: critical, major, minor, warning",
                s
            )),
        }
    }
}

/// Details key set on results that could not be evaluated.
pub const EXECUTION_ERROR_KEY: &str = "execution_error";

/// Outcome of one check against one device.
///
/// Results are immutable once built; the runner only attaches the measured
/// duration before recording them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    device_id: String,
    check_name: CheckName,
    passed: bool,
    skipped: bool,
    details: Details,
    #[serde(serialize_with = "timefmt::serialize")]
    timestamp: Timestamp,
    duration_ms: u64,
}

impl CheckResult {
    pub fn new(device_id: impl Into<String>, check_name: CheckName, passed: bool, details: Details) -> Self {
        CheckResult {
            device_id: device_id.into(),
            check_name,
            passed,
            skipped: false,
            details,
            timestamp: Utc::now(),
            duration_ms: 0,
        }
    }

    /// A check the device cannot be evaluated for. Skips never fail.
    pub fn skipped(device_id: impl Into<String>, check_name: CheckName, reason: impl Into<String>) -> Self {
        let mut details = Details::new();
        details.insert("skip_reason".to_string(), serde_json::Value::String(reason.into()));
        CheckResult {
            skipped: true,
            ..CheckResult::new(device_id, check_name, true, details)
        }
    }

    /// A check that could not run at all (unknown device, timeout, panic).
    pub fn execution_failure(
        device_id: impl Into<String>,
        check_name: CheckName,
        error: impl fmt::Display,
    ) -> Self {
        let mut details = Details::new();
        details.insert(
            EXECUTION_ERROR_KEY.to_string(),
            serde_json::Value::String(error.to_string()),
        );
        CheckResult::new(device_id, check_name, false, details)
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn check_name(&self) -> CheckName {
        self.check_name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn is_execution_failure(&self) -> bool {
        !self.passed && self.details.contains_key(EXECUTION_ERROR_KEY)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.skipped {
            "SKIPPED"
        } else if self.passed {
            "PASSED"
        } else {
            "FAILED"
        };
        write!(f, "{} {} {}", self.device_id, self.check_name, verdict)
    }
}

/// Error types for netverify operations.
#[derive(Debug, Error)]
pub enum NetVerifyError {
    /// Device id not present in the model
    #[error("Device not found: {device_id}")]
    NotFound { device_id: String },

    /// Mutation not applicable to the device
    #[error("Invalid mutation for {device_id}: {reason}")]
    InvalidMutation { device_id: String, reason: String },

    /// Report was already finalized
    #[error("Run report already finalized")]
    AlreadyFinalized,

    /// Requested check name is not part of the battery
    #[error("Unknown check: '{name}'. Valid checks: connectivity, status, interface, alarm")]
    UnknownCheck { name: String },

    /// Snapshot violates a structural invariant
    #[error("Invalid device {device_id}: {reason}")]
    InvalidDevice { device_id: String, reason: String },

    /// Device id registered twice
    #[error("Duplicate device id: {device_id}")]
    DuplicateDevice { device_id: String },

    /// Inventory file could not be interpreted
    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },

    /// I/O error
    #[error("I/O error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetVerifyError>;

/// Configuration for one test run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Devices to test (None = every device in the model)
    pub devices: Option<Vec<String>>,
    /// Checks to run by name, in order (empty = default order)
    pub checks: Vec<String>,
    /// Run devices in parallel
    pub parallel: bool,
    /// Stop issuing checks after the first failure
    pub fail_fast: bool,
    /// Per-check time budget in milliseconds
    pub timeout_ms: u64,
    /// Devices tested concurrently when parallel
    pub max_parallel: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            devices: None,
            checks: Vec::new(),
            parallel: false,
            fail_fast: false,
            timeout_ms: 30000,
            max_parallel: 4,
        }
    }
}

impl RunConfig {
    /// Create configuration from command line arguments
    pub fn from_args(args: &Args) -> Self {
        RunConfig {
            devices: if args.device.is_empty() {
                None
            } else {
                Some(args.device.clone())
            },
            checks: args.check.clone(),
            parallel: args.parallel,
            fail_fast: args.fail_fast,
            timeout_ms: args.timeout_ms,
            max_parallel: args.max_parallel.max(1),
        }
    }

    fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            parallel: self.parallel,
            fail_fast: self.fail_fast,
            timeout_ms: self.timeout_ms,
            max_parallel: self.max_parallel.max(1),
        }
    }
}

/// Run the check battery against a device provider.
///
/// Devices named in the config but unknown to the provider are still run;
/// each of their checks records an execution failure.
///
/// # Example
///
/// ```no_run
/// use netverify::config::Inventory;
/// use netverify::device::DeviceModel;
/// use netverify::{run_suite, RunConfig};
///
/// let model = DeviceModel::from_inventory(&Inventory::default_lab()).unwrap();
/// let config = RunConfig {
///     checks: vec!["status".to_string(), "alarm".to_string()],
///     ..Default::default()
/// };
///
/// match run_suite(&model, &config) {
///     Ok(report) => println!("Failed: {}", report.totals().failed),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_suite(provider: &dyn DeviceProvider, config: &RunConfig) -> Result<RunReport> {
    let device_ids: BTreeSet<String> = match &config.devices {
        Some(ids) => ids.iter().cloned().collect(),
        None => provider.device_ids().into_iter().collect(),
    };

    let checks = config
        .checks
        .iter()
        .map(|name| name.parse::<CheckName>())
        .collect::<Result<Vec<_>>>()?;

    let runner = TestRunner::new(provider, config.orchestrator_config());
    runner.run(&device_ids, &checks)
}
