//! Test runner.
//!
//! Runs the check battery against every requested device, classifies
//! failures, and finalizes the run report.
//!
//! # Graceful Degradation
//!
//! A run is never aborted by a device:
//! - Snapshot fetch failure (unknown device or provider panic): execution
//!   failure result
//! - Check panics: caught via std::panic::catch_unwind, execution failure result
//! - Check timeout: execution failure result once the budget is exceeded
//! - Cancellation or fail_fast: remaining checks are not issued, the partial
//!   report is still finalized
//!
//! Fail-fast state belongs to one run. The external cancel token is the
//! caller's and is never reset by the runner.
//!
//! Only an unregistered check name is a hard error.
//!
//! # Ordering
//!
//! Checks for one device always run sequentially in the requested order.
//! Devices run in batches of `max_parallel` scoped threads when parallel is
//! enabled. Results are recorded in device id order either way.

use crate::checks;
use crate::device::{Capability, DeviceProvider, DeviceSnapshot};
use crate::engine::classifier::DefectClassifier;
use crate::engine::result::{ReportAggregator, RunReport};
use crate::{CheckName, CheckResult, NetVerifyError, Result};
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub parallel: bool,
    pub fail_fast: bool,
    pub timeout_ms: u64,
    pub max_parallel: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            parallel: false,
            fail_fast: false,
            timeout_ms: 30000,
            max_parallel: 4,
        }
    }
}

/// Boxed check body. Registered checks may capture state, unlike [`checks::CheckFn`].
pub type BoxedCheck = Box<dyn Fn(&DeviceSnapshot) -> CheckResult + Send + Sync>;

/// A registered check with its execution function
pub struct RegisteredCheck {
    pub name: CheckName,
    pub description: String,
    pub capability: Capability,
    pub check_fn: BoxedCheck,
}

impl RegisteredCheck {
    pub fn new(name: CheckName, description: impl Into<String>, check_fn: BoxedCheck) -> Self {
        RegisteredCheck {
            name,
            description: description.into(),
            capability: name.required_capability(),
            check_fn,
        }
    }
}

/// Create the standard battery with its execution functions
pub fn create_all_checks() -> Vec<RegisteredCheck> {
    CheckName::ALL
        .into_iter()
        .map(|name| {
            let description = match name {
                CheckName::Connectivity => "Verify reachability probe and management port",
                CheckName::Status => "Check CPU, memory, temperature, and uptime bounds",
                CheckName::Interface => "Verify admin-up interfaces are operationally up",
                CheckName::Alarm => "Verify no Critical or Major alarm is raised",
            };
            RegisteredCheck::new(name, description, Box::new(checks::check_fn(name)))
        })
        .collect()
}

/// Stops further checks from being issued. Checks already running complete.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives the check battery against a device provider.
pub struct TestRunner<'a> {
    provider: &'a dyn DeviceProvider,
    config: OrchestratorConfig,
    checks: Vec<RegisteredCheck>,
    cancel: CancelToken,
}

impl<'a> TestRunner<'a> {
    /// Create a runner with the standard battery registered
    pub fn new(provider: &'a dyn DeviceProvider, config: OrchestratorConfig) -> Self {
        TestRunner {
            provider,
            config,
            checks: create_all_checks(),
            cancel: CancelToken::new(),
        }
    }

    /// Register a check, replacing any check with the same name
    pub fn register_check(&mut self, check: RegisteredCheck) {
        match self.checks.iter_mut().find(|c| c.name == check.name) {
            Some(existing) => *existing = check,
            None => self.checks.push(check),
        }
    }

    pub fn registered(&self) -> impl Iterator<Item = &RegisteredCheck> {
        self.checks.iter()
    }

    /// Handle for stopping the run from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run checks by name. Unknown names fail before anything executes.
    pub fn run_named(&self, device_ids: &BTreeSet<String>, names: &[&str]) -> Result<RunReport> {
        let checks = names
            .iter()
            .map(|name| name.parse::<CheckName>())
            .collect::<Result<Vec<_>>>()?;
        self.run(device_ids, &checks)
    }

    /// Run `checks` (default battery order when empty) against every device.
    pub fn run(&self, device_ids: &BTreeSet<String>, checks: &[CheckName]) -> Result<RunReport> {
        let checks: Vec<&RegisteredCheck> = if checks.is_empty() {
            CheckName::ALL
                .iter()
                .filter_map(|name| self.find(*name))
                .collect()
        } else {
            checks
                .iter()
                .map(|name| {
                    self.find(*name).ok_or_else(|| NetVerifyError::UnknownCheck {
                        name: name.to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        info!(
            devices = device_ids.len(),
            checks = checks.len(),
            parallel = self.config.parallel,
            "starting test run"
        );

        let classifier = DefectClassifier::new();
        let stop = CancelToken::new();
        let mut aggregator = ReportAggregator::new();
        let ids: Vec<&str> = device_ids.iter().map(String::as_str).collect();

        let per_device = if self.config.parallel {
            self.run_parallel(&ids, &checks, &classifier, &stop)
        } else {
            ids.iter()
                .map(|id| self.run_device(id, &checks, &classifier, &stop))
                .collect()
        };

        for result in per_device.into_iter().flatten() {
            aggregator.add_result(result)?;
        }

        let (defects, events) = classifier.into_parts();
        aggregator.add_defects(defects, events)?;
        let report = aggregator.finalize()?;

        let totals = report.totals();
        info!(
            passed = totals.passed,
            failed = totals.failed,
            skipped = totals.skipped,
            defects = report.defects().len(),
            "test run finished"
        );
        Ok(report)
    }

    fn find(&self, name: CheckName) -> Option<&RegisteredCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    fn stopped(&self, stop: &CancelToken) -> bool {
        self.cancel.is_cancelled() || stop.is_cancelled()
    }

    /// Run devices in batches of `max_parallel` scoped threads
    fn run_parallel(
        &self,
        device_ids: &[&str],
        checks: &[&RegisteredCheck],
        classifier: &DefectClassifier,
        stop: &CancelToken,
    ) -> Vec<Vec<CheckResult>> {
        let mut per_device = Vec::with_capacity(device_ids.len());

        for batch in device_ids.chunks(self.config.max_parallel.max(1)) {
            if self.stopped(stop) {
                break;
            }

            let results: Vec<Vec<CheckResult>> = thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|id| (*id, s.spawn(move || self.run_device(id, checks, classifier, stop))))
                    .collect();

                handles
                    .into_iter()
                    .map(|(id, h)| match h.join() {
                        Ok(results) => results,
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            warn!(device = id, panic = %message, "device worker panicked");
                            self.worker_failures(id, checks, classifier, &message)
                        }
                    })
                    .collect()
            });

            per_device.extend(results);
        }

        per_device
    }

    /// Execution failures for every check of a device whose worker died
    fn worker_failures(
        &self,
        device_id: &str,
        checks: &[&RegisteredCheck],
        classifier: &DefectClassifier,
        message: &str,
    ) -> Vec<CheckResult> {
        checks
            .iter()
            .map(|check| {
                let result = CheckResult::execution_failure(
                    device_id,
                    check.name,
                    format!("Device worker panicked: {}", message),
                );
                classifier.classify(&result);
                result
            })
            .collect()
    }

    /// Run every check for one device, in order
    fn run_device(
        &self,
        device_id: &str,
        checks: &[&RegisteredCheck],
        classifier: &DefectClassifier,
        stop: &CancelToken,
    ) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(checks.len());

        for check in checks {
            if self.stopped(stop) {
                debug!(device = device_id, check = %check.name, "run cancelled, check not issued");
                break;
            }

            let result = self.execute_check(device_id, check);
            debug!(
                device = device_id,
                check = %check.name,
                passed = result.passed(),
                skipped = result.is_skipped(),
                duration_ms = result.duration_ms(),
                "check completed"
            );

            if !result.passed() {
                classifier.classify(&result);
                if self.config.fail_fast {
                    info!(device = device_id, check = %check.name, "fail-fast: stopping run");
                    stop.cancel();
                }
            }
            results.push(result);
        }

        results
    }

    /// Execute a single check with panic and timeout handling
    fn execute_check(&self, device_id: &str, check: &RegisteredCheck) -> CheckResult {
        let start = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.provider.get_snapshot(device_id).map(|snapshot| {
                let result = (check.check_fn)(&snapshot);
                if check.name == CheckName::Alarm && !result.is_skipped() {
                    log_active_alarms(&snapshot);
                }
                result
            })
        }));
        let elapsed = elapsed_ms(start);

        let result = match outcome {
            Ok(Err(e)) => {
                warn!(device = device_id, check = %check.name, error = %e, "snapshot unavailable");
                CheckResult::execution_failure(device_id, check.name, e)
            }
            Ok(Ok(result)) if elapsed > self.config.timeout_ms => {
                warn!(device = device_id, check = %check.name, elapsed, "check timed out");
                drop(result);
                CheckResult::execution_failure(
                    device_id,
                    check.name,
                    format!(
                        "Check timed out after {}ms (limit {}ms)",
                        elapsed, self.config.timeout_ms
                    ),
                )
            }
            Ok(Ok(result)) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(device = device_id, check = %check.name, panic = %message, "check panicked");
                CheckResult::execution_failure(
                    device_id,
                    check.name,
                    format!("Check panicked during execution: {}", message),
                )
            }
        };

        result.with_duration(elapsed)
    }
}

/// One line per raised alarm, whatever its severity
fn active_alarm_messages(snapshot: &DeviceSnapshot) -> Vec<(&str, String)> {
    snapshot
        .alarms
        .values()
        .map(|alarm| {
            (
                alarm.code.as_str(),
                format!("Active alarm on {}: {}", snapshot.device_id, alarm.message),
            )
        })
        .collect()
}

fn log_active_alarms(snapshot: &DeviceSnapshot) {
    for (code, message) in active_alarm_messages(snapshot) {
        warn!(device = %snapshot.device_id, code, "{}", message);
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
