//! Full run integration tests.
//!
//! Tests for complete runs, including orchestration, defect classification,
//! fail-fast behavior, and result aggregation.

use crate::mocks::*;
use netverify::config::Inventory;
use netverify::device::{Capability, DeviceModel, DeviceProvider, DeviceSnapshot, Metric, Mutation};
use netverify::engine::orchestrator::{OrchestratorConfig, RegisteredCheck, TestRunner};
use netverify::engine::result::finalize;
use netverify::{run_suite, CheckName, CheckResult, NetVerifyError, RunConfig, Severity};
use std::collections::BTreeSet;

fn ids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_degraded_optical_scenario() {
    let provider = standard_lab();
    let report = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&ids(&["opt-1"]), &[])
        .unwrap();

    let totals = report.totals();
    assert_eq!(totals.passed, 1);
    assert_eq!(totals.failed, 3);
    assert_eq!(totals.by_severity.get(&Severity::Critical), Some(&1));
    assert_eq!(totals.by_severity.get(&Severity::Major), Some(&2));
    assert_eq!(totals.by_severity.len(), 2);

    assert_eq!(report.defect("opt-1", CheckName::Status).unwrap().severity, Severity::Major);
    assert_eq!(report.defect("opt-1", CheckName::Interface).unwrap().severity, Severity::Major);
    assert_eq!(report.defect("opt-1", CheckName::Alarm).unwrap().severity, Severity::Critical);
    assert!(report.defect("opt-1", CheckName::Connectivity).is_none());

    let interface = report.defect("opt-1", CheckName::Interface).unwrap();
    assert!(interface.description.contains("eth1"));
    assert_eq!(interface.occurrence_count, 1);
    assert_eq!(interface.assigned_to, "verification_team");
}

#[test]
fn test_nominal_radio_scenario() {
    let provider = standard_lab();
    let report = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&ids(&["mw-1"]), &[])
        .unwrap();

    assert_eq!(report.totals().passed, 4);
    assert_eq!(report.totals().failed, 0);
    assert!(report.defects().is_empty());
    assert!(report.defect_events().is_empty());
    assert!((report.totals().pass_rate - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_results_ordered_by_device_then_check() {
    let provider = standard_lab();
    let report = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&ids(&["opt-1", "mw-1"]), &[])
        .unwrap();

    let order: Vec<(&str, CheckName)> = report
        .results()
        .iter()
        .map(|r| (r.device_id(), r.check_name()))
        .collect();
    let mut expected = Vec::new();
    for device in ["mw-1", "opt-1"] {
        for check in CheckName::ALL {
            expected.push((device, check));
        }
    }
    assert_eq!(order, expected);
}

#[test]
fn test_unknown_device_records_execution_failures() {
    let provider = standard_lab();
    let report = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&ids(&["ghost"]), &[])
        .unwrap();

    assert_eq!(report.results().len(), CheckName::ALL.len());
    for result in report.results() {
        assert!(!result.passed());
        assert!(result.is_execution_failure());
        let error = result.detail("execution_error").unwrap().as_str().unwrap();
        assert!(error.contains("ghost"));
    }
    assert_eq!(report.totals().execution_errors, 4);
    assert_eq!(report.totals().by_severity.get(&Severity::Critical), Some(&4));
}

#[test]
fn test_snapshot_fetched_once_per_check() {
    let provider = standard_lab();
    TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&ids(&["opt-1", "mw-1"]), &[])
        .unwrap();
    assert_eq!(provider.fetch_count(), 8);
}

#[test]
fn test_vanished_device_does_not_abort_run() {
    let provider = standard_lab().with_vanished_device("opt-2");
    let report = run_suite(&provider, &RunConfig::default()).unwrap();

    assert_eq!(report.results().len(), 12);
    assert_eq!(report.results_for("opt-2").filter(|r| r.is_execution_failure()).count(), 4);
    assert_eq!(report.results_for("mw-1").filter(|r| r.passed()).count(), 4);
}

#[test]
fn test_panicking_provider_does_not_abort_run() {
    let provider = MockProvider::new()
        .with_panicking_device("bad")
        .with_device(nominal_radio("mw-1"));

    for parallel in [false, true] {
        let config = OrchestratorConfig {
            parallel,
            ..Default::default()
        };
        let report = TestRunner::new(&provider, config)
            .run(&ids(&["bad", "mw-1"]), &[])
            .unwrap();

        assert_eq!(report.results().len(), 8, "parallel={}", parallel);
        let bad: Vec<&CheckResult> = report.results_for("bad").collect();
        assert_eq!(bad.len(), 4);
        assert!(bad.iter().all(|r| r.is_execution_failure()));
        let error = bad[0].detail(netverify::EXECUTION_ERROR_KEY).unwrap().as_str().unwrap();
        assert!(error.contains("management agent crashed"));
        assert!(report.results_for("mw-1").all(|r| r.passed()));
        assert_eq!(report.defects().len(), 4);
    }
}

#[test]
fn test_reduced_capability_device_skips() {
    let provider = MockProvider::new().with_device(reduced_radio(
        "mw-lite",
        &[Capability::Connectivity, Capability::Status],
    ));
    let report = run_suite(&provider, &RunConfig::default()).unwrap();

    assert_eq!(report.totals().passed, 2);
    assert_eq!(report.totals().skipped, 2);
    assert_eq!(report.totals().failed, 0);
    assert!(report.defects().is_empty());
    let skipped: Vec<CheckName> = report
        .results()
        .iter()
        .filter(|r| r.is_skipped())
        .map(|r| r.check_name())
        .collect();
    assert_eq!(skipped, vec![CheckName::Interface, CheckName::Alarm]);
}

#[test]
fn test_repeated_failures_within_run_deduplicate() {
    let provider = standard_lab();
    let report = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&ids(&["opt-1"]), &[CheckName::Interface, CheckName::Interface])
        .unwrap();

    assert_eq!(report.results().len(), 2);
    assert_eq!(report.defects().len(), 1);
    let defect = report.defect("opt-1", CheckName::Interface).unwrap();
    assert_eq!(defect.occurrence_count, 2);
    assert_eq!(report.defect_events().len(), 2);
}

#[test]
fn test_separate_runs_restart_defect_ids() {
    let provider = standard_lab();
    let runner = TestRunner::new(&provider, OrchestratorConfig::default());
    let first = runner.run(&ids(&["opt-1"]), &[CheckName::Alarm]).unwrap();
    let second = runner.run(&ids(&["opt-1"]), &[CheckName::Alarm]).unwrap();

    let a = first.defect("opt-1", CheckName::Alarm).unwrap();
    let b = second.defect("opt-1", CheckName::Alarm).unwrap();
    assert_eq!(a.defect_id, "DEF-0001");
    assert_eq!(b.defect_id, "DEF-0001");
    assert_eq!(b.occurrence_count, 1);
}

#[test]
fn test_fail_fast_keeps_partial_report() {
    let provider = standard_lab();
    let config = OrchestratorConfig {
        fail_fast: true,
        ..Default::default()
    };
    // mw-1 runs first and passes; opt-1 fails at status
    let report = TestRunner::new(&provider, config)
        .run(&ids(&["mw-1", "opt-1"]), &[])
        .unwrap();

    assert_eq!(report.results().len(), 6);
    assert_eq!(report.totals().failed, 1);
    assert!(report.is_finalized());
}

#[test]
fn test_parallel_run_matches_sequential() {
    let mut provider = MockProvider::new();
    for i in 0..6 {
        provider = provider.with_device(nominal_radio(&format!("mw-{}", i)));
        provider = provider.with_device(degraded_optical(&format!("opt-{}", i)));
    }
    let device_ids: BTreeSet<String> = provider.device_ids().into_iter().collect();

    let sequential = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&device_ids, &[])
        .unwrap();
    let parallel = TestRunner::new(
        &provider,
        OrchestratorConfig {
            parallel: true,
            max_parallel: 4,
            ..Default::default()
        },
    )
    .run(&device_ids, &[])
    .unwrap();

    let summary = |r: &CheckResult| (r.device_id().to_string(), r.check_name(), r.passed());
    assert_eq!(
        sequential.results().iter().map(summary).collect::<Vec<_>>(),
        parallel.results().iter().map(summary).collect::<Vec<_>>()
    );
    assert_eq!(parallel.defects().len(), 18);
    let mut defect_ids: Vec<&str> = parallel.defects().values().map(|d| d.defect_id.as_str()).collect();
    defect_ids.sort();
    defect_ids.dedup();
    assert_eq!(defect_ids.len(), 18);
}

#[test]
fn test_custom_check_replaces_builtin() {
    let provider = standard_lab();
    let mut runner = TestRunner::new(&provider, OrchestratorConfig::default());
    runner.register_check(RegisteredCheck::new(
        CheckName::Alarm,
        "always passes",
        Box::new(|snapshot: &DeviceSnapshot| {
            CheckResult::new(snapshot.device_id.clone(), CheckName::Alarm, true, Default::default())
        }),
    ));
    let report = runner.run(&ids(&["opt-1"]), &[CheckName::Alarm]).unwrap();
    assert!(report.results()[0].passed());
}

#[test]
fn test_finalized_report_rejects_second_finalize() {
    let provider = standard_lab();
    let mut report = run_suite(&provider, &RunConfig::default()).unwrap();
    assert!(report.is_finalized());
    assert!(matches!(finalize(&mut report), Err(NetVerifyError::AlreadyFinalized)));
}

#[test]
fn test_model_perturbation_drives_defects() {
    let model = DeviceModel::from_inventory(&Inventory::default_lab()).unwrap();
    model
        .perturb(
            "microwave_device_1",
            Mutation::ShiftMetric {
                metric: Metric::CpuPct,
                delta: 80.0,
            },
        )
        .unwrap();
    model
        .perturb("optical_device_1", Mutation::SetPortOpen(false))
        .unwrap();

    let report = run_suite(&model, &RunConfig::default()).unwrap();
    let status = report.defect("microwave_device_1", CheckName::Status).unwrap();
    // 15.2 + 80 = 95.2 is past the Major threshold
    assert_eq!(status.severity, Severity::Major);
    let connectivity = report.defect("optical_device_1", CheckName::Connectivity).unwrap();
    assert_eq!(connectivity.severity, Severity::Critical);
    assert_eq!(report.defects().len(), 2);
}

#[test]
fn test_invalid_mutation_leaves_device_unchanged() {
    let model = DeviceModel::from_inventory(&Inventory::default_lab()).unwrap();
    let before = model.get_snapshot("microwave_device_1").unwrap();
    let err = model
        .perturb(
            "microwave_device_1",
            Mutation::SetOperState {
                interface: "eth9".to_string(),
                up: false,
            },
        )
        .unwrap_err();
    assert!(matches!(err, NetVerifyError::InvalidMutation { .. }));
    assert_eq!(model.get_snapshot("microwave_device_1").unwrap(), before);
}
