//! Output integration tests.
//!
//! Tests for report rendering and the files a run writes.

use crate::mocks::*;
use netverify::cli::args::OutputFormat;
use netverify::cli::output::{get_formatter, write_json_report, JsonFormatter, LogFormatter};
use netverify::config::Inventory;
use netverify::engine::orchestrator::{OrchestratorConfig, TestRunner};
use netverify::{run_suite, CheckName, RunConfig, RunReport};
use std::collections::BTreeSet;
use std::fs;

fn degraded_run() -> RunReport {
    let provider = standard_lab();
    let device_ids: BTreeSet<String> = ["opt-1", "mw-1"].iter().map(|s| s.to_string()).collect();
    TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&device_ids, &[])
        .unwrap()
}

#[test]
fn test_write_json_report_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_report.json");
    let report = degraded_run();

    write_json_report(&report, &path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["totals"]["total"], 8);
    assert_eq!(value["totals"]["passed"], 5);
    assert_eq!(value["totals"]["failed"], 3);
    assert_eq!(value["totals"]["by_severity"]["critical"], 1);
    assert_eq!(value["totals"]["by_severity"]["major"], 2);
    assert_eq!(value["results"].as_array().unwrap().len(), 8);
    assert_eq!(value["defects"].as_object().unwrap().len(), 3);
    assert_eq!(value["defect_events"].as_array().unwrap().len(), 3);
    assert_eq!(value["results"][0]["device_id"], "mw-1");
    assert_eq!(value["results"][0]["check_name"], "connectivity");
}

#[test]
fn test_write_json_report_bad_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("report.json");
    let err = write_json_report(&degraded_run(), &path).unwrap_err();
    assert!(err.to_string().contains("writing report"));
}

#[test]
fn test_json_timestamps_are_fixed_width() {
    let json = JsonFormatter::new(false).to_json(&degraded_run()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    for result in value["results"].as_array().unwrap() {
        let ts = result["timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), 24, "unexpected timestamp {}", ts);
        assert!(ts.ends_with('Z'));
    }
}

#[test]
fn test_log_lines_cover_results_and_defects() {
    let report = degraded_run();
    let lines = LogFormatter::new().lines(&report);

    assert_eq!(lines.len(), report.results().len() + report.defect_events().len());
    assert_eq!(lines.iter().filter(|l| l.contains("Defect created")).count(), 3);
    assert!(lines.iter().any(|l| l.contains("Alarm test for opt-1: FAILED")));
    assert!(lines.iter().any(|l| l.contains("[CRITICAL]")));
}

#[test]
fn test_log_lines_record_updates() {
    let provider = standard_lab();
    let device_ids: BTreeSet<String> = std::iter::once("opt-1".to_string()).collect();
    let report = TestRunner::new(&provider, OrchestratorConfig::default())
        .run(&device_ids, &[CheckName::Status, CheckName::Status])
        .unwrap();

    let lines = LogFormatter::new().lines(&report);
    assert!(lines.last().unwrap().contains("WARNING - Defect updated: DEF-0001 (occurrences: 2)"));
}

#[test]
fn test_every_format_renders_empty_run() {
    let provider = MockProvider::new();
    let report = run_suite(&provider, &RunConfig::default()).unwrap();
    let mut formats = vec![OutputFormat::Text, OutputFormat::Json, OutputFormat::Log];
    #[cfg(feature = "junit")]
    formats.push(OutputFormat::Junit);
    for format in formats {
        // Rendering must not panic on an empty run
        let _ = get_formatter(format, true, false, false).format(&report);
    }
}

#[test]
fn test_inventory_file_roundtrip_through_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lab.toml");
    fs::write(
        &path,
        r#"
        [devices.edge-mw]
        kind = "microwave_radio"
        address = "10.1.0.7"
        expected_interfaces = 3
        "#,
    )
    .unwrap();

    let inventory = Inventory::load(&path).unwrap();
    let model = netverify::device::DeviceModel::from_inventory(&inventory).unwrap();
    let report = run_suite(&model, &RunConfig::default()).unwrap();
    assert_eq!(report.totals().passed, 4);
    assert_eq!(report.device_ids(), vec!["edge-mw"]);
}

#[test]
fn test_json_inventory_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lab.json");
    fs::write(
        &path,
        r#"{"core-opt": {"type": "optical_transponder", "ip": "10.1.0.8"}}"#,
    )
    .unwrap();
    let inventory = Inventory::load(&path).unwrap();
    assert_eq!(inventory.device_ids(), vec!["core-opt".to_string()]);
}

#[test]
fn test_missing_inventory_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Inventory::load(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, netverify::NetVerifyError::Io { .. }));
}
