//! CLI integration tests.
//!
//! Tests for argument parsing and the run configuration built from it.

use clap::Parser;
use netverify::cli::args::{Args, Command, OutputFormat};
use netverify::{run_suite, NetVerifyError, RunConfig};

fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("netverify").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_default_args() {
    let args = parse(&[]);
    assert_eq!(args.command(), Command::Run);
    assert_eq!(args.format, OutputFormat::Text);
    assert!(!args.quiet);
    assert!(!args.verbose);
    assert!(!args.parallel);
    assert!(!args.fail_fast);
    assert!(!args.demo_faults);
    assert_eq!(args.timeout_ms, 30000);
    assert!(args.inventory.is_none());
}

#[test]
fn test_version_command() {
    assert_eq!(parse(&["version"]).command(), Command::Version);
}

#[test]
fn test_list_command() {
    assert_eq!(parse(&["list"]).command(), Command::List);
}

#[test]
fn test_options_after_subcommand() {
    let args = parse(&["run", "--format", "json", "--inventory", "lab.toml"]);
    assert_eq!(args.format, OutputFormat::Json);
    assert_eq!(args.inventory.unwrap().to_str(), Some("lab.toml"));
}

#[test]
fn test_log_format() {
    assert_eq!(parse(&["--format", "log"]).format, OutputFormat::Log);
}

#[test]
fn test_run_config_from_args() {
    let args = parse(&[
        "-d",
        "opt-1",
        "-c",
        "alarm",
        "--parallel",
        "--max-parallel",
        "0",
        "--fail-fast",
        "--timeout",
        "250",
    ]);
    let config = RunConfig::from_args(&args);
    assert_eq!(config.devices, Some(vec!["opt-1".to_string()]));
    assert_eq!(config.checks, vec!["alarm".to_string()]);
    assert!(config.parallel);
    assert!(config.fail_fast);
    assert_eq!(config.timeout_ms, 250);
    // Clamped so batching always makes progress
    assert_eq!(config.max_parallel, 1);
}

#[test]
fn test_no_devices_means_whole_inventory() {
    let config = RunConfig::from_args(&parse(&[]));
    assert!(config.devices.is_none());
    assert!(config.checks.is_empty());
}

#[test]
fn test_unknown_check_from_cli_is_error() {
    let args = parse(&["-c", "throughput"]);
    let config = RunConfig::from_args(&args);
    let model = netverify::device::DeviceModel::new();
    assert!(matches!(
        run_suite(&model, &config),
        Err(NetVerifyError::UnknownCheck { name }) if name == "throughput"
    ));
}

#[test]
fn test_invalid_timeout_rejected() {
    assert!(Args::try_parse_from(["netverify", "--timeout", "soon"]).is_err());
}
