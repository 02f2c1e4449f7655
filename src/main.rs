//! netverify CLI entry point
//!
//! Runs the verification battery against a simulated device lab and writes
//! the console, JSON, and log renderings of the run.

use anyhow::{Context, Result};
use clap::Parser;
use netverify::cli::args::{Args, Command};
use netverify::cli::output::{get_formatter, write_json_report, LogFormatter};
use netverify::config::Inventory;
use netverify::device::{Capability, DeviceModel, Mutation};
use netverify::engine::orchestrator::create_all_checks;
use netverify::version::get_build_info;
use netverify::{run_suite, RunConfig, Severity};
use std::fs::OpenOptions;
use std::io::Write;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command() {
        Command::Version => {
            println!("{}", get_build_info());
            ExitCode::SUCCESS
        }
        Command::List => match print_list(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(3)
            }
        },
        Command::Run => match execute(&args) {
            Ok(true) => ExitCode::from(1),
            Ok(false) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error running checks: {:#}", e);
                ExitCode::from(3)
            }
        },
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "netverify=debug" } else { "netverify=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inventory(args: &Args) -> Inventory {
    match &args.inventory {
        Some(path) => match Inventory::load(path) {
            Ok(inventory) => {
                info!(path = %path.display(), devices = inventory.len(), "loaded inventory");
                inventory
            }
            Err(e) => {
                warn!(error = %e, "falling back to the built-in lab inventory");
                Inventory::default_lab()
            }
        },
        None => Inventory::default_lab(),
    }
}

/// Take down each device's last interface and raise the matching alarm.
fn inject_demo_faults(model: &DeviceModel) -> Result<()> {
    for device_id in model.device_ids() {
        let snapshot = model.get_snapshot(&device_id)?;
        if !snapshot.exposes(Capability::Interfaces) {
            continue;
        }
        let Some(last) = snapshot.interfaces.last().map(|i| i.name.clone()) else {
            continue;
        };

        model.perturb(
            &device_id,
            Mutation::SetOperState {
                interface: last.clone(),
                up: false,
            },
        )?;
        if snapshot.exposes(Capability::Alarms) {
            model.perturb(
                &device_id,
                Mutation::RaiseAlarm {
                    code: format!("LINK-DOWN-{}", last),
                    severity: Severity::Minor,
                    message: format!("Interface {} down", last),
                },
            )?;
        }
        info!(device = %device_id, interface = %last, "demo fault injected");
    }
    Ok(())
}

/// Run the battery. Returns whether any check failed.
fn execute(args: &Args) -> Result<bool> {
    let inventory = load_inventory(args);
    let model = DeviceModel::from_inventory(&inventory).context("building device model")?;

    if args.demo_faults {
        inject_demo_faults(&model).context("injecting demo faults")?;
    }

    let config = RunConfig::from_args(args);
    let report = run_suite(&model, &config)?;

    let no_color = args.no_color || std::env::var_os("NO_COLOR").is_some();
    let formatter = get_formatter(args.format, no_color, args.verbose, args.quiet);
    println!("{}", formatter.format(&report));

    if !args.no_report {
        write_json_report(&report, &args.output)?;
        info!(path = %args.output.display(), "test report saved");

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("opening log file {}", args.log_file.display()))?;
        for line in LogFormatter::new().lines(&report) {
            writeln!(log, "{}", line)
                .with_context(|| format!("writing log file {}", args.log_file.display()))?;
        }
    }

    Ok(report.has_failures())
}

fn print_list(args: &Args) -> Result<()> {
    println!("Available checks:");
    for check in create_all_checks() {
        println!("  {:<14} {}", check.name.as_str(), check.description);
    }

    println!();
    println!("Inventory devices:");
    let inventory = load_inventory(args);
    for (device_id, spec) in inventory.devices() {
        println!(
            "  {:<20} {:<20} {}:{} ({} interfaces)",
            device_id,
            spec.kind.to_string(),
            spec.address,
            spec.management_port(),
            spec.interface_count()
        );
    }
    Ok(())
}
