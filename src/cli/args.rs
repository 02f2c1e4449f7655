//! Command line arguments for netverify.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Subcommand)]
pub enum Command {
    /// Run the check battery (default)
    #[default]
    Run,
    /// List the available checks and inventory devices
    List,
    /// Print version information
    Version,
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
    /// JUnit XML for CI/CD integration
    #[cfg(feature = "junit")]
    Junit,
    /// One line per result and defect event
    Log,
}

/// Parsed command line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "netverify",
    bin_name = "netverify",
    about = "Test orchestration and defect classification for simulated network devices",
    disable_version_flag = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Device inventory file (TOML or JSON); the built-in lab is used otherwise
    #[arg(long, short = 'i', global = true)]
    pub inventory: Option<PathBuf>,

    /// Device to test (repeatable; default: every inventory device)
    #[arg(long, short = 'd', global = true)]
    pub device: Vec<String>,

    /// Check to run, in order (repeatable; default: the full battery)
    #[arg(long, short = 'c', global = true)]
    pub check: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// JSON report file
    #[arg(long, default_value = "test_report.json", global = true)]
    pub output: PathBuf,

    /// Log file the run's result lines are appended to
    #[arg(long, default_value = "test_automation.log", global = true)]
    pub log_file: PathBuf,

    /// Do not write the JSON report or the log file
    #[arg(long, global = true)]
    pub no_report: bool,

    /// Only output failures
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Include per-check details and debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Per-check time budget in milliseconds
    #[arg(long = "timeout", default_value_t = 30000, global = true)]
    pub timeout_ms: u64,

    /// Run devices in parallel
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Devices tested concurrently with --parallel
    #[arg(long, default_value_t = 4, global = true)]
    pub max_parallel: usize,

    /// Stop issuing checks after the first failure
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Inject the demo fault set before running
    #[arg(long, global = true)]
    pub demo_faults: bool,
}

impl Args {
    /// Subcommand to run, defaulting to `run`
    pub fn command(&self) -> Command {
        self.command.unwrap_or_default()
    }
}

impl Default for Args {
    fn default() -> Self {
        Args {
            command: None,
            inventory: None,
            device: Vec::new(),
            check: Vec::new(),
            format: OutputFormat::Text,
            output: PathBuf::from("test_report.json"),
            log_file: PathBuf::from("test_automation.log"),
            no_report: false,
            quiet: false,
            verbose: false,
            no_color: false,
            timeout_ms: 30000,
            parallel: false,
            max_parallel: 4,
            fail_fast: false,
            demo_faults: false,
        }
    }
}
