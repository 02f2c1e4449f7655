//! Output formatting for netverify.
//!
//! Provides console, JSON, log-line, and JUnit XML renderings of a finalized
//! [`RunReport`].
//!
//! # Graceful Degradation
//!
//! - Non-TTY output: color disabled via NO_COLOR or --no-color
//! - Empty reports: valid output with zero results
//! - Unfinalized reports: rendered with whatever totals they carry
//!
//! All formatters produce valid output for any RunReport input.
//! No function in this module will panic.

use crate::cli::args::OutputFormat;
use crate::engine::classifier::{DefectEventKind, DefectKey};
use crate::engine::result::RunReport;
use crate::{timefmt, CheckResult, NetVerifyError, Result, EXECUTION_ERROR_KEY};
use std::fs;
use std::path::Path;

const RULE: &str = "--------------------------------------------------------------------------------";

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format a run report into a string
    fn format(&self, report: &RunReport) -> String;
}

/// Console (human-readable) formatter
pub struct ConsoleFormatter {
    color: bool,
    verbose: bool,
    quiet: bool,
}

impl ConsoleFormatter {
    pub fn new(color: bool, verbose: bool, quiet: bool) -> Self {
        ConsoleFormatter {
            color,
            verbose,
            quiet,
        }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.colorize(text, "32")
    }

    fn yellow(&self, text: &str) -> String {
        self.colorize(text, "33")
    }

    fn red(&self, text: &str) -> String {
        self.colorize(text, "31")
    }

    fn gray(&self, text: &str) -> String {
        self.colorize(text, "90")
    }

    fn result_line(&self, result: &CheckResult) -> String {
        let status = if result.is_skipped() {
            self.gray("[SKIP]")
        } else if result.passed() {
            self.green("[PASS]")
        } else if result.is_execution_failure() {
            self.yellow("[ERR ]")
        } else {
            self.red("[FAIL]")
        };

        let mut line = format!("  {} {}", status, result.check_name());
        if let Some(reason) = result.detail("skip_reason").and_then(|v| v.as_str()) {
            line.push_str(&format!(" ({})", reason));
        } else if let Some(error) = result.detail(EXECUTION_ERROR_KEY).and_then(|v| v.as_str()) {
            line.push_str(&format!(" ({})", error));
        }
        if self.verbose {
            line.push_str(&format!(" [{}ms]", result.duration_ms()));
        }
        line.push('\n');

        if self.verbose && !result.is_skipped() {
            for (key, value) in result.details() {
                line.push_str(&format!("         {}: {}\n", key, value));
            }
        }
        line
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str(RULE);
        output.push('\n');
        output.push_str("netverify test report\n");
        output.push_str(&format!("Started: {}\n", timefmt::format(&report.started_at())));
        if let Some(finished) = report.finished_at() {
            output.push_str(&format!("Finished: {}\n", timefmt::format(&finished)));
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        for device_id in report.device_ids() {
            let results: Vec<&CheckResult> = report
                .results_for(device_id)
                .filter(|r| !self.quiet || !r.passed())
                .collect();
            if results.is_empty() {
                continue;
            }

            output.push_str(&format!("DEVICE {}\n", device_id));
            for result in results {
                output.push_str(&self.result_line(result));
            }
            output.push('\n');
        }

        if !report.defects().is_empty() {
            output.push_str("DEFECTS\n");
            for defect in report.defects().values() {
                output.push_str(&format!(
                    "  {} | {} | {}/{} | x{}\n",
                    defect.defect_id,
                    self.red(&defect.severity.to_string()),
                    defect.device_id,
                    defect.check_name,
                    defect.occurrence_count
                ));
                output.push_str(&format!("    {}\n", defect.description));
            }
            output.push('\n');
        }

        let totals = report.totals();
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!(
            "SUMMARY: {} passed, {} failed, {} skipped ({} execution errors)\n",
            totals.passed, totals.failed, totals.skipped, totals.execution_errors
        ));
        output.push_str(&format!("Pass rate: {:.1}%\n", totals.pass_rate));

        let by_severity: Vec<String> = totals
            .by_severity
            .iter()
            .map(|(severity, count)| format!("{} {}", count, severity))
            .collect();
        if by_severity.is_empty() {
            output.push_str("Defects: none\n");
        } else {
            output.push_str(&format!(
                "Defects: {} ({})\n",
                report.defects().len(),
                by_severity.join(", ")
            ));
        }

        if let Some(ms) = report.duration_ms() {
            output.push_str(&format!("Total time: {:.1}s\n", ms as f64 / 1000.0));
        }

        let (exit_code, exit_desc) = if totals.failed > 0 {
            (1, "failures detected")
        } else {
            (0, "all checks passed")
        };
        output.push_str(&format!("Exit code: {} ({})\n", exit_code, exit_desc));
        output.push_str(RULE);

        output
    }
}

/// JSON formatter
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        JsonFormatter { pretty }
    }

    pub fn to_json(&self, report: &RunReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> String {
        self.to_json(report).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() }).to_string()
        })
    }
}

/// Write the pretty JSON rendering of `report` to `path`.
pub fn write_json_report(report: &RunReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = JsonFormatter::new(true).to_json(report)?;
    fs::write(path, json).map_err(|e| NetVerifyError::Io {
        context: format!("writing report {}", path.display()),
        source: e,
    })
}

/// Line-oriented formatter for the automation log.
///
/// One line per check result, then one per defect creation or update, in
/// the order the classifier applied them.
pub struct LogFormatter;

impl LogFormatter {
    pub fn new() -> Self {
        LogFormatter
    }

    pub fn lines(&self, report: &RunReport) -> Vec<String> {
        let mut lines = Vec::with_capacity(report.results().len() + report.defect_events().len());

        for result in report.results() {
            let (level, verdict) = if result.is_skipped() {
                ("INFO", "SKIPPED")
            } else if result.passed() {
                ("INFO", "PASSED")
            } else if result.is_execution_failure() {
                ("ERROR", "ERROR")
            } else {
                ("INFO", "FAILED")
            };
            lines.push(format!(
                "{} - {} - {} test for {}: {}",
                timefmt::format(&result.timestamp()),
                level,
                capitalize(result.check_name().as_str()),
                result.device_id(),
                verdict
            ));
        }

        for event in report.defect_events() {
            let at = timefmt::format(&event.at);
            let line = match event.kind {
                DefectEventKind::Created => {
                    let description = report
                        .defects()
                        .get(&DefectKey::new(event.device_id.clone(), event.check_name))
                        .map(|d| d.description.as_str())
                        .unwrap_or_default();
                    format!(
                        "{} - ERROR - Defect created: {} [{}] - {}",
                        at, event.defect_id, event.severity, description
                    )
                }
                DefectEventKind::Updated => format!(
                    "{} - WARNING - Defect updated: {} (occurrences: {})",
                    at, event.defect_id, event.occurrence_count
                ),
            };
            lines.push(line);
        }

        lines
    }
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for LogFormatter {
    fn format(&self, report: &RunReport) -> String {
        self.lines(report).join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// JUnit XML formatter, one testsuite per device
#[cfg(feature = "junit")]
pub struct JunitFormatter;

#[cfg(feature = "junit")]
impl JunitFormatter {
    pub fn new() -> Self {
        JunitFormatter
    }

    fn escape_xml(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '&' => result.push_str("&amp;"),
                '<' => result.push_str("&lt;"),
                '>' => result.push_str("&gt;"),
                '"' => result.push_str("&quot;"),
                '\'' => result.push_str("&apos;"),
                c => result.push(c),
            }
        }
        result
    }

    fn failure_message(result: &CheckResult) -> String {
        match result.detail(EXECUTION_ERROR_KEY).and_then(|v| v.as_str()) {
            Some(error) => error.to_string(),
            None => format!("{} check failed", result.check_name()),
        }
    }
}

#[cfg(feature = "junit")]
impl Default for JunitFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "junit")]
impl OutputFormatter for JunitFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let totals = report.totals();
        output.push_str(&format!(
            "<testsuites tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">\n",
            totals.total,
            totals.failed - totals.execution_errors,
            totals.execution_errors,
            totals.skipped,
            report.duration_ms().unwrap_or(0) as f64 / 1000.0
        ));

        for device_id in report.device_ids() {
            let results: Vec<&CheckResult> = report.results_for(device_id).collect();
            let errors = results.iter().filter(|r| r.is_execution_failure()).count();
            let failures = results.iter().filter(|r| !r.passed()).count() - errors;
            let skipped = results.iter().filter(|r| r.is_skipped()).count();
            let suite_time: u64 = results.iter().map(|r| r.duration_ms()).sum();

            output.push_str(&format!(
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">\n",
                Self::escape_xml(device_id),
                results.len(),
                failures,
                errors,
                skipped,
                suite_time as f64 / 1000.0
            ));

            for result in results {
                output.push_str(&format!(
                    "    <testcase name=\"{}\" classname=\"netverify.{}\" time=\"{:.3}\">\n",
                    result.check_name(),
                    Self::escape_xml(device_id),
                    result.duration_ms() as f64 / 1000.0
                ));

                if result.is_skipped() {
                    let reason = result
                        .detail("skip_reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default();
                    output.push_str(&format!(
                        "      <skipped message=\"{}\" />\n",
                        Self::escape_xml(reason)
                    ));
                } else if !result.passed() {
                    let tag = if result.is_execution_failure() { "error" } else { "failure" };
                    let details = serde_json::to_string(result.details()).unwrap_or_default();
                    output.push_str(&format!(
                        "      <{} message=\"{}\">{}</{}>\n",
                        tag,
                        Self::escape_xml(&Self::failure_message(result)),
                        Self::escape_xml(&details),
                        tag
                    ));
                }

                output.push_str("    </testcase>\n");
            }

            output.push_str("  </testsuite>\n");
        }

        output.push_str("</testsuites>");
        output
    }
}

/// Get a formatter based on the output format
pub fn get_formatter(
    format: OutputFormat,
    no_color: bool,
    verbose: bool,
    quiet: bool,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(ConsoleFormatter::new(!no_color, verbose, quiet)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Log => Box::new(LogFormatter::new()),
        #[cfg(feature = "junit")]
        OutputFormat::Junit => Box::new(JunitFormatter::new()),
    }
}
