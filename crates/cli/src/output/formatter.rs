//! Output formatter for human-readable and JSON output
//!
//! Ensures consistent output formatting across all commands. Rendering is
//! split from printing so the rendered text can be tested.

use std::time::Duration;

use comfy_table::{Cell, CellAlignment, Table, presets};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Timestamp;
use serde::Serialize;
use stow_core::{BucketInfo, BulkReport, BulkStatus, ObjectInfo, OperationOutcome, OutcomeStatus};

use super::OutputConfig;

/// Color theme for styled output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Success markers - green
    pub success: Style,
    /// Error markers - red
    pub error: Style,
    /// Warning and skipped markers - yellow
    pub warning: Style,
    /// Secondary details - dim
    pub detail: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Style::new().green(),
            error: Style::new().red(),
            warning: Style::new().yellow(),
            detail: Style::new().dim(),
        }
    }
}

impl Theme {
    /// Returns a theme with no styling (for no-color mode)
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
            detail: Style::new(),
        }
    }
}

/// JSON shape of a bulk command's result
#[derive(Debug, Serialize)]
struct BulkOutput<'a> {
    operation: &'a str,
    bucket: &'a str,
    #[serde(flatten)]
    report: &'a BulkReport,
}

/// Formatter for CLI output
///
/// Handles both human-readable and JSON output formats based on configuration.
/// When JSON mode is enabled, all output is strict JSON without colors or progress.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    theme: Theme,
}

impl Formatter {
    /// Create a new formatter with the given configuration
    pub fn new(config: OutputConfig) -> Self {
        let theme = if config.no_color || config.json {
            Theme::plain()
        } else {
            Theme::default()
        };
        Self { config, theme }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    // ========== Output methods ==========

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let checkmark = self.theme.success.apply_to("✓");
        println!("{checkmark} {message}");
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({
                "error": message
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            let cross = self.theme.error.apply_to("✗");
            eprintln!("{cross} {message}");
        }
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let warn_icon = self.theme.warning.apply_to("⚠");
        eprintln!("{warn_icon} {message}");
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }

    /// Spinner shown while a long call runs; hidden in JSON or quiet mode
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.config.json || self.config.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    // ========== Rendering ==========

    /// Print an outcome of a single-target command
    pub fn outcome(&self, verb: &str, outcome: &OperationOutcome) {
        if self.config.json {
            self.json(outcome);
            return;
        }
        match &outcome.status {
            OutcomeStatus::Success => self.success(&format!("{verb} {}", outcome.target)),
            OutcomeStatus::Failed { .. } => self.error(&self.render_failure(outcome)),
        }
    }

    /// Print a bulk report, failures on stderr
    pub fn report(&self, operation: &str, bucket: &str, report: &BulkReport) {
        if self.config.json {
            self.json(&BulkOutput {
                operation,
                bucket,
                report,
            });
            return;
        }

        if !self.is_quiet() {
            for target in &report.succeeded {
                println!("{} {}", self.theme.success.apply_to("✓"), target);
            }
        }
        for item in &report.failed {
            let cross = self.theme.error.apply_to("✗");
            eprintln!(
                "{cross} {}: {} {}",
                item.target,
                item.reason,
                self.theme
                    .detail
                    .apply_to(format!("({}, {} attempt(s))", item.kind, item.attempts))
            );
        }
        if !self.is_quiet() {
            for target in &report.skipped {
                println!("{} {} skipped", self.theme.warning.apply_to("-"), target);
            }
        }
        self.println(&self.render_summary(operation, report));
    }

    fn render_failure(&self, outcome: &OperationOutcome) -> String {
        match &outcome.status {
            OutcomeStatus::Success => outcome.target.to_string(),
            OutcomeStatus::Failed {
                kind,
                reason,
                attempts,
            } => format!(
                "{}: {reason} {}",
                outcome.target,
                self.theme
                    .detail
                    .apply_to(format!("({kind}, {attempts} attempt(s))"))
            ),
        }
    }

    /// One-line summary of a bulk call
    pub fn render_summary(&self, operation: &str, report: &BulkReport) -> String {
        let mut line = format!(
            "{operation}: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        if !report.skipped.is_empty() {
            line.push_str(&format!(", {} skipped", report.skipped.len()));
        }
        match report.status {
            BulkStatus::Completed => {}
            BulkStatus::Cancelled => line.push_str(" (cancelled)"),
            BulkStatus::Aborted => line.push_str(" (aborted: not authorized)"),
        }
        line
    }

    /// Table of buckets, oldest first as the store returns them
    pub fn render_buckets(&self, buckets: &[BucketInfo]) -> String {
        let mut table = self.table(&["CREATED", "REGION", "BUCKET"]);
        for info in buckets {
            table.add_row(vec![
                Cell::new(format_time(info.created)),
                Cell::new(info.region.as_deref().unwrap_or("-")),
                Cell::new(info.bucket.name()),
            ]);
        }
        table.to_string()
    }

    /// Table of objects with human-readable sizes
    pub fn render_objects(&self, objects: &[ObjectInfo]) -> String {
        let mut table = self.table(&["MODIFIED", "SIZE", "KEY"]);
        for info in objects {
            let size = info
                .size_bytes
                .map(|s| humansize::format_size(s.max(0) as u64, humansize::BINARY))
                .unwrap_or_else(|| "-".to_string());
            table.add_row(vec![
                Cell::new(format_time(info.last_modified)),
                Cell::new(size).set_alignment(CellAlignment::Right),
                Cell::new(info.key.key()),
            ]);
        }
        table.to_string()
    }

    fn table(&self, header: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING).set_header(header.to_vec());
        if !self.colors_enabled() {
            table.force_no_tty();
        }
        table
    }
}

fn format_time(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}
