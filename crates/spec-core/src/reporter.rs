//! Textual report output: the tree, the failure list and the summary line.

use std::fmt::Write as _;
use std::io::{self, Write};

use colored::Colorize;

use crate::report::{FailureRecord, RunReport, Summary};

/// Reporter configuration.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Show verbose output (failure locations).
    pub verbose: bool,
    /// Use colors in output.
    pub color: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            color: true,
        }
    }
}

/// Renders run reports for a terminal.
#[derive(Debug, Clone)]
pub struct Reporter {
    config: ReporterConfig,
}

impl Reporter {
    #[must_use]
    pub const fn new(config: ReporterConfig) -> Self {
        Self { config }
    }

    /// A reporter producing plain text.
    #[must_use]
    pub const fn plain() -> Self {
        Self::new(ReporterConfig {
            verbose: false,
            color: false,
        })
    }

    /// Tree, blank line, failure list when anything did not pass, summary line.
    #[must_use]
    pub fn render(&self, report: &RunReport) -> String {
        let mut out = String::new();
        for line in report.tree.lines() {
            if self.config.color && line.ends_with(" FAILED") {
                let _ = writeln!(out, "{}", line.red());
            } else {
                let _ = writeln!(out, "{line}");
            }
        }
        out.push('\n');

        if !report.failures.is_empty() {
            let _ = writeln!(out, "{}", self.paint_heading("FAILURES:"));
            for failure in &report.failures {
                self.render_failure(&mut out, failure);
            }
            out.push('\n');
        }
        let _ = writeln!(out, "{}", self.paint_summary(&report.summary));
        out
    }

    fn render_failure(&self, out: &mut String, failure: &FailureRecord) {
        let heading = failure.heading();
        let heading = if self.config.color {
            heading.red().to_string()
        } else {
            heading
        };
        let _ = writeln!(out, "  {}) {heading}", failure.index);

        let trail = format!("trail: {}", failure.trail_text());
        if self.config.color {
            let _ = writeln!(out, "     {}", trail.dimmed());
        } else {
            let _ = writeln!(out, "     {trail}");
        }
        if let Some(location) = &failure.location {
            let _ = writeln!(out, "     at {location}");
        }
    }

    fn paint_heading(&self, text: &str) -> String {
        if self.config.color {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// `<ok> ok, <failed> failed, <errors> errors.`, green or red.
    #[must_use]
    pub fn paint_summary(&self, summary: &Summary) -> String {
        let text = summary.to_string();
        match (self.config.color, summary.passed()) {
            (false, _) => text,
            (true, true) => text.green().to_string(),
            (true, false) => text.red().to_string(),
        }
    }

    /// Print a report to stdout.
    pub fn report(&self, report: &RunReport) {
        print!("{}", self.render(report));
        self.flush();
    }

    /// Print a section header (a spec file path) before its report.
    pub fn heading(&self, text: &str) {
        if self.config.color {
            println!("{}", text.bold());
        } else {
            println!("{text}");
        }
    }

    /// Print a message only in verbose mode.
    pub fn verbose(&self, message: &str) {
        if self.config.verbose {
            println!("  {message}");
        }
    }

    /// Print a warning message.
    pub fn warn(&self, message: &str) {
        if self.config.color {
            eprintln!("{}: {message}", "warning".yellow());
        } else {
            eprintln!("warning: {message}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        if self.config.color {
            eprintln!("{}: {message}", "error".red());
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Flush stdout.
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(ReporterConfig::default())
    }
}

impl RunReport {
    /// The plain-text rendering `describe` prints.
    #[must_use]
    pub fn to_text(&self) -> String {
        Reporter::plain().render(self)
    }
}
