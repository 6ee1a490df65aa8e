//! Run report: the rendered tree, a structured tree, failures and counts.

use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::example::OutcomeKind;

/// Output format for run results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Indented tree, failure list and summary line.
    #[default]
    Tree,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" => Ok(Self::Tree),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}' (expected 'tree' or 'json')")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree => f.write_str("tree"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub ok: usize,
    pub failed: usize,
    pub errors: usize,
}

impl Summary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.failed + self.errors
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    pub(crate) const fn count(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Passed => self.ok += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::Errored | OutcomeKind::NotRun => self.errors += 1,
        }
    }
}

impl AddAssign for Summary {
    fn add_assign(&mut self, other: Self) {
        self.ok += other.ok;
        self.failed += other.failed;
        self.errors += other.errors;
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ok, {} failed, {} errors.",
            self.ok, self.failed, self.errors
        )
    }
}

/// Structured form of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportNode {
    Context {
        label: String,
        children: Vec<ReportNode>,
    },
    Example {
        label: String,
        outcome: OutcomeKind,
        expectations: Vec<String>,
    },
}

impl ReportNode {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Context { label, .. } | Self::Example { label, .. } => label,
        }
    }
}

/// One numbered entry of the failure list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub index: usize,
    pub kind: OutcomeKind,
    /// Class of the raised condition (`AssertError` for assertion failures).
    pub class: String,
    pub message: String,
    /// Context labels from the root down, then the example label.
    pub trail: Vec<String>,
    /// `file:line:col` where the condition was raised, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
}

impl FailureRecord {
    /// `Class: message`
    #[must_use]
    pub fn heading(&self) -> String {
        format!("{}: {}", self.class, self.message)
    }

    #[must_use]
    pub fn trail_text(&self) -> String {
        self.trail.join(" > ")
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// The rendered tree, as printed.
    pub tree: String,
    pub root: ReportNode,
    pub failures: Vec<FailureRecord>,
    pub summary: Summary,
}

impl RunReport {
    /// True iff nothing failed or errored.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.summary.passed()
    }
}
