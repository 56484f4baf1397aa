use std::fmt;
use std::ops::AddAssign;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Machine-readable category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    EmptyTranslation,
    PlaceholderMismatch,
    StaleThreshold,
    OrphanEntry,
    MissingEntry,
    ParseError,
    IoError,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingKind::EmptyTranslation => "empty-translation",
            FindingKind::PlaceholderMismatch => "placeholder-mismatch",
            FindingKind::StaleThreshold => "stale-threshold",
            FindingKind::OrphanEntry => "orphan-entry",
            FindingKind::MissingEntry => "missing-entry",
            FindingKind::ParseError => "parse-error",
            FindingKind::IoError => "io-error",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub key: Option<String>,
    pub message: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        kind: FindingKind,
        key: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            key: key.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn error(kind: FindingKind, key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, key, message)
    }

    pub fn warning(kind: FindingKind, key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, key, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Sync,
    Validate,
    Export,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Sync => "sync",
            Operation::Validate => "validate",
            Operation::Export => "export",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskOutcome {
    Success,
    SuccessWithWarnings,
    Failed,
}

impl TaskOutcome {
    /// Any error-severity finding fails the task; warnings alone do not.
    pub fn from_findings(findings: &[Finding]) -> Self {
        if findings.iter().any(Finding::is_error) {
            TaskOutcome::Failed
        } else if findings.is_empty() {
            TaskOutcome::Success
        } else {
            TaskOutcome::SuccessWithWarnings
        }
    }

    pub fn is_failure(self) -> bool {
        self == TaskOutcome::Failed
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskOutcome::Success => "success",
            TaskOutcome::SuccessWithWarnings => "success-with-warnings",
            TaskOutcome::Failed => "failed",
        })
    }
}

/// Diff classification counts of one task.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct KeyCounts {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl AddAssign for KeyCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.changed += rhs.changed;
        self.removed += rhs.removed;
        self.unchanged += rhs.unchanged;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskReport {
    pub resource: String,
    pub language: String,
    pub operation: Operation,
    pub outcome: TaskOutcome,
    pub counts: KeyCounts,
    pub findings: Vec<Finding>,
    /// File written by the task, if any.
    pub output: Option<String>,
}

impl TaskReport {
    pub fn target(&self) -> String {
        format!("{}:{}", self.resource, self.language)
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AggregateStatus {
    Success,
    PartialFailure,
    Failure,
}

impl AggregateStatus {
    /// An empty batch counts as a success.
    pub fn from_outcomes<I: IntoIterator<Item = TaskOutcome>>(outcomes: I) -> Self {
        let (mut ok, mut failed) = (0usize, 0usize);
        for o in outcomes {
            if o.is_failure() {
                failed += 1;
            } else {
                ok += 1;
            }
        }
        match (ok, failed) {
            (_, 0) => AggregateStatus::Success,
            (0, _) => AggregateStatus::Failure,
            _ => AggregateStatus::PartialFailure,
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateStatus::Success => "success",
            AggregateStatus::PartialFailure => "partial-failure",
            AggregateStatus::Failure => "failure",
        })
    }
}

/// Outcome of a batch run; `tasks` follows input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    pub schema_version: u32,
    pub tasks: Vec<TaskReport>,
    pub status: AggregateStatus,
}

impl BatchReport {
    pub fn new(tasks: Vec<TaskReport>) -> Self {
        let status = AggregateStatus::from_outcomes(tasks.iter().map(|t| t.outcome));
        Self {
            schema_version: SCHEMA_VERSION,
            tasks,
            status,
        }
    }

    pub fn totals(&self) -> KeyCounts {
        let mut total = KeyCounts::default();
        for t in &self.tasks {
            total += t.counts;
        }
        total
    }

    pub fn count_outcome(&self, outcome: TaskOutcome) -> usize {
        self.tasks.iter().filter(|t| t.outcome == outcome).count()
    }
}
