//! Normalized issue model
//!
//! Every backend, whatever its native vocabulary, reports findings as
//! [`Issue`] values. The orchestrator only ever appends issues to a run;
//! nothing rewrites them after a backend has returned.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Issue severity, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    /// All severities, most severe first
    pub fn all() -> [Severity; 5] {
        [
            Self::Critical,
            Self::High,
            Self::Medium,
            Self::Low,
            Self::Info,
        ]
    }
}

/// Quality category an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Security,
    Complexity,
    Duplication,
    DeadCode,
    Style,
    Typing,
    Maintainability,
}

impl Category {
    /// Canonical snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Complexity => "complexity",
            Self::Duplication => "duplication",
            Self::DeadCode => "dead_code",
            Self::Style => "style",
            Self::Typing => "typing",
            Self::Maintainability => "maintainability",
        }
    }
}

/// Lifecycle status of an issue within a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Active,
    Suppressed,
    Fixed,
}

/// A position in a source file (1-based line, 0-based column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// One normalized finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Name of the backend that produced this issue
    pub backend: String,

    /// Backend-scoped rule identifier (e.g. "function-complexity", "B603")
    pub rule: String,

    pub severity: Severity,
    pub category: Category,

    /// Path of the offending file, relative to the project root when possible
    pub file: PathBuf,

    /// Start of the offending span
    pub start: Location,

    /// End of the offending span; never precedes `start`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Location>,

    /// Human-readable description
    pub message: String,

    /// Optional remediation hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(default)]
    pub status: IssueStatus,
}

impl Issue {
    /// Create an issue spanning a single location
    pub fn new(
        backend: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        category: Category,
        file: impl Into<PathBuf>,
        start: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            rule: rule.into(),
            severity,
            category,
            file: file.into(),
            start,
            end: None,
            message: message.into(),
            suggestion: None,
            status: IssueStatus::Active,
        }
    }

    /// Attach an end location. An end that precedes the start violates the
    /// span invariant and is discarded.
    pub fn with_end(mut self, end: Location) -> Self {
        if end >= self.start {
            self.end = Some(end);
        }
        self
    }

    /// Attach a remediation hint
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// True when the span invariant holds
    pub fn span_is_valid(&self) -> bool {
        self.end.map_or(true, |end| end >= self.start)
    }
}
