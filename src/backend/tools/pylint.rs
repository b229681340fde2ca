//! Pylint adapter
//!
//! Invokes `pylint --output-format=json` against the project's Python files
//! and maps its five message types onto the normalized issue model. Pylint's
//! exit status is a bitmask of the message classes it emitted; anything below
//! the usage-error bit (32) means the run itself succeeded.
//!
//! Contributes the maintainability metric, derived from weighted issue
//! density per analyzed file.

use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::backend::tools::{python_files, ToolAdapter, ToolOutput};
use crate::issue::{Category, Issue, Location, Severity};
use crate::project::Project;
use crate::score::{MetricContribution, MetricKind};

/// Message type -> (severity, category). Fixed and versioned with the crate.
static MESSAGE_TYPE_MAP: Lazy<HashMap<&'static str, (Severity, Category)>> = Lazy::new(|| {
    HashMap::from([
        ("fatal", (Severity::Critical, Category::Maintainability)),
        ("error", (Severity::High, Category::Maintainability)),
        ("warning", (Severity::Medium, Category::Maintainability)),
        ("refactor", (Severity::Low, Category::Maintainability)),
        ("convention", (Severity::Info, Category::Style)),
        ("information", (Severity::Info, Category::Style)),
    ])
});

/// Maintainability penalty weight per severity
fn penalty_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical | Severity::High => 5.0,
        Severity::Medium => 2.0,
        Severity::Low => 1.0,
        Severity::Info => 0.5,
    }
}

/// One diagnostic in pylint's JSON array output
#[derive(Debug, Deserialize)]
struct PylintMessage {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    line: i64,
    column: i64,
    #[serde(rename = "endLine")]
    end_line: Option<i64>,
    #[serde(rename = "endColumn")]
    end_column: Option<i64>,
    symbol: String,
    message: String,
}

pub struct PylintAdapter;

impl ToolAdapter for PylintAdapter {
    fn name(&self) -> &'static str {
        "pylint"
    }

    fn binary(&self) -> &'static str {
        "pylint"
    }

    fn invocation(&self, project: &Project, files: &[PathBuf]) -> Option<Vec<String>> {
        let python = python_files(project, files);
        if python.is_empty() {
            return None;
        }
        let mut args = vec!["--output-format=json".to_string()];
        args.extend(python);
        Some(args)
    }

    fn exit_ok(&self, code: i32) -> bool {
        // Bits 1..16 flag emitted message classes; 32 means usage error
        (0..32).contains(&code)
    }

    fn parse(&self, stdout: &str, project: &Project) -> std::result::Result<ToolOutput, String> {
        let messages: Vec<PylintMessage> = serde_json::from_str(stdout.trim())
            .map_err(|e| format!("expected JSON array of messages: {e}"))?;

        let python_count = project
            .discover_files()
            .map(|files| python_files(project, &files).len())
            .unwrap_or(1)
            .max(1);

        let mut issues = Vec::new();
        let mut penalty = 0.0;
        for msg in &messages {
            let (severity, category) = MESSAGE_TYPE_MAP
                .get(msg.kind.as_str())
                .copied()
                .unwrap_or((Severity::Info, Category::Style));
            penalty += penalty_weight(severity);

            let mut issue = Issue::new(
                self.name(),
                &msg.symbol,
                severity,
                category,
                &msg.path,
                Location::new(msg.line.max(1) as usize, msg.column.max(0) as usize),
                &msg.message,
            );
            if let Some(end_line) = msg.end_line {
                issue = issue.with_end(Location::new(
                    end_line.max(1) as usize,
                    msg.end_column.unwrap_or(0).max(0) as usize,
                ));
            }
            issues.push(issue);
        }

        let metric = (100.0 - 10.0 * penalty / python_count as f64).max(0.0);
        Ok(ToolOutput {
            issues,
            metrics: vec![MetricContribution::new(MetricKind::Maintainability, metric)],
            notes: vec![format!(
                "pylint reported {} messages across {} python files",
                messages.len(),
                python_count
            )],
        })
    }
}
