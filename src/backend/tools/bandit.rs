//! Bandit adapter
//!
//! Invokes `bandit -f json` against the project's Python files and maps its
//! security findings into `Security` issues. Contributes the security
//! metric: 100 minus a severity-weighted finding total, floored at zero.

use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::tools::{python_files, ToolAdapter, ToolOutput};
use crate::issue::{Category, Issue, Location, Severity};
use crate::project::Project;
use crate::score::{MetricContribution, MetricKind};

/// Security metric penalty per finding severity
const HIGH_WEIGHT: f64 = 10.0;
const MEDIUM_WEIGHT: f64 = 5.0;
const LOW_WEIGHT: f64 = 1.0;

/// Bandit's JSON document
#[derive(Debug, Deserialize)]
struct BanditReport {
    results: Vec<BanditResult>,
}

#[derive(Debug, Deserialize)]
struct BanditResult {
    filename: String,
    issue_severity: String,
    issue_confidence: String,
    issue_text: String,
    test_id: String,
    line_number: i64,
    col_offset: Option<i64>,
}

fn map_severity(severity: &str) -> Severity {
    match severity.to_uppercase().as_str() {
        "HIGH" => Severity::High,
        "MEDIUM" => Severity::Medium,
        "LOW" => Severity::Low,
        _ => Severity::Low,
    }
}

pub struct BanditAdapter;

impl ToolAdapter for BanditAdapter {
    fn name(&self) -> &'static str {
        "bandit"
    }

    fn binary(&self) -> &'static str {
        "bandit"
    }

    fn invocation(&self, project: &Project, files: &[PathBuf]) -> Option<Vec<String>> {
        let python = python_files(project, files);
        if python.is_empty() {
            return None;
        }
        let mut args = vec!["-f".to_string(), "json".to_string(), "-q".to_string()];
        args.extend(python);
        Some(args)
    }

    fn exit_ok(&self, code: i32) -> bool {
        // 1 means findings at or above the reporting threshold
        code == 0 || code == 1
    }

    fn parse(&self, stdout: &str, _project: &Project) -> std::result::Result<ToolOutput, String> {
        let report: BanditReport = serde_json::from_str(stdout.trim())
            .map_err(|e| format!("expected bandit JSON document: {e}"))?;

        let mut issues = Vec::new();
        let mut penalty = 0.0;
        for result in &report.results {
            let severity = map_severity(&result.issue_severity);
            penalty += match severity {
                Severity::High => HIGH_WEIGHT,
                Severity::Medium => MEDIUM_WEIGHT,
                _ => LOW_WEIGHT,
            };
            issues.push(
                Issue::new(
                    self.name(),
                    &result.test_id,
                    severity,
                    Category::Security,
                    &result.filename,
                    Location::new(
                        result.line_number.max(1) as usize,
                        result.col_offset.unwrap_or(0).max(0) as usize,
                    ),
                    format!(
                        "{} (confidence: {})",
                        result.issue_text,
                        result.issue_confidence.to_lowercase()
                    ),
                )
                .with_suggestion("review the flagged call and validate its inputs"),
            );
        }

        let metric = (100.0 - penalty).max(0.0);
        Ok(ToolOutput {
            issues,
            metrics: vec![MetricContribution::new(MetricKind::Security, metric)],
            notes: vec![format!(
                "bandit reported {} security findings",
                report.results.len()
            )],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::QualityThresholds;

    /// Captured from bandit 1.7 against a sample file (trimmed to the fields
    /// the adapter reads plus a few it must ignore)
    const SAMPLE_OUTPUT: &str = r#"{
  "errors": [],
  "generated_at": "2024-11-02T10:22:41Z",
  "metrics": {"_totals": {"loc": 40, "nosec": 0}},
  "results": [
    {
      "code": "23 result = subprocess.call(user_input, shell=True)",
      "col_offset": 9,
      "filename": "runner.py",
      "issue_confidence": "HIGH",
      "issue_cwe": {"id": 78, "link": "https://cwe.mitre.org/data/definitions/78.html"},
      "issue_severity": "HIGH",
      "issue_text": "subprocess call with shell=True identified, security issue.",
      "line_number": 23,
      "line_range": [23],
      "more_info": "https://bandit.readthedocs.io/en/1.7.9/plugins/b602_subprocess_popen_with_shell_equals_true.html",
      "test_id": "B602",
      "test_name": "subprocess_popen_with_shell_equals_true"
    },
    {
      "code": "8 password = \"hunter2\"",
      "col_offset": 11,
      "filename": "config.py",
      "issue_confidence": "MEDIUM",
      "issue_cwe": {"id": 259, "link": "https://cwe.mitre.org/data/definitions/259.html"},
      "issue_severity": "LOW",
      "issue_text": "Possible hardcoded password: 'hunter2'",
      "line_number": 8,
      "line_range": [8],
      "more_info": "https://bandit.readthedocs.io/en/1.7.9/plugins/b105_hardcoded_password_string.html",
      "test_id": "B105",
      "test_name": "hardcoded_password_string"
    }
  ]
}"#;

    fn sample_project() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("runner.py"), "x = 1\n").unwrap();
        let project = Project::new(dir.path(), QualityThresholds::default()).unwrap();
        (dir, project)
    }

    #[test]
    fn test_parse_sample_output() {
        let (_dir, project) = sample_project();
        let output = BanditAdapter.parse(SAMPLE_OUTPUT, &project).unwrap();
        assert_eq!(output.issues.len(), 2);

        let shell = &output.issues[0];
        assert_eq!(shell.severity, Severity::High);
        assert_eq!(shell.category, Category::Security);
        assert_eq!(shell.rule, "B602");
        assert_eq!(shell.start, Location::new(23, 9));
        assert!(shell.message.contains("shell=True"));
        assert!(shell.message.contains("confidence: high"));

        let password = &output.issues[1];
        assert_eq!(password.severity, Severity::Low);
        assert_eq!(password.rule, "B105");
    }

    #[test]
    fn test_security_metric_weighted_by_severity() {
        let (_dir, project) = sample_project();
        let output = BanditAdapter.parse(SAMPLE_OUTPUT, &project).unwrap();
        let metric = &output.metrics[0];
        assert_eq!(metric.kind, MetricKind::Security);
        // one HIGH (10) + one LOW (1) -> 89
        assert_eq!(metric.value, 89.0);
    }

    #[test]
    fn test_clean_report_scores_full() {
        let (_dir, project) = sample_project();
        let output = BanditAdapter
            .parse(r#"{"errors": [], "results": []}"#, &project)
            .unwrap();
        assert!(output.issues.is_empty());
        assert_eq!(output.metrics[0].value, 100.0);
    }

    #[test]
    fn test_garbage_output_is_parse_error() {
        let (_dir, project) = sample_project();
        assert!(BanditAdapter.parse("Traceback (most recent call last)", &project).is_err());
    }

    #[test]
    fn test_exit_code_policy() {
        assert!(BanditAdapter.exit_ok(0));
        assert!(BanditAdapter.exit_ok(1));
        assert!(!BanditAdapter.exit_ok(2));
    }
}
