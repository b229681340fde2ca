//! Mypy adapter
//!
//! Invokes `mypy --output=json`, which emits one JSON document per line, and
//! maps every diagnostic into a `Typing` issue. Exit status 1 means type
//! errors were found; only 2 and above signal a broken invocation.

use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::tools::{python_files, ToolAdapter, ToolOutput};
use crate::issue::{Category, Issue, Location, Severity};
use crate::project::Project;

/// One JSON-lines diagnostic from mypy
#[derive(Debug, Deserialize)]
struct MypyMessage {
    file: String,
    line: i64,
    column: i64,
    message: String,
    code: Option<String>,
    severity: String,
}

fn map_severity(severity: &str) -> Severity {
    match severity {
        "error" => Severity::Medium,
        "note" => Severity::Info,
        _ => Severity::Info,
    }
}

pub struct MypyAdapter;

impl ToolAdapter for MypyAdapter {
    fn name(&self) -> &'static str {
        "mypy"
    }

    fn binary(&self) -> &'static str {
        "mypy"
    }

    fn invocation(&self, project: &Project, files: &[PathBuf]) -> Option<Vec<String>> {
        let python = python_files(project, files);
        if python.is_empty() {
            return None;
        }
        let mut args = vec![
            "--output=json".to_string(),
            "--no-error-summary".to_string(),
        ];
        args.extend(python);
        Some(args)
    }

    fn exit_ok(&self, code: i32) -> bool {
        // 0 = clean, 1 = type errors found; 2 = crash or usage error
        code == 0 || code == 1
    }

    fn parse(&self, stdout: &str, _project: &Project) -> std::result::Result<ToolOutput, String> {
        let mut issues = Vec::new();
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let msg: MypyMessage = serde_json::from_str(line)
                .map_err(|e| format!("expected one JSON diagnostic per line: {e}"))?;
            issues.push(Issue::new(
                self.name(),
                msg.code.as_deref().unwrap_or("mypy"),
                map_severity(&msg.severity),
                Category::Typing,
                &msg.file,
                Location::new(msg.line.max(1) as usize, msg.column.max(0) as usize),
                &msg.message,
            ));
        }
        let count = issues.len();
        Ok(ToolOutput {
            issues,
            metrics: Vec::new(),
            notes: vec![format!("mypy reported {count} diagnostics")],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::QualityThresholds;

    /// Captured from mypy 1.11 against a sample file
    const SAMPLE_OUTPUT: &str = r#"{"file": "app.py", "line": 7, "column": 11, "message": "Argument 1 to \"greet\" has incompatible type \"int\"; expected \"str\"", "hint": null, "code": "arg-type", "severity": "error"}
{"file": "app.py", "line": 12, "column": 0, "message": "By default the bodies of untyped functions are not checked", "hint": null, "code": "annotation-unchecked", "severity": "note"}
"#;

    fn sample_project() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        let project = Project::new(dir.path(), QualityThresholds::default()).unwrap();
        (dir, project)
    }

    #[test]
    fn test_parse_sample_output() {
        let (_dir, project) = sample_project();
        let output = MypyAdapter.parse(SAMPLE_OUTPUT, &project).unwrap();
        assert_eq!(output.issues.len(), 2);

        let error = &output.issues[0];
        assert_eq!(error.severity, Severity::Medium);
        assert_eq!(error.category, Category::Typing);
        assert_eq!(error.rule, "arg-type");
        assert_eq!(error.start, Location::new(7, 11));

        let note = &output.issues[1];
        assert_eq!(note.severity, Severity::Info);
        assert_eq!(note.rule, "annotation-unchecked");
    }

    #[test]
    fn test_empty_output_is_clean() {
        let (_dir, project) = sample_project();
        let output = MypyAdapter.parse("", &project).unwrap();
        assert!(output.issues.is_empty());
        assert!(output.metrics.is_empty());
    }

    #[test]
    fn test_plain_text_output_is_parse_error() {
        let (_dir, project) = sample_project();
        let result = MypyAdapter.parse("app.py:7: error: bad type\n", &project);
        assert!(result.is_err());
    }

    #[test]
    fn test_exit_code_policy() {
        assert!(MypyAdapter.exit_ok(0));
        assert!(MypyAdapter.exit_ok(1));
        assert!(!MypyAdapter.exit_ok(2));
    }

    #[test]
    fn test_invocation_requires_python_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        let project = Project::new(dir.path(), QualityThresholds::default()).unwrap();
        let files = project.discover_files().unwrap();
        assert!(MypyAdapter.invocation(&project, &files).is_none());
    }
}
