//! Coverage adapter
//!
//! Invokes `coverage report --format=total`, which prints the project's
//! total coverage percentage as a single scalar, and contributes it as the
//! coverage metric. Produces no issues. A project without recorded coverage
//! data makes the tool exit non-zero, which degrades this backend and leaves
//! the coverage category defaulted.

use std::path::PathBuf;

use crate::backend::tools::{ToolAdapter, ToolOutput};
use crate::project::Project;
use crate::score::{MetricContribution, MetricKind};

pub struct CoverageAdapter;

impl ToolAdapter for CoverageAdapter {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn binary(&self) -> &'static str {
        "coverage"
    }

    fn invocation(&self, _project: &Project, _files: &[PathBuf]) -> Option<Vec<String>> {
        Some(vec![
            "report".to_string(),
            "--format=total".to_string(),
        ])
    }

    fn exit_ok(&self, code: i32) -> bool {
        // Non-zero covers both usage errors and "no data to report"
        code == 0
    }

    fn parse(&self, stdout: &str, _project: &Project) -> std::result::Result<ToolOutput, String> {
        let raw = stdout.trim().trim_end_matches('%').trim();
        let total: f64 = raw
            .parse()
            .map_err(|_| format!("expected a total percentage, got {raw:?}"))?;
        if !(0.0..=100.0).contains(&total) {
            return Err(format!("total percentage out of range: {total}"));
        }
        Ok(ToolOutput {
            issues: Vec::new(),
            metrics: vec![MetricContribution::new(MetricKind::Coverage, total)],
            notes: vec![format!("recorded coverage total: {total}%")],
        })
    }
}
