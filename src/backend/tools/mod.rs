//! External tool adapters
//!
//! Each external analyzer (linter, type checker, security scanner, coverage
//! reader) is wrapped by one [`ToolAdapter`]: it knows the invocation to
//! build, which exit statuses mean "findings present, not a crash", and how
//! to map the tool's native output into the normalized issue model. The
//! mapping tables are fixed and unit-tested against captured sample output.
//!
//! [`ToolBackend`] lifts one adapter behind the backend contract: it resolves
//! the binary, runs the subprocess with a bounded timeout (killed on drop, so
//! cancellation propagates), and parses captured stdout. A missing or crashed
//! tool degrades only its own backend.

pub mod bandit;
pub mod coverage;
pub mod mypy;
pub mod pylint;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use crate::backend::{
    Backend, BackendContext, BackendFailure, BackendReport, BackendResult, BoxFuture,
};
use crate::issue::Issue;
use crate::project::Project;
use crate::score::MetricContribution;

pub use bandit::BanditAdapter;
pub use coverage::CoverageAdapter;
pub use mypy::MypyAdapter;
pub use pylint::PylintAdapter;

/// Parsed output of one tool invocation
#[derive(Debug, Default)]
pub struct ToolOutput {
    pub issues: Vec<Issue>,
    pub metrics: Vec<MetricContribution>,
    pub notes: Vec<String>,
}

/// The per-tool subprocess contract
pub trait ToolAdapter: Send + Sync {
    /// Backend/registry name, stamped on every issue
    fn name(&self) -> &'static str;

    /// Executable resolved on PATH before spawning
    fn binary(&self) -> &'static str;

    /// Arguments for one invocation, or `None` when the tool has nothing to
    /// analyze in this project (that is a successful empty result, not a
    /// failure).
    fn invocation(&self, project: &Project, files: &[PathBuf]) -> Option<Vec<String>>;

    /// True for exit statuses that mean the tool ran to completion,
    /// including the tool-specific "findings present" statuses
    fn exit_ok(&self, code: i32) -> bool;

    /// Map captured stdout into normalized output
    fn parse(&self, stdout: &str, project: &Project) -> std::result::Result<ToolOutput, String>;
}

/// One external tool behind the backend contract
pub struct ToolBackend {
    adapter: Arc<dyn ToolAdapter>,
}

impl ToolBackend {
    pub fn new(adapter: Arc<dyn ToolAdapter>) -> Self {
        Self { adapter }
    }
}

impl Backend for ToolBackend {
    fn name(&self) -> &'static str {
        self.adapter.name()
    }

    fn run(&self, ctx: BackendContext) -> BoxFuture<BackendResult> {
        let adapter = Arc::clone(&self.adapter);
        Box::pin(async move {
            let name = adapter.name();

            let binary = which::which(adapter.binary()).map_err(|e| {
                BackendFailure::tool_missing(name, format!("{}: {e}", adapter.binary()))
            })?;

            let args = match adapter.invocation(&ctx.project, &ctx.files) {
                Some(args) => args,
                None => {
                    return Ok(BackendReport {
                        notes: vec![format!("{name}: no applicable files in project")],
                        ..Default::default()
                    })
                }
            };

            tracing::debug!(tool = name, ?args, "invoking external tool");

            let mut command = tokio::process::Command::new(binary);
            command
                .args(&args)
                .current_dir(ctx.project.root())
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let output = tokio::time::timeout(ctx.deadline, command.output())
                .await
                .map_err(|_| BackendFailure::timeout(name, ctx.deadline))?
                .map_err(|e| BackendFailure::crashed(name, e.to_string()))?;

            let code = output.status.code().unwrap_or(-1);
            if !adapter.exit_ok(code) {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail: String = stderr.chars().take(200).collect();
                return Err(BackendFailure::crashed(
                    name,
                    format!("exit status {code}: {detail}"),
                ));
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            let parsed = adapter
                .parse(&stdout, &ctx.project)
                .map_err(|e| BackendFailure::unparseable(name, e))?;

            Ok(BackendReport {
                issues: parsed.issues,
                metrics: parsed.metrics,
                duplicate_pairs: Vec::new(),
                notes: parsed.notes,
            })
        })
    }
}

/// All built-in tool backends, one per adapter
pub fn default_tool_backends() -> Vec<Arc<dyn Backend>> {
    vec![
        Arc::new(ToolBackend::new(Arc::new(PylintAdapter))),
        Arc::new(ToolBackend::new(Arc::new(MypyAdapter))),
        Arc::new(ToolBackend::new(Arc::new(BanditAdapter))),
        Arc::new(ToolBackend::new(Arc::new(CoverageAdapter))),
    ]
}

/// Python sources from the discovered file set, relative to the project root
pub(crate) fn python_files(project: &Project, files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "py" || e == "pyi")
                .unwrap_or(false)
        })
        .map(|p| project.relative(p).display().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FailureKind;
    use crate::project::QualityThresholds;
    use std::time::Duration;

    struct AbsentToolAdapter;

    impl ToolAdapter for AbsentToolAdapter {
        fn name(&self) -> &'static str {
            "absent"
        }

        fn binary(&self) -> &'static str {
            "definitely-not-a-real-analyzer-binary"
        }

        fn invocation(&self, _project: &Project, _files: &[PathBuf]) -> Option<Vec<String>> {
            Some(vec![])
        }

        fn exit_ok(&self, code: i32) -> bool {
            code == 0
        }

        fn parse(
            &self,
            _stdout: &str,
            _project: &Project,
        ) -> std::result::Result<ToolOutput, String> {
            Ok(ToolOutput::default())
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_typed_failure_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let project =
            Arc::new(Project::new(dir.path(), QualityThresholds::default()).unwrap());
        let backend = ToolBackend::new(Arc::new(AbsentToolAdapter));
        let ctx = BackendContext {
            project,
            files: Arc::new(Vec::new()),
            deadline: Duration::from_secs(5),
        };
        let failure = backend.run(ctx).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::ToolMissing);
        assert_eq!(failure.backend, "absent");
    }

    #[test]
    fn test_python_files_filters_and_relativizes() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path(), QualityThresholds::default()).unwrap();
        let files = vec![
            dir.path().join("app.py"),
            dir.path().join("lib.rs"),
            dir.path().join("types.pyi"),
        ];
        let python = python_files(&project, &files);
        assert_eq!(python, vec!["app.py".to_string(), "types.pyi".to_string()]);
    }
}
