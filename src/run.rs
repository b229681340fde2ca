//! Analysis run lifecycle and backend orchestration
//!
//! An [`AnalysisRun`] moves `Queued -> Running -> Completed | Failed` and is
//! mutated only here: backends return their results and the orchestrator
//! merges them at one synchronization point, so the aggregate needs no
//! locks. A backend that fails or times out becomes a structured warning and
//! the run continues; the run itself only fails when no backend produced any
//! signal, the project had nothing to analyze, or it was cancelled.
//!
//! Merging is ordered by backend name, never by completion order, so the
//! final issue list and score are independent of scheduling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::backend::{
    Backend, BackendContext, BackendFailure, BackendRegistry, FailureKind,
};
use crate::duplication::DuplicatePair;
use crate::error::{EngineError, Result};
use crate::issue::Issue;
use crate::project::Project;
use crate::score::{MetricSet, QualityScore};

/// Tunables for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Independent time budget for each backend
    pub backend_timeout: Duration,

    /// Maximum number of backends running at once
    pub max_concurrent_backends: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(120),
            max_concurrent_backends: 4,
        }
    }
}

/// Why a run ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailureReason {
    /// Project path unreadable or no source files discovered
    InvalidProject { message: String },
    /// Every enabled backend failed, or none were enabled
    NoUsableSignal,
    /// External cancellation
    Cancelled { message: String },
}

impl std::fmt::Display for RunFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProject { message } => write!(f, "invalid project: {message}"),
            Self::NoUsableSignal => write!(f, "no backend produced a usable result"),
            Self::Cancelled { message } => write!(f, "cancelled: {message}"),
        }
    }
}

/// Run lifecycle state
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed { reason: RunFailureReason },
}

impl RunStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

/// One analysis execution.
///
/// Owns its issues, metrics and score exclusively; they have no meaning
/// outside this run. The referenced [`Project`] is shared, never owned.
#[derive(Debug)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub project: Arc<Project>,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub enabled_backends: Vec<String>,
    pub issues: Vec<Issue>,
    pub metrics: MetricSet,
    pub score: Option<QualityScore>,
    /// Degraded contributors: backends that failed or timed out
    pub warnings: Vec<BackendFailure>,
    pub duplicate_pairs: Vec<DuplicatePair>,
    /// (backend, note) diagnostics surfaced in the technical view
    pub notes: Vec<(String, String)>,
}

impl AnalysisRun {
    pub(crate) fn queued(project: Arc<Project>, enabled_backends: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project,
            status: RunStatus::Queued,
            started_at: None,
            finished_at: None,
            enabled_backends,
            issues: Vec::new(),
            metrics: MetricSet::new(),
            score: None,
            warnings: Vec::new(),
            duplicate_pairs: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, reason: RunFailureReason) {
        tracing::warn!(run = %self.id, %reason, "run failed");
        self.status = RunStatus::Failed { reason };
        self.finished_at = Some(Utc::now());
    }
}

/// Handle for cancelling a run from outside
#[derive(Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }
}

/// A cancellation pair: keep the handle, pass the receiver to `execute`
pub fn cancellation() -> (CancelHandle, watch::Receiver<bool>) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle {
            sender: Arc::new(sender),
        },
        receiver,
    )
}

/// Resolves only once cancellation is requested; pends forever if the handle
/// is dropped without cancelling.
async fn wait_cancelled(mut receiver: watch::Receiver<bool>) {
    loop {
        if *receiver.borrow() {
            return;
        }
        if receiver.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Dispatches backends and owns every mutation of the run aggregate
pub struct Orchestrator {
    registry: BackendRegistry,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(registry: BackendRegistry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    /// Execute one run.
    ///
    /// Returns `Err` only for pre-run validation faults (an unknown backend
    /// name). Everything after the run starts ends in a terminal run: either
    /// `Completed`, possibly degraded, or `Failed` with a specific reason.
    pub async fn execute(
        &self,
        project: Arc<Project>,
        backend_names: &[String],
        cancel: watch::Receiver<bool>,
    ) -> Result<AnalysisRun> {
        let mut backends = Vec::with_capacity(backend_names.len());
        for name in backend_names {
            let backend = self
                .registry
                .get(name)
                .ok_or_else(|| EngineError::validation(format!("unknown backend: {name}")))?;
            backends.push(backend);
        }

        let mut run = AnalysisRun::queued(project.clone(), backend_names.to_vec());
        tracing::info!(run = %run.id, backends = ?backend_names, "run queued");

        let files = match project.discover_files() {
            Ok(files) => files,
            Err(e) => {
                run.fail(RunFailureReason::InvalidProject {
                    message: e.to_string(),
                });
                return Ok(run);
            }
        };
        if files.is_empty() {
            run.fail(RunFailureReason::InvalidProject {
                message: format!("no readable source files under {}", project.root().display()),
            });
            return Ok(run);
        }
        if backends.is_empty() {
            run.fail(RunFailureReason::NoUsableSignal);
            return Ok(run);
        }

        run.start();
        let files = Arc::new(files);
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_backends.max(1)));
        let timeout = self.options.backend_timeout;

        let mut tasks = JoinSet::new();
        for backend in backends {
            let ctx = BackendContext {
                project: Arc::clone(&project),
                files: Arc::clone(&files),
                deadline: timeout,
            };
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            tasks.spawn(run_one_backend(backend, ctx, semaphore, cancel, timeout));
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push((
                    "backend".to_string(),
                    Err(BackendFailure::internal("backend", e.to_string())),
                    Duration::ZERO,
                )),
            }
        }

        // Merge in name order: the result must not depend on which backend
        // finished first.
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut successes = 0usize;
        for (name, result, elapsed) in outcomes {
            match result {
                Ok(report) => {
                    successes += 1;
                    tracing::info!(
                        backend = %name,
                        issues = report.issues.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "backend completed"
                    );
                    for contribution in &report.metrics {
                        run.metrics.record(&name, contribution);
                    }
                    run.issues.extend(report.issues);
                    run.duplicate_pairs.extend(report.duplicate_pairs);
                    for note in report.notes {
                        run.notes.push((name.clone(), note));
                    }
                }
                Err(failure) => {
                    tracing::warn!(backend = %name, %failure, "backend degraded");
                    run.warnings.push(failure);
                }
            }
        }

        if *cancel.borrow() {
            run.fail(RunFailureReason::Cancelled {
                message: "cancellation requested by caller".to_string(),
            });
            return Ok(run);
        }

        if successes == 0 {
            run.fail(RunFailureReason::NoUsableSignal);
            return Ok(run);
        }

        run.metrics.fill_defaults();
        run.score = Some(QualityScore::from_metrics(&run.metrics));
        run.complete();
        tracing::info!(
            run = %run.id,
            score = ?run.score.as_ref().map(|s| s.overall),
            "run completed"
        );
        Ok(run)
    }
}

type BackendOutcome = (
    String,
    std::result::Result<crate::backend::BackendReport, BackendFailure>,
    Duration,
);

async fn run_one_backend(
    backend: Arc<dyn Backend>,
    ctx: BackendContext,
    semaphore: Arc<Semaphore>,
    cancel: watch::Receiver<bool>,
    timeout: Duration,
) -> BackendOutcome {
    let name = backend.name().to_string();
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return (
                name.clone(),
                Err(BackendFailure::internal(name, "scheduler shut down")),
                Duration::ZERO,
            )
        }
    };

    if *cancel.borrow() {
        return (
            name.clone(),
            Err(BackendFailure::new(
                name,
                FailureKind::Cancelled,
                "run cancelled before backend started",
            )),
            Duration::ZERO,
        );
    }

    let started = Instant::now();
    // Dropping the backend future on cancellation/timeout kills any
    // subprocess it spawned (kill_on_drop); detached blocking parse work
    // finishes in the background and its result is discarded.
    let result = tokio::select! {
        outcome = tokio::time::timeout(timeout, backend.run(ctx)) => match outcome {
            Ok(result) => result,
            Err(_) => Err(BackendFailure::timeout(name.clone(), timeout)),
        },
        _ = wait_cancelled(cancel.clone()) => Err(BackendFailure::new(
            name.clone(),
            FailureKind::Cancelled,
            "run cancelled while backend was in flight",
        )),
    };
    (name, result, started.elapsed())
}

/// Run an analysis synchronously with the default backend registry.
///
/// This is the invocation boundary: synchronous from the caller's point of
/// view, internally asynchronous.
pub fn run_analysis(
    project: Project,
    backend_names: &[String],
    options: RunOptions,
) -> Result<AnalysisRun> {
    let registry = BackendRegistry::with_defaults();
    run_analysis_with(registry, project, backend_names, options)
}

/// Like [`run_analysis`] but against a caller-supplied registry
pub fn run_analysis_with(
    registry: BackendRegistry,
    project: Project,
    backend_names: &[String],
    options: RunOptions,
) -> Result<AnalysisRun> {
    let orchestrator = Orchestrator::new(registry, options);
    let runtime = tokio::runtime::Runtime::new()?;
    let (_handle, receiver) = cancellation();
    runtime.block_on(orchestrator.execute(Arc::new(project), backend_names, receiver))
}
