//! Backend contract and registry
//!
//! Every analyzer - the internal syntax backend, the duplication detector,
//! each external tool adapter - implements [`Backend`]: given a project and a
//! time budget, produce issues and partial metrics, or a typed failure. A
//! backend must never panic across this boundary; any internal fault is
//! captured and returned so the orchestrator can continue with the others.
//!
//! New analyzers are added by registering them, not by branching on backend
//! identity inside the orchestrator.

pub mod syntax;
pub mod tools;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duplication::{DuplicatePair, DuplicationBackend};
use crate::issue::Issue;
use crate::project::Project;
use crate::score::MetricContribution;

/// Boxed future returned by backend implementations
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Everything a backend needs for one invocation
#[derive(Clone)]
pub struct BackendContext {
    /// The immutable analysis target
    pub project: Arc<Project>,

    /// Discovered source files, sorted; shared read-only by all backends
    pub files: Arc<Vec<PathBuf>>,

    /// Time budget for this invocation
    pub deadline: Duration,
}

/// Successful backend output
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BackendReport {
    /// Findings in discovery order (file traversal order, then position)
    pub issues: Vec<Issue>,

    /// Partial category measurements this backend can vouch for
    pub metrics: Vec<MetricContribution>,

    /// Duplicate pairs; empty for every backend except the duplication detector
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_pairs: Vec<DuplicatePair>,

    /// Free-form diagnostics surfaced in the technical report view
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Why a backend produced no usable result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external tool binary could not be resolved
    ToolMissing,
    /// The invocation exceeded its time budget
    Timeout,
    /// The tool or task exited abnormally
    Crashed,
    /// The tool ran but its output could not be parsed
    UnparseableOutput,
    /// The run was cancelled while this backend was in flight
    Cancelled,
    /// Any other internal fault
    Internal,
}

/// Typed failure carried back across the contract boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendFailure {
    pub backend: String,
    pub kind: FailureKind,
    pub message: String,
}

impl BackendFailure {
    pub fn new(backend: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn tool_missing(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, FailureKind::ToolMissing, message)
    }

    pub fn timeout(backend: impl Into<String>, budget: Duration) -> Self {
        Self::new(
            backend,
            FailureKind::Timeout,
            format!("exceeded time budget of {}s", budget.as_secs()),
        )
    }

    pub fn crashed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, FailureKind::Crashed, message)
    }

    pub fn unparseable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, FailureKind::UnparseableOutput, message)
    }

    pub fn internal(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, FailureKind::Internal, message)
    }
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?}): {}", self.backend, self.kind, self.message)
    }
}

/// For callers that escalate a degraded backend instead of tolerating it
impl From<BackendFailure> for crate::error::EngineError {
    fn from(failure: BackendFailure) -> Self {
        Self::Backend {
            backend: failure.backend,
            message: failure.message,
        }
    }
}

pub type BackendResult = std::result::Result<BackendReport, BackendFailure>;

/// The contract every analyzer implements.
///
/// Implementations are stateless across runs: `run` may be called any number
/// of times, concurrently, against different projects.
pub trait Backend: Send + Sync {
    /// Stable registry name (also stamped on every issue this backend emits)
    fn name(&self) -> &'static str;

    /// Analyze the project within the given budget.
    ///
    /// Internal faults must be captured and returned as [`BackendFailure`];
    /// nothing may panic or otherwise escape across this boundary.
    fn run(&self, ctx: BackendContext) -> BoxFuture<BackendResult>;
}

/// Name -> implementation mapping used by the orchestrator
#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend: the syntax analyzer, the
    /// duplication detector, and one backend per external tool adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(syntax::SyntaxBackend::new()));
        registry.register(Arc::new(DuplicationBackend::new()));
        for backend in tools::default_tool_backends() {
            registry.register(backend);
        }
        registry
    }

    /// Register a backend under its own name. A later registration under the
    /// same name replaces the earlier one.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(name).cloned()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
