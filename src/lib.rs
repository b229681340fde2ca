//! Appraise: multi-backend code quality analysis and grading engine
//!
//! This library runs heterogeneous analyzers against a project, normalizes
//! their findings into one issue model, and folds per-category metrics into
//! one composite score and letter grade:
//!
//! - an internal syntax backend (tree-sitter) for structural metrics,
//!   complexity and dead-code issues
//! - adapters around external tools (pylint, mypy, bandit, coverage), each
//!   isolated behind its own subprocess contract
//! - a pairwise line-similarity duplication detector
//!
//! Backends run concurrently under per-backend timeouts; a failing backend
//! degrades the run instead of aborting it, and unmeasured categories are
//! visibly defaulted rather than silently zeroed.
//!
//! # Example
//!
//! ```no_run
//! use appraise::{run_analysis, Project, QualityThresholds, RunOptions};
//!
//! let project = Project::new("path/to/repo", QualityThresholds::default())?;
//! let run = run_analysis(
//!     project,
//!     &["syntax".into(), "duplication".into()],
//!     RunOptions::default(),
//! )?;
//! if let Some(score) = &run.score {
//!     println!("{} ({})", score.overall, score.grade);
//! }
//! # Ok::<(), appraise::EngineError>(())
//! ```

pub mod backend;
pub mod cli;
pub mod duplication;
pub mod error;
pub mod issue;
pub mod lang;
pub mod project;
pub mod report;
pub mod run;
pub mod score;

// Re-export commonly used types
pub use backend::{
    Backend, BackendContext, BackendFailure, BackendRegistry, BackendReport, BackendResult,
    FailureKind,
};
pub use duplication::{DuplicateDetector, DuplicatePair, DuplicationBackend};
pub use error::{EngineError, Result};
pub use issue::{Category, Issue, IssueStatus, Location, Severity};
pub use lang::{Grammar, Lang};
pub use project::{Project, QualityThresholds};
pub use report::{executive_view, render_text, technical_view, DEFAULT_TOP_ISSUES};
pub use run::{
    cancellation, run_analysis, run_analysis_with, AnalysisRun, CancelHandle, Orchestrator,
    RunFailureReason, RunOptions, RunStatus,
};
pub use score::{
    CategoryMetric, Grade, MetricContribution, MetricKind, MetricSet, MetricSource, QualityScore,
};
