//! Error types for the analysis engine
//!
//! The taxonomy separates fatal errors (invalid configuration, a run with no
//! usable signal, external cancellation) from locally-recovered ones: a
//! failing backend becomes a run warning, an unparseable file becomes a
//! single critical issue. Only the fatal classes surface to the caller.

use std::process::ExitCode;

use thiserror::Error;

/// Errors surfaced at the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid project or threshold configuration, rejected before a run starts
    #[error("invalid configuration: {message}")]
    Validation { message: String },

    /// A backend or external tool failed; recovered locally, carried as a run warning
    #[error("backend {backend} failed: {message}")]
    Backend { backend: String, message: String },

    /// A single file could not be parsed; recovered locally as a critical issue
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// No backend produced any result, or the project path was unreadable
    #[error("analysis run failed: {reason}")]
    RunFailed { reason: String },

    /// The run was cancelled from outside
    #[error("analysis run cancelled: {reason}")]
    Cancelled { reason: String },

    /// A report view was requested for a run that is not in a reportable state
    #[error("report unavailable: run is {status}")]
    ReportUnavailable { status: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Map errors to process exit codes for the CLI
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation { .. } => ExitCode::from(2),
            Self::RunFailed { .. } => ExitCode::from(3),
            Self::Cancelled { .. } => ExitCode::from(4),
            Self::ReportUnavailable { .. } => ExitCode::from(5),
            Self::Backend { .. } | Self::Parse { .. } => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(7),
        }
    }

    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;
