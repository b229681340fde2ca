//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Multi-backend code quality analysis and grading engine
#[derive(Parser, Debug)]
#[command(name = "appraise")]
#[command(about = "Analyzes a codebase with pluggable backends and produces a scored quality grade")]
#[command(version)]
pub struct Cli {
    /// Path to the project to analyze
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Backends to run, comma separated (default: every registered backend)
    #[arg(short, long, value_delimiter = ',')]
    pub backends: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Which report view to print
    #[arg(long, default_value = "executive", value_enum)]
    pub view: ReportView,

    /// Threshold configuration file (TOML, flat key = value)
    #[arg(long, env = "APPRAISE_THRESHOLDS")]
    pub config: Option<PathBuf>,

    /// Per-backend time budget in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Maximum number of backends running at once
    #[arg(long, default_value_t = 4)]
    pub max_parallel: usize,

    /// Only analyze files matching these globs, comma separated
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip files matching these globs, comma separated
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// How many of the most severe issues the executive view shows
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// Report view options
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ReportView {
    /// Score, grade, issue counts and the top issues
    #[default]
    Executive,
    /// Full issue list grouped by file, duplication pairs, warnings
    Technical,
}
