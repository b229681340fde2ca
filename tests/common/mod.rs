//! Common test utilities and fixtures for appraise integration tests
//!
//! Provides a `TestRepo` builder for laying out on-disk projects with
//! arbitrary source files, plus shorthand for turning one into a `Project`.

use std::fs;
use std::path::Path;

use appraise::{Project, QualityThresholds};
use tempfile::TempDir;

/// An on-disk project fixture, deleted when dropped
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp repo"),
        }
    }

    /// Add a file (creating parent directories as needed)
    pub fn file(self, name: &str, content: &str) -> Self {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, content).expect("write fixture file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn project(&self) -> Project {
        Project::new(self.path(), QualityThresholds::default()).expect("valid project")
    }

    pub fn project_with(&self, thresholds: QualityThresholds) -> Project {
        Project::new(self.path(), thresholds).expect("valid project")
    }
}

/// A python function with `branches` independent if-statements, so its
/// cyclomatic complexity is `branches + 1`
pub fn python_function_with_branches(branches: usize) -> String {
    let mut src = String::from("def busy(x):\n    total = 0\n");
    for i in 0..branches {
        src.push_str(&format!("    if x > {i}:\n        total += {i}\n"));
    }
    src.push_str("    return total\n");
    src
}

/// A body of 50 distinct lines, comfortably above the duplication size floor
pub fn fifty_line_body() -> String {
    (0..50)
        .map(|i| format!("value_{i} = compute({i})"))
        .collect::<Vec<_>>()
        .join("\n")
}
