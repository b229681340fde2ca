//! Analysis target description
//!
//! A [`Project`] is the immutable input to every analysis run: a root path,
//! discovery globs and a validated set of quality thresholds. Many runs may
//! reference the same project; none may mutate it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::lang::Lang;

/// Quality gates supplied by the caller, validated once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum acceptable coverage percentage
    pub min_coverage: f64,

    /// Maximum acceptable cyclomatic complexity per function
    pub max_complexity: u32,

    /// Maximum acceptable duplication percentage
    pub max_duplication: f64,

    /// Minimum acceptable security score
    pub min_security: f64,

    /// Minimum acceptable maintainability score
    pub min_maintainability: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_coverage: 80.0,
            max_complexity: 10,
            max_duplication: 10.0,
            min_security: 70.0,
            min_maintainability: 65.0,
        }
    }
}

impl QualityThresholds {
    /// Validate all values are in range
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_coverage", self.min_coverage),
            ("max_duplication", self.max_duplication),
            ("min_security", self.min_security),
            ("min_maintainability", self.min_maintainability),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(EngineError::Validation {
                    message: format!("{name} must be in [0,100], got {value}"),
                });
            }
        }
        if self.max_complexity == 0 {
            return Err(EngineError::Validation {
                message: "max_complexity must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Build thresholds from a flat key -> value mapping.
    ///
    /// Unknown keys are rejected so a typo cannot silently fall back to a
    /// default gate.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let mut thresholds = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "min_coverage" => thresholds.min_coverage = *value,
                "max_complexity" => {
                    if *value < 1.0 || value.fract() != 0.0 {
                        return Err(EngineError::Validation {
                            message: format!("max_complexity must be a positive integer, got {value}"),
                        });
                    }
                    thresholds.max_complexity = *value as u32;
                }
                "max_duplication" => thresholds.max_duplication = *value,
                "min_security" => thresholds.min_security = *value,
                "min_maintainability" => thresholds.min_maintainability = *value,
                other => {
                    return Err(EngineError::Validation {
                        message: format!("unknown threshold key: {other}"),
                    })
                }
            }
        }
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Load thresholds from a TOML file containing a flat key -> value table.
    /// Integer and float values are both accepted.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| EngineError::Validation {
            message: format!("invalid threshold file {}: {e}", path.display()),
        })?;

        let mut map = BTreeMap::new();
        for (key, value) in table {
            let number = match value {
                toml::Value::Integer(i) => i as f64,
                toml::Value::Float(f) => f,
                other => {
                    return Err(EngineError::Validation {
                        message: format!("threshold {key} must be numeric, got {other}"),
                    })
                }
            };
            map.insert(key, number);
        }
        Self::from_map(&map)
    }
}

/// Immutable description of an analysis target
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    thresholds: QualityThresholds,
}

impl Project {
    /// Create a project rooted at `root`. The path must exist and be a
    /// directory; thresholds are validated here, before any run starts.
    pub fn new(root: impl Into<PathBuf>, thresholds: QualityThresholds) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(EngineError::Validation {
                message: format!("project root {} is not a directory", root.display()),
            });
        }
        thresholds.validate()?;
        Ok(Self {
            root,
            include: Vec::new(),
            exclude: Vec::new(),
            thresholds,
        })
    }

    /// Restrict discovery to files matching these globs
    pub fn with_include(mut self, globs: Vec<String>) -> Self {
        self.include = globs;
        self
    }

    /// Exclude files matching these globs from discovery
    pub fn with_exclude(mut self, globs: Vec<String>) -> Self {
        self.exclude = globs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Render a path relative to the project root for reporting
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    /// Walk the project root and collect supported source files.
    ///
    /// Honors include/exclude globs, skips hidden files and common vendor
    /// directories, and returns a sorted list so every backend sees the same
    /// file order on every run.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        let mut overrides = OverrideBuilder::new(&self.root);
        for glob in &self.include {
            overrides.add(glob).map_err(|e| EngineError::Validation {
                message: format!("bad include glob {glob}: {e}"),
            })?;
        }
        for glob in &self.exclude {
            overrides
                .add(&format!("!{glob}"))
                .map_err(|e| EngineError::Validation {
                    message: format!("bad exclude glob {glob}: {e}"),
                })?;
        }
        let overrides = overrides.build().map_err(|e| EngineError::Validation {
            message: format!("failed to compile discovery globs: {e}"),
        })?;

        let walker = WalkBuilder::new(&self.root)
            .overrides(overrides)
            .filter_entry(|entry| !should_skip_dir(entry.path()))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }
            let path = entry.into_path();
            if Lang::from_path(&path).is_ok() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Directories that never contain first-party sources
fn should_skip_dir(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => {
            name == "node_modules"
                || name == "target"
                || name == "dist"
                || name == "build"
                || name == "coverage"
                || name == "__pycache__"
                || name == "vendor"
        }
        None => false,
    }
}
