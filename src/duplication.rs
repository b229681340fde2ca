//! Pairwise file duplication detection
//!
//! For every pair of sufficiently large files, the detector intersects their
//! sets of exact line texts and reports a [`DuplicatePair`] when the overlap
//! ratio reaches the similarity threshold. Candidates are sorted by line
//! count first so pairs whose size ratio alone caps similarity below the
//! threshold are never compared. Pair comparison is read-only and runs on
//! the rayon pool.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, BackendContext, BackendReport, BackendResult, BoxFuture};
use crate::issue::{Category, Issue, Location, Severity};
use crate::score::{MetricContribution, MetricKind};

/// Default minimum similarity for a pair to be retained
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Default minimum file size in characters; smaller files are noise
pub const DEFAULT_MIN_FILE_SIZE: usize = 100;

/// Similarity at or above which a duplication issue is High instead of Medium
const HIGH_SIMILARITY: f64 = 0.95;

/// Two files flagged as near-duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub file_a: PathBuf,
    pub file_b: PathBuf,

    /// Shared-line ratio in [0,1]
    pub similarity: f64,

    /// Distinct line texts the two files have in common
    pub shared_lines: usize,

    /// Distinct line count of the larger file
    pub total_lines: usize,
}

/// Pairwise line-similarity engine
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    threshold: f64,
    min_file_size: usize,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_file_size: DEFAULT_MIN_FILE_SIZE,
        }
    }
}

struct Candidate {
    path: PathBuf,
    lines: HashSet<String>,
}

impl DuplicateDetector {
    pub fn new(threshold: f64, min_file_size: usize) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            min_file_size,
        }
    }

    /// Read the given files and detect duplicate pairs.
    ///
    /// Unreadable files are skipped with a note; they still count toward the
    /// project-level pair total so the metric reflects the whole file set.
    pub fn detect_files(&self, files: &[PathBuf]) -> (Vec<DuplicatePair>, Vec<String>) {
        let mut notes = Vec::new();
        let mut docs = Vec::new();
        for path in files {
            match fs::read_to_string(path) {
                Ok(content) => docs.push((path.clone(), content)),
                Err(e) => notes.push(format!("skipped unreadable {}: {e}", path.display())),
            }
        }
        (self.detect(&docs), notes)
    }

    /// Detect duplicate pairs in already-loaded file contents
    pub fn detect(&self, docs: &[(PathBuf, String)]) -> Vec<DuplicatePair> {
        let mut candidates: Vec<Candidate> = docs
            .iter()
            .filter(|(_, content)| content.len() > self.min_file_size)
            .map(|(path, content)| Candidate {
                path: path.clone(),
                lines: content.lines().map(str::to_string).collect(),
            })
            .collect();

        // Sort by distinct line count: for i < j, |lines(i)| <= |lines(j)|,
        // so similarity(i, j) can never exceed |lines(i)| / |lines(j)|. The
        // inner window stops at the first j whose size makes that bound fall
        // below the threshold; everything past it is pruned unseen.
        candidates.sort_by(|a, b| {
            a.lines
                .len()
                .cmp(&b.lines.len())
                .then_with(|| a.path.cmp(&b.path))
        });

        let threshold = self.threshold;
        let mut pairs: Vec<DuplicatePair> = candidates
            .par_iter()
            .enumerate()
            .flat_map_iter(|(i, small)| {
                let candidates = &candidates;
                (i + 1..candidates.len())
                    .take_while(move |&j| {
                        let bound =
                            small.lines.len() as f64 / candidates[j].lines.len().max(1) as f64;
                        bound >= threshold
                    })
                    .filter_map(move |j| compare(small, &candidates[j], threshold))
            })
            .collect();

        pairs.sort_by(|a, b| (&a.file_a, &a.file_b).cmp(&(&b.file_a, &b.file_b)));
        pairs
    }

    /// Project-level duplication metric: the share of file pairs that are
    /// not duplicates, as a percentage floored at zero.
    pub fn duplication_metric(pair_count: usize, file_count: usize) -> f64 {
        let total_pairs = file_count.saturating_mul(file_count.saturating_sub(1)) / 2;
        if total_pairs == 0 {
            return 100.0;
        }
        (100.0 * (1.0 - pair_count as f64 / total_pairs as f64)).max(0.0)
    }

    /// Derive one Duplication issue per retained pair
    pub fn issues_from_pairs(pairs: &[DuplicatePair], root: &Path) -> Vec<Issue> {
        pairs
            .iter()
            .map(|pair| {
                let severity = if pair.similarity >= HIGH_SIMILARITY {
                    Severity::High
                } else {
                    Severity::Medium
                };
                let a = pair.file_a.strip_prefix(root).unwrap_or(&pair.file_a);
                let b = pair.file_b.strip_prefix(root).unwrap_or(&pair.file_b);
                Issue::new(
                    "duplication",
                    "duplicate-file",
                    severity,
                    Category::Duplication,
                    a,
                    Location::new(1, 0),
                    format!(
                        "{} shares {} of {} lines with {} ({:.0}% similar)",
                        a.display(),
                        pair.shared_lines,
                        pair.total_lines,
                        b.display(),
                        pair.similarity * 100.0
                    ),
                )
                .with_suggestion("extract the shared logic into one module")
            })
            .collect()
    }
}

fn compare(a: &Candidate, b: &Candidate, threshold: f64) -> Option<DuplicatePair> {
    let shared = a.lines.intersection(&b.lines).count();
    let total = a.lines.len().max(b.lines.len());
    if total == 0 {
        return None;
    }
    let similarity = shared as f64 / total as f64;
    if similarity < threshold {
        return None;
    }
    Some(DuplicatePair {
        file_a: a.path.clone(),
        file_b: b.path.clone(),
        similarity,
        shared_lines: shared,
        total_lines: total,
    })
}

/// The duplication detector behind the backend contract
#[derive(Debug, Default)]
pub struct DuplicationBackend {
    detector: DuplicateDetector,
}

impl DuplicationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: DuplicateDetector) -> Self {
        Self { detector }
    }
}

impl Backend for DuplicationBackend {
    fn name(&self) -> &'static str {
        "duplication"
    }

    fn run(&self, ctx: BackendContext) -> BoxFuture<BackendResult> {
        let detector = self.detector.clone();
        let files = Arc::clone(&ctx.files);
        let project = Arc::clone(&ctx.project);
        Box::pin(async move {
            let handle = tokio::task::spawn_blocking(move || {
                let (pairs, notes) = detector.detect_files(&files);
                let metric = DuplicateDetector::duplication_metric(pairs.len(), files.len());
                let issues = DuplicateDetector::issues_from_pairs(&pairs, project.root());
                BackendReport {
                    issues,
                    metrics: vec![MetricContribution::new(MetricKind::Duplication, metric)],
                    duplicate_pairs: pairs,
                    notes,
                }
            });
            handle.await.map_err(|e| {
                crate::backend::BackendFailure::internal("duplication", e.to_string())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, content: &str) -> (PathBuf, String) {
        (PathBuf::from(name), content.to_string())
    }

    /// A body of 50 distinct lines, comfortably above the size floor
    fn fifty_lines() -> String {
        (0..50)
            .map(|i| format!("let value_{i} = compute({i});"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_identical_files_single_pair_full_similarity() {
        let body = fifty_lines();
        let detector = DuplicateDetector::default();
        let pairs = detector.detect(&[doc("a.rs", &body), doc("b.rs", &body)]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].similarity, 1.0);
        assert_eq!(pairs[0].shared_lines, 50);
        assert_eq!(pairs[0].total_lines, 50);
    }

    #[test]
    fn test_pair_invariants_hold() {
        let body = fifty_lines();
        let mut other: Vec<&str> = body.lines().collect();
        other.truncate(45);
        let other = other.join("\n") + "\nextra_line_one();\nextra_line_two();";

        let detector = DuplicateDetector::default();
        let pairs = detector.detect(&[doc("a.rs", &body), doc("b.rs", &other)]);
        for pair in &pairs {
            assert!(pair.shared_lines <= pair.total_lines);
            assert!((0.0..=1.0).contains(&pair.similarity));
            assert!(pair.similarity >= DEFAULT_SIMILARITY_THRESHOLD);
        }
    }

    #[test]
    fn test_dissimilar_files_not_reported() {
        let a = fifty_lines();
        let b = (0..50)
            .map(|i| format!("const OTHER_{i}: usize = {i};"))
            .collect::<Vec<_>>()
            .join("\n");
        let detector = DuplicateDetector::default();
        assert!(detector.detect(&[doc("a.rs", &a), doc("b.rs", &b)]).is_empty());
    }

    #[test]
    fn test_small_files_skipped() {
        // Identical, but below the 100-character floor
        let body = "fn tiny() {}\nfn other() {}";
        assert!(body.len() <= DEFAULT_MIN_FILE_SIZE);
        let detector = DuplicateDetector::default();
        assert!(detector.detect(&[doc("a.rs", body), doc("b.rs", body)]).is_empty());
    }

    #[test]
    fn test_size_ratio_prunes_hopeless_pairs() {
        // 10 distinct lines vs 100: best possible similarity is 0.1
        let small: String = (0..10).map(|i| format!("short_{i}()\n")).collect();
        let small = small.repeat(2); // push over the size floor without new lines
        let large: String = (0..100).map(|i| format!("short_{i}()\n")).collect();

        let detector = DuplicateDetector::default();
        let pairs = detector.detect(&[doc("small.rs", &small), doc("large.rs", &large)]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_duplication_metric() {
        // 3 files -> 3 pairs; 1 duplicate pair -> 66.7%
        let metric = DuplicateDetector::duplication_metric(1, 3);
        assert!((metric - 66.666).abs() < 0.1);

        assert_eq!(DuplicateDetector::duplication_metric(0, 0), 100.0);
        assert_eq!(DuplicateDetector::duplication_metric(0, 1), 100.0);
        // Floored at zero even if every pair is a duplicate
        assert_eq!(DuplicateDetector::duplication_metric(3, 3), 0.0);
    }

    #[test]
    fn test_issue_severity_scales_with_similarity() {
        let body = fifty_lines();
        let detector = DuplicateDetector::default();
        let pairs = detector.detect(&[doc("a.rs", &body), doc("b.rs", &body)]);
        let issues = DuplicateDetector::issues_from_pairs(&pairs, Path::new("."));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].category, Category::Duplication);

        let pair = DuplicatePair {
            file_a: "a.rs".into(),
            file_b: "b.rs".into(),
            similarity: 0.85,
            shared_lines: 85,
            total_lines: 100,
        };
        let issues = DuplicateDetector::issues_from_pairs(&[pair], Path::new("."));
        assert_eq!(issues[0].severity, Severity::Medium);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let body = fifty_lines();
        let docs = [
            doc("c.rs", &body),
            doc("a.rs", &body),
            doc("b.rs", &body),
        ];
        let detector = DuplicateDetector::default();
        let first = detector.detect(&docs);
        let second = detector.detect(&docs);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
