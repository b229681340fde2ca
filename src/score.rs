//! Category metrics, weighted aggregation and letter grading
//!
//! Backends contribute partial category measurements; the orchestrator fills
//! the gaps with a neutral default and this module folds the result into one
//! composite score. The weight table and grade thresholds are part of the
//! engine contract and are not configurable per run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Neutral value used for categories no surviving backend measured.
///
/// Deliberately mid-range: a run where one backend was merely unavailable is
/// not punished as if that category scored zero. Reports always show which
/// categories were measured and which were defaulted.
pub const DEFAULT_METRIC: f64 = 50.0;

/// Fixed aggregation weights; they sum to 1.0
pub const WEIGHT_COVERAGE: f64 = 0.30;
pub const WEIGHT_COMPLEXITY: f64 = 0.25;
pub const WEIGHT_SECURITY: f64 = 0.25;
pub const WEIGHT_MAINTAINABILITY: f64 = 0.20;

/// The quality dimensions a run is scored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Coverage,
    Complexity,
    Security,
    Maintainability,
    Duplication,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Coverage => "coverage",
            Self::Complexity => "complexity",
            Self::Security => "security",
            Self::Maintainability => "maintainability",
            Self::Duplication => "duplication",
        }
    }

    pub fn all() -> [MetricKind; 5] {
        [
            Self::Coverage,
            Self::Complexity,
            Self::Security,
            Self::Maintainability,
            Self::Duplication,
        ]
    }
}

/// One backend's measurement of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricContribution {
    pub kind: MetricKind,
    pub value: f64,
}

impl MetricContribution {
    pub fn new(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            value: value.clamp(0.0, 100.0),
        }
    }
}

/// Where a category value came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum MetricSource {
    /// Measured by one or more backends (multiple measurements are averaged)
    Measured { backends: Vec<String> },
    /// No surviving backend measured this category; neutral default applied
    Defaulted,
}

/// A finalized per-category value in [0,100] with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetric {
    pub kind: MetricKind,
    pub value: f64,
    pub source: MetricSource,
}

impl CategoryMetric {
    pub fn is_measured(&self) -> bool {
        matches!(self.source, MetricSource::Measured { .. })
    }
}

/// All category measurements for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    samples: BTreeMap<MetricKind, Vec<(String, f64)>>,
    defaulted: BTreeSet<MetricKind>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one backend's contribution. Values are clamped to [0,100].
    /// Several backends may measure the same category; the finalized value
    /// is their mean, which keeps the result independent of merge order.
    pub fn record(&mut self, backend: &str, contribution: &MetricContribution) {
        self.defaulted.remove(&contribution.kind);
        self.samples
            .entry(contribution.kind)
            .or_default()
            .push((backend.to_string(), contribution.value.clamp(0.0, 100.0)));
    }

    /// Mark every unmeasured category as defaulted so all five dimensions
    /// are present and their provenance is visible.
    pub fn fill_defaults(&mut self) {
        for kind in MetricKind::all() {
            if !self.samples.contains_key(&kind) {
                self.defaulted.insert(kind);
            }
        }
    }

    /// Finalized value for one category, if present
    pub fn metric(&self, kind: MetricKind) -> Option<CategoryMetric> {
        if let Some(samples) = self.samples.get(&kind) {
            let value = samples.iter().map(|(_, v)| v).sum::<f64>() / samples.len() as f64;
            let mut backends: Vec<String> = samples.iter().map(|(b, _)| b.clone()).collect();
            backends.sort();
            return Some(CategoryMetric {
                kind,
                value,
                source: MetricSource::Measured { backends },
            });
        }
        if self.defaulted.contains(&kind) {
            return Some(CategoryMetric {
                kind,
                value: DEFAULT_METRIC,
                source: MetricSource::Defaulted,
            });
        }
        None
    }

    /// Finalized value, falling back to the neutral default
    fn value_or_default(&self, kind: MetricKind) -> f64 {
        self.metric(kind).map_or(DEFAULT_METRIC, |m| m.value)
    }

    pub fn is_measured(&self, kind: MetricKind) -> bool {
        self.samples.contains_key(&kind)
    }

    /// All finalized metrics in kind order
    pub fn metrics(&self) -> Vec<CategoryMetric> {
        MetricKind::all()
            .into_iter()
            .filter_map(|kind| self.metric(kind))
            .collect()
    }

    pub fn measured_count(&self) -> usize {
        self.samples.len()
    }
}

/// Letter grades from A+ down to F
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    D,
    #[serde(rename = "D-")]
    DMinus,
    F,
}

impl Grade {
    /// Map a score in [0,100] to its unique grade.
    ///
    /// The threshold table is total and non-overlapping: every score maps to
    /// exactly one grade.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 97.0 => Self::APlus,
            s if s >= 93.0 => Self::A,
            s if s >= 90.0 => Self::AMinus,
            s if s >= 87.0 => Self::BPlus,
            s if s >= 83.0 => Self::B,
            s if s >= 80.0 => Self::BMinus,
            s if s >= 77.0 => Self::CPlus,
            s if s >= 73.0 => Self::C,
            s if s >= 70.0 => Self::CMinus,
            s if s >= 67.0 => Self::DPlus,
            s if s >= 63.0 => Self::D,
            s if s >= 60.0 => Self::DMinus,
            _ => Self::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::DMinus => "D-",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite score and derived grade for one run.
///
/// Only constructible from a [`MetricSet`], so the overall value can never
/// drift from the category metrics it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub overall: f64,
    pub grade: Grade,
}

impl QualityScore {
    /// Aggregate category metrics into the composite score.
    ///
    /// Weights: coverage 0.30, complexity 0.25 (inverted - a low complexity
    /// burden contributes a high score), security 0.25, maintainability 0.20.
    /// Duplication folds into the maintainability channel: the mean of the
    /// two when both were measured, substitution when only duplication was.
    pub fn from_metrics(metrics: &MetricSet) -> Self {
        let coverage = metrics.value_or_default(MetricKind::Coverage);
        let complexity = 100.0 - metrics.value_or_default(MetricKind::Complexity);
        let security = metrics.value_or_default(MetricKind::Security);
        let maintainability = maintainability_channel(metrics);

        let overall = WEIGHT_COVERAGE * coverage
            + WEIGHT_COMPLEXITY * complexity
            + WEIGHT_SECURITY * security
            + WEIGHT_MAINTAINABILITY * maintainability;
        let overall = (overall.clamp(0.0, 100.0) * 10.0).round() / 10.0;

        Self {
            overall,
            grade: Grade::from_score(overall),
        }
    }
}

/// The maintainability channel value after duplication folding
fn maintainability_channel(metrics: &MetricSet) -> f64 {
    let maint_measured = metrics.is_measured(MetricKind::Maintainability);
    let dup_measured = metrics.is_measured(MetricKind::Duplication);
    match (maint_measured, dup_measured) {
        (true, true) => {
            (metrics.value_or_default(MetricKind::Maintainability)
                + metrics.value_or_default(MetricKind::Duplication))
                / 2.0
        }
        (true, false) => metrics.value_or_default(MetricKind::Maintainability),
        (false, true) => metrics.value_or_default(MetricKind::Duplication),
        (false, false) => DEFAULT_METRIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(kind: MetricKind, value: f64) -> MetricContribution {
        MetricContribution::new(kind, value)
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_COVERAGE + WEIGHT_COMPLEXITY + WEIGHT_SECURITY + WEIGHT_MAINTAINABILITY;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_boundary_maps_to_exactly_one_grade() {
        // At each threshold the grade flips: the boundary score earns the
        // better grade, a tenth below earns the next one down.
        let boundaries = [
            (97.0, Grade::APlus, Grade::A),
            (93.0, Grade::A, Grade::AMinus),
            (90.0, Grade::AMinus, Grade::BPlus),
            (87.0, Grade::BPlus, Grade::B),
            (83.0, Grade::B, Grade::BMinus),
            (80.0, Grade::BMinus, Grade::CPlus),
            (77.0, Grade::CPlus, Grade::C),
            (73.0, Grade::C, Grade::CMinus),
            (70.0, Grade::CMinus, Grade::DPlus),
            (67.0, Grade::DPlus, Grade::D),
            (63.0, Grade::D, Grade::DMinus),
            (60.0, Grade::DMinus, Grade::F),
        ];
        for (threshold, at, below) in boundaries {
            assert_eq!(Grade::from_score(threshold), at, "at {threshold}");
            assert_eq!(Grade::from_score(threshold - 0.1), below, "below {threshold}");
        }
        assert_eq!(Grade::from_score(100.0), Grade::APlus);
        assert_eq!(Grade::from_score(0.0), Grade::F);
    }

    #[test]
    fn test_all_defaulted_scores_neutral() {
        let mut metrics = MetricSet::new();
        metrics.fill_defaults();
        let score = QualityScore::from_metrics(&metrics);
        // 0.30*50 + 0.25*(100-50) + 0.25*50 + 0.20*50 = 50
        assert_eq!(score.overall, 50.0);
        assert_eq!(score.grade, Grade::F);
        assert!(metrics.metrics().iter().all(|m| !m.is_measured()));
    }

    #[test]
    fn test_perfect_metrics_score_one_hundred() {
        let mut metrics = MetricSet::new();
        metrics.record("coverage", &contribution(MetricKind::Coverage, 100.0));
        metrics.record("syntax", &contribution(MetricKind::Complexity, 0.0));
        metrics.record("bandit", &contribution(MetricKind::Security, 100.0));
        metrics.record("pylint", &contribution(MetricKind::Maintainability, 100.0));
        metrics.record("duplication", &contribution(MetricKind::Duplication, 100.0));
        metrics.fill_defaults();
        let score = QualityScore::from_metrics(&metrics);
        assert_eq!(score.overall, 100.0);
        assert_eq!(score.grade, Grade::APlus);
    }

    #[test]
    fn test_duplication_substitutes_for_missing_maintainability() {
        let mut metrics = MetricSet::new();
        metrics.record("duplication", &contribution(MetricKind::Duplication, 80.0));
        metrics.fill_defaults();
        // channel = 80 instead of the defaulted 50
        let with_fold = QualityScore::from_metrics(&metrics);

        let mut without = MetricSet::new();
        without.fill_defaults();
        let neutral = QualityScore::from_metrics(&without);
        assert!(with_fold.overall > neutral.overall);
    }

    #[test]
    fn test_duplication_folds_by_mean_when_both_measured() {
        let mut metrics = MetricSet::new();
        metrics.record("pylint", &contribution(MetricKind::Maintainability, 90.0));
        metrics.record("duplication", &contribution(MetricKind::Duplication, 70.0));
        assert_eq!(maintainability_channel(&metrics), 80.0);
    }

    #[test]
    fn test_repeat_measurements_average_order_independent() {
        let mut forward = MetricSet::new();
        forward.record("syntax", &contribution(MetricKind::Complexity, 20.0));
        forward.record("other", &contribution(MetricKind::Complexity, 40.0));

        let mut reverse = MetricSet::new();
        reverse.record("other", &contribution(MetricKind::Complexity, 40.0));
        reverse.record("syntax", &contribution(MetricKind::Complexity, 20.0));

        let f = forward.metric(MetricKind::Complexity).unwrap();
        let r = reverse.metric(MetricKind::Complexity).unwrap();
        assert_eq!(f.value, 30.0);
        assert_eq!(f.value, r.value);
        assert_eq!(f.source, r.source);
    }

    #[test]
    fn test_contributions_clamped() {
        let c = MetricContribution::new(MetricKind::Security, 140.0);
        assert_eq!(c.value, 100.0);
        let c = MetricContribution::new(MetricKind::Security, -3.0);
        assert_eq!(c.value, 0.0);
    }

    #[test]
    fn test_score_reconstructible_from_metrics() {
        let mut metrics = MetricSet::new();
        metrics.record("coverage", &contribution(MetricKind::Coverage, 85.0));
        metrics.record("syntax", &contribution(MetricKind::Complexity, 10.0));
        metrics.record("bandit", &contribution(MetricKind::Security, 90.0));
        metrics.fill_defaults();
        let first = QualityScore::from_metrics(&metrics);
        let second = QualityScore::from_metrics(&metrics);
        assert_eq!(first, second);
    }
}
