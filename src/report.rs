//! Report assembly
//!
//! Pure reshaping of a completed [`AnalysisRun`] into plain JSON value trees
//! so any presentation layer (terminal text, HTML, a JSON file) can consume
//! them without depending on engine types. No analysis logic lives here; the
//! only failure mode is asking for a view of a run that never completed.

use serde_json::{json, Map, Value};

use crate::error::{EngineError, Result};
use crate::issue::Severity;
use crate::run::{AnalysisRun, RunStatus};
use crate::score::MetricKind;

/// Issues shown in the executive summary
pub const DEFAULT_TOP_ISSUES: usize = 10;

/// Executive view: score, grade, category provenance, issue totals by
/// severity, the most severe issues, and threshold compliance.
pub fn executive_view(run: &AnalysisRun, top_n: usize) -> Result<Value> {
    ensure_completed(run)?;
    let score = run.score.as_ref().ok_or_else(|| EngineError::ReportUnavailable {
        status: "completed without a score".to_string(),
    })?;

    let mut totals = Map::new();
    for severity in Severity::all() {
        let count = run.issues.iter().filter(|i| i.severity == severity).count();
        totals.insert(severity.name().to_string(), json!(count));
    }
    totals.insert("total".to_string(), json!(run.issues.len()));

    let mut top_issues: Vec<_> = run.issues.iter().collect();
    top_issues.sort_by(|a, b| {
        (a.severity, &a.file, a.start)
            .cmp(&(b.severity, &b.file, b.start))
    });
    let top_issues: Vec<Value> = top_issues
        .into_iter()
        .take(top_n)
        .map(|issue| {
            json!({
                "severity": issue.severity.name(),
                "category": issue.category.name(),
                "rule": issue.rule,
                "file": issue.file.display().to_string(),
                "line": issue.start.line,
                "backend": issue.backend,
                "message": truncate(&issue.message, 160),
            })
        })
        .collect();

    Ok(json!({
        "run_id": run.id.to_string(),
        "project_root": run.project.root().display().to_string(),
        "status": run.status.name(),
        "started_at": run.started_at.map(|t| t.to_rfc3339()),
        "finished_at": run.finished_at.map(|t| t.to_rfc3339()),
        "overall_score": score.overall,
        "grade": score.grade.as_str(),
        "categories": categories_value(run),
        "measured_categories": run.metrics.measured_count(),
        "issue_totals": Value::Object(totals),
        "top_issues": top_issues,
        "thresholds": thresholds_value(run),
        "degraded_backends": run.warnings.len(),
    }))
}

/// Technical view: the full issue list grouped by file, category breakdown,
/// duplicate pairs, backend notes and degradation warnings.
pub fn technical_view(run: &AnalysisRun) -> Result<Value> {
    ensure_completed(run)?;

    let mut by_file: Map<String, Value> = Map::new();
    for issue in &run.issues {
        let key = issue.file.display().to_string();
        let entry = by_file
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(serde_json::to_value(issue).unwrap_or(Value::Null));
        }
    }

    let mut by_category: Map<String, Value> = Map::new();
    for issue in &run.issues {
        let key = issue.category.name().to_string();
        let count = by_category
            .get(&key)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        by_category.insert(key, json!(count + 1));
    }

    let pairs: Vec<Value> = run
        .duplicate_pairs
        .iter()
        .map(|pair| {
            json!({
                "file_a": pair.file_a.display().to_string(),
                "file_b": pair.file_b.display().to_string(),
                "similarity": pair.similarity,
                "shared_lines": pair.shared_lines,
                "total_lines": pair.total_lines,
            })
        })
        .collect();

    let warnings: Vec<Value> = run
        .warnings
        .iter()
        .map(|w| serde_json::to_value(w).unwrap_or(Value::Null))
        .collect();

    let notes: Vec<Value> = run
        .notes
        .iter()
        .map(|(backend, note)| json!({"backend": backend, "note": note}))
        .collect();

    Ok(json!({
        "run_id": run.id.to_string(),
        "status": run.status.name(),
        "enabled_backends": run.enabled_backends,
        "categories": categories_value(run),
        "issues_by_file": Value::Object(by_file),
        "category_breakdown": Value::Object(by_category),
        "duplicate_pairs": pairs,
        "warnings": warnings,
        "notes": notes,
    }))
}

/// Render the executive view as terminal text
pub fn render_text(view: &Value) -> String {
    let mut out = String::new();
    out.push_str("── QUALITY ASSESSMENT ──────────────────────────────────────\n");
    out.push_str(&format!(
        "  Project:  {}\n",
        view["project_root"].as_str().unwrap_or("?")
    ));
    out.push_str(&format!(
        "  Score:    {:>5}   Grade: {}\n",
        view["overall_score"], view["grade"].as_str().unwrap_or("?")
    ));
    out.push('\n');

    out.push_str("── CATEGORIES ──────────────────────────────────────────────\n");
    if let Some(categories) = view["categories"].as_array() {
        for cat in categories {
            let provenance = if cat["measured"].as_bool().unwrap_or(false) {
                "measured"
            } else {
                "defaulted"
            };
            out.push_str(&format!(
                "  {:<16} {:>6.1}   ({provenance})\n",
                cat["category"].as_str().unwrap_or("?"),
                cat["score"].as_f64().unwrap_or(0.0),
            ));
        }
    }
    out.push('\n');

    out.push_str("── ISSUES ──────────────────────────────────────────────────\n");
    if let Some(totals) = view["issue_totals"].as_object() {
        let line: Vec<String> = ["critical", "high", "medium", "low", "info"]
            .iter()
            .map(|s| format!("{s}: {}", totals.get(*s).and_then(Value::as_u64).unwrap_or(0)))
            .collect();
        out.push_str(&format!("  {}\n", line.join("  ")));
    }
    if let Some(top) = view["top_issues"].as_array() {
        for issue in top {
            out.push_str(&format!(
                "  [{:<8}] {}:{} {}\n",
                issue["severity"].as_str().unwrap_or("?"),
                issue["file"].as_str().unwrap_or("?"),
                issue["line"],
                issue["message"].as_str().unwrap_or(""),
            ));
        }
    }
    out.push('\n');

    out.push_str("── THRESHOLDS ──────────────────────────────────────────────\n");
    if let Some(thresholds) = view["thresholds"].as_array() {
        for t in thresholds {
            let mark = if t["pass"].as_bool().unwrap_or(false) {
                "ok"
            } else {
                "FAIL"
            };
            out.push_str(&format!(
                "  {:<20} limit {:>6}  actual {:>8.1}  {mark}\n",
                t["name"].as_str().unwrap_or("?"),
                t["limit"],
                t["actual"].as_f64().unwrap_or(0.0),
            ));
        }
    }

    let degraded = view["degraded_backends"].as_u64().unwrap_or(0);
    if degraded > 0 {
        out.push_str(&format!(
            "\n  note: {degraded} backend(s) degraded; see the technical view\n"
        ));
    }
    out
}

fn ensure_completed(run: &AnalysisRun) -> Result<()> {
    if run.status != RunStatus::Completed {
        return Err(EngineError::ReportUnavailable {
            status: run.status.name().to_string(),
        });
    }
    Ok(())
}

fn categories_value(run: &AnalysisRun) -> Value {
    let categories: Vec<Value> = run
        .metrics
        .metrics()
        .into_iter()
        .map(|metric| {
            let backends = match &metric.source {
                crate::score::MetricSource::Measured { backends } => json!(backends),
                crate::score::MetricSource::Defaulted => Value::Null,
            };
            json!({
                "category": metric.kind.name(),
                "score": metric.value,
                "measured": metric.is_measured(),
                "backends": backends,
            })
        })
        .collect();
    Value::Array(categories)
}

fn thresholds_value(run: &AnalysisRun) -> Value {
    let thresholds = run.project.thresholds();
    let metric = |kind: MetricKind| {
        run.metrics
            .metric(kind)
            .map(|m| m.value)
            .unwrap_or(crate::score::DEFAULT_METRIC)
    };

    let coverage = metric(MetricKind::Coverage);
    let security = metric(MetricKind::Security);
    let maintainability = metric(MetricKind::Maintainability);
    let duplication_pct = 100.0 - metric(MetricKind::Duplication);
    let complexity_violations = run
        .issues
        .iter()
        .filter(|i| i.rule == "function-complexity")
        .count();

    json!([
        {
            "name": "min_coverage",
            "limit": thresholds.min_coverage,
            "actual": coverage,
            "pass": coverage >= thresholds.min_coverage,
        },
        {
            "name": "min_security",
            "limit": thresholds.min_security,
            "actual": security,
            "pass": security >= thresholds.min_security,
        },
        {
            "name": "min_maintainability",
            "limit": thresholds.min_maintainability,
            "actual": maintainability,
            "pass": maintainability >= thresholds.min_maintainability,
        },
        {
            "name": "max_duplication",
            "limit": thresholds.max_duplication,
            "actual": duplication_pct,
            "pass": duplication_pct <= thresholds.max_duplication,
        },
        {
            "name": "max_complexity",
            "limit": thresholds.max_complexity,
            "actual": complexity_violations,
            "pass": complexity_violations == 0,
        },
    ])
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{cut}...")
}
