//! Internal syntax backend
//!
//! Parses each source file with tree-sitter and makes a single traversal
//! collecting structural metrics: function/class/method counts, maximum
//! nesting depth, and a cyclomatic-style complexity per function (1 plus
//! branching constructs, boolean operators and exception handlers). The
//! traversal is driven by the per-language [`Grammar`] tables; only import
//! binding extraction needs language-specific handling.
//!
//! A file that fails to parse yields one critical `syntax-error` issue and
//! analysis continues with the remaining files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tree_sitter::Node;

use crate::backend::{
    Backend, BackendContext, BackendFailure, BackendReport, BackendResult, BoxFuture,
};
use crate::issue::{Category, Issue, Location, Severity};
use crate::lang::{Grammar, Lang};
use crate::project::Project;
use crate::score::{MetricContribution, MetricKind};

const BACKEND_NAME: &str = "syntax";

/// Functions longer than this count against the maintainability metric
const OVERSIZED_FUNCTION_LOC: usize = 75;

/// Maintainability penalty per dead-code issue
const DEADCODE_PENALTY: f64 = 5.0;

/// Maintainability penalty per oversized function
const OVERSIZED_PENALTY: f64 = 2.0;

/// Names that are path plumbing, never bindings worth tracking
const NON_BINDING_NAMES: &[&str] = &["self", "super", "crate", "*", "_", ""];

/// The internal syntax-tree analyzer
#[derive(Debug, Default)]
pub struct SyntaxBackend;

impl SyntaxBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SyntaxBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn run(&self, ctx: BackendContext) -> BoxFuture<BackendResult> {
        let project = Arc::clone(&ctx.project);
        let files = Arc::clone(&ctx.files);
        Box::pin(async move {
            let handle = tokio::task::spawn_blocking(move || analyze_project(&project, &files));
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(BackendFailure::internal(BACKEND_NAME, e.to_string())),
            }
        })
    }
}

/// Structural facts about one function
#[derive(Debug, Clone)]
struct FunctionInfo {
    name: String,
    start: Location,
    end: Location,
    complexity: u32,
    loc: usize,
}

/// Everything one traversal of one file produces
#[derive(Debug, Default)]
struct FileStructure {
    functions: Vec<FunctionInfo>,
    class_count: usize,
    method_count: usize,
    max_nesting: usize,
    issues: Vec<Issue>,
}

fn analyze_project(project: &Project, files: &[PathBuf]) -> BackendResult {
    let mut issues = Vec::new();
    let mut total_functions = 0usize;
    let mut total_classes = 0usize;
    let mut total_methods = 0usize;
    let mut over_threshold = 0usize;
    let mut oversized = 0usize;
    let mut deadcode_issues = 0usize;
    let mut deepest_nesting = 0usize;
    let mut analyzed = 0usize;

    let threshold = project.thresholds().max_complexity;

    for path in files {
        let lang = match Lang::from_path(path) {
            Ok(lang) => lang,
            Err(_) => continue,
        };
        let source = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(file = %path.display(), "unreadable source: {e}");
                continue;
            }
        };
        let rel = project.relative(path);
        let mut structure = parse_and_walk(lang, &source, &rel)?;

        analyzed += 1;
        total_functions += structure.functions.len();
        total_classes += structure.class_count;
        total_methods += structure.method_count;
        deepest_nesting = deepest_nesting.max(structure.max_nesting);

        for function in &structure.functions {
            if function.loc > OVERSIZED_FUNCTION_LOC {
                oversized += 1;
            }
            if function.complexity > threshold {
                over_threshold += 1;
                structure
                    .issues
                    .push(complexity_issue(function, threshold, &rel));
            }
        }

        // Stable per-file ordering: position first, rule as tiebreaker
        structure
            .issues
            .sort_by(|a, b| (a.start, &a.rule).cmp(&(b.start, &b.rule)));
        deadcode_issues += structure
            .issues
            .iter()
            .filter(|i| i.category == Category::DeadCode)
            .count();
        issues.extend(structure.issues);
    }

    let complexity_metric = if total_functions == 0 {
        0.0
    } else {
        100.0 * over_threshold as f64 / total_functions as f64
    };
    let maintainability_metric = (100.0
        - DEADCODE_PENALTY * deadcode_issues as f64
        - OVERSIZED_PENALTY * oversized as f64)
        .max(0.0);

    tracing::debug!(
        files = analyzed,
        functions = total_functions,
        over_threshold,
        "syntax analysis complete"
    );

    Ok(BackendReport {
        issues,
        metrics: vec![
            MetricContribution::new(MetricKind::Complexity, complexity_metric),
            MetricContribution::new(MetricKind::Maintainability, maintainability_metric),
        ],
        duplicate_pairs: Vec::new(),
        notes: vec![format!(
            "analyzed {analyzed} files: {total_functions} functions, \
             {total_classes} classes, {total_methods} methods, max nesting {deepest_nesting}"
        )],
    })
}

fn complexity_issue(function: &FunctionInfo, threshold: u32, rel: &Path) -> Issue {
    let severity = if function.complexity > threshold * 2 {
        Severity::High
    } else {
        Severity::Medium
    };
    Issue::new(
        BACKEND_NAME,
        "function-complexity",
        severity,
        Category::Complexity,
        rel,
        function.start,
        format!(
            "function `{}` has cyclomatic complexity {} (threshold {})",
            function.name, function.complexity, threshold
        ),
    )
    .with_end(function.end)
    .with_suggestion("split the function into smaller, single-purpose helpers")
}

/// Parse one file and run the structural traversal.
///
/// A file with syntax errors produces a structure holding only the critical
/// issue; a grammar that fails to load is an engine fault and fails the
/// whole backend.
fn parse_and_walk(
    lang: Lang,
    source: &str,
    rel: &Path,
) -> std::result::Result<FileStructure, BackendFailure> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| BackendFailure::internal(BACKEND_NAME, format!("grammar load failed: {e}")))?;

    let tree = match parser.parse(source, None) {
        Some(tree) if !tree.root_node().has_error() => tree,
        _ => {
            let mut structure = FileStructure::default();
            structure.issues.push(Issue::new(
                BACKEND_NAME,
                "syntax-error",
                Severity::Critical,
                Category::Maintainability,
                rel,
                Location::new(1, 0),
                format!("{} could not be parsed as {}", rel.display(), lang.name()),
            ));
            return Ok(structure);
        }
    };

    let mut walker = Walker::new(lang, source, rel);
    walker.visit(&tree.root_node(), false);
    walker.finish_file();
    Ok(walker.structure)
}

/// Single-pass traversal state
struct Walker<'a> {
    lang: Lang,
    source: &'a str,
    grammar: &'static Grammar,
    rel: &'a Path,
    structure: FileStructure,

    /// Complexity counter per enclosing function, innermost last
    counters: Vec<u32>,
    class_depth: usize,
    nesting: usize,

    /// Identifier texts seen outside import declarations
    used_names: HashSet<String>,

    /// Import bindings in source order, resolved against `used_names` at EOF
    import_bindings: Vec<(String, Location)>,
}

impl<'a> Walker<'a> {
    fn new(lang: Lang, source: &'a str, rel: &'a Path) -> Self {
        Self {
            lang,
            source,
            grammar: lang.grammar(),
            rel,
            structure: FileStructure::default(),
            counters: Vec::new(),
            class_depth: 0,
            nesting: 0,
            used_names: HashSet::new(),
            import_bindings: Vec::new(),
        }
    }

    fn text(&self, node: &Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn location(node: &Node) -> Location {
        Location::new(node.start_position().row + 1, node.start_position().column)
    }

    fn end_location(node: &Node) -> Location {
        Location::new(node.end_position().row + 1, node.end_position().column)
    }

    fn visit(&mut self, node: &Node, in_import: bool) {
        let kind = node.kind();
        let is_import = self.grammar.is_import(kind);
        let is_function = self.grammar.is_function(kind);
        let is_class = self.grammar.is_class(kind);
        let is_nesting = self.grammar.is_nesting(kind);

        if is_import {
            self.collect_import_bindings(node);
        }

        if self.grammar.is_branch(kind) {
            if let Some(counter) = self.counters.last_mut() {
                *counter += 1;
            }
        }

        if kind == self.grammar.boolean_operator_node && self.is_boolean_operator(node) {
            if let Some(counter) = self.counters.last_mut() {
                *counter += 1;
            }
        }

        if is_function {
            self.counters.push(1);
            if self.class_depth > 0 {
                self.structure.method_count += 1;
            }
        }
        if is_class {
            self.structure.class_count += 1;
            self.class_depth += 1;
        }
        if is_nesting {
            self.nesting += 1;
            self.structure.max_nesting = self.structure.max_nesting.max(self.nesting);
        }

        if !in_import && !is_import && is_identifier_kind(kind) {
            self.used_names.insert(self.text(node).to_string());
        }

        if self.grammar.is_block(kind) {
            self.check_unreachable(node);
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(&child, in_import || is_import);
        }

        if is_nesting {
            self.nesting -= 1;
        }
        if is_class {
            self.class_depth -= 1;
        }
        if is_function {
            let complexity = self.counters.pop().unwrap_or(1);
            let start = Self::location(node);
            let end = Self::end_location(node);
            self.structure.functions.push(FunctionInfo {
                name: self.function_name(node),
                start,
                end,
                complexity,
                loc: end.line.saturating_sub(start.line) + 1,
            });
        }
    }

    fn is_boolean_operator(&self, node: &Node) -> bool {
        node.child_by_field_name("operator")
            .map(|op| {
                let text = op.utf8_text(self.source.as_bytes()).unwrap_or("");
                self.grammar.boolean_operator_tokens.contains(&text)
            })
            .unwrap_or(false)
    }

    fn function_name(&self, node: &Node) -> String {
        node.child_by_field_name("name")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_else(|| "(anonymous)".to_string())
    }

    /// Flag the first statement that can never execute because an
    /// unconditional return/raise precedes it in the same block.
    fn check_unreachable(&mut self, block: &Node) {
        let mut cursor = block.walk();
        let mut terminated = false;
        for child in block.named_children(&mut cursor) {
            if terminated {
                // "comment" in python/js/go, "line_comment"/"block_comment" in rust
                if child.kind().ends_with("comment") {
                    continue;
                }
                self.structure.issues.push(
                    Issue::new(
                        BACKEND_NAME,
                        "unreachable-code",
                        Severity::Medium,
                        Category::DeadCode,
                        self.rel,
                        Self::location(&child),
                        "statement is unreachable: control flow exits unconditionally above",
                    )
                    .with_end(Self::end_location(&child)),
                );
                return;
            }
            terminated = self.is_terminating_statement(&child);
        }
    }

    fn is_terminating_statement(&self, node: &Node) -> bool {
        if self.grammar.is_terminator(node.kind()) {
            return true;
        }
        // Expression-statement wrappers (e.g. `return x;` in Rust blocks)
        node.named_child(0)
            .map(|inner| self.grammar.is_terminator(inner.kind()))
            .unwrap_or(false)
    }

    fn push_binding(&mut self, node: &Node) {
        let name = self.text(node);
        if NON_BINDING_NAMES.contains(&name) {
            return;
        }
        self.import_bindings
            .push((name.to_string(), Self::location(node)));
    }

    fn collect_import_bindings(&mut self, node: &Node) {
        match self.lang {
            Lang::Python => self.python_bindings(node),
            Lang::Rust => self.rust_bindings(node),
            Lang::JavaScript | Lang::TypeScript => self.js_bindings(node),
            Lang::Go => self.go_bindings(node),
        }
    }

    /// `import a.b` binds `a`; `from m import x as y` binds `y`
    fn python_bindings(&mut self, node: &Node) {
        let module = node.child_by_field_name("module_name");
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if module.map(|m| m.id() == child.id()).unwrap_or(false) {
                continue;
            }
            match child.kind() {
                "dotted_name" => {
                    let target = if node.kind() == "import_statement" {
                        // the first segment is the name that becomes visible
                        child.named_child(0)
                    } else {
                        child.named_child(child.named_child_count().saturating_sub(1))
                    };
                    if let Some(target) = target {
                        self.push_binding(&target);
                    }
                }
                "aliased_import" => {
                    if let Some(alias) = child.child_by_field_name("alias") {
                        self.push_binding(&alias);
                    }
                }
                _ => {}
            }
        }
    }

    /// `use a::b::C` binds `C`; `use x as y` binds `y`; groups recurse
    fn rust_bindings(&mut self, node: &Node) {
        if let Some(argument) = node.child_by_field_name("argument") {
            self.rust_use_tree(&argument);
        }
    }

    fn rust_use_tree(&mut self, node: &Node) {
        match node.kind() {
            "identifier" => self.push_binding(node),
            "scoped_identifier" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.push_binding(&name);
                }
            }
            "use_as_clause" => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    self.push_binding(&alias);
                }
            }
            "use_list" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.rust_use_tree(&child);
                }
            }
            "scoped_use_list" => {
                if let Some(list) = node.child_by_field_name("list") {
                    self.rust_use_tree(&list);
                }
            }
            _ => {}
        }
    }

    /// Default, named and namespace imports; aliases win over source names
    fn js_bindings(&mut self, node: &Node) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "import_clause" {
                self.js_import_tree(&child);
            }
        }
    }

    fn js_import_tree(&mut self, node: &Node) {
        match node.kind() {
            "import_specifier" => {
                let target = node
                    .child_by_field_name("alias")
                    .or_else(|| node.child_by_field_name("name"));
                if let Some(target) = target {
                    self.push_binding(&target);
                }
            }
            "identifier" => self.push_binding(node),
            "import_clause" | "named_imports" | "namespace_import" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.js_import_tree(&child);
                }
            }
            _ => {}
        }
    }

    /// Aliased imports bind the alias; plain imports bind the last path segment
    fn go_bindings(&mut self, node: &Node) {
        let mut specs = Vec::new();
        collect_nodes_of_kind(node, "import_spec", &mut specs);
        for spec in specs {
            if let Some(name) = spec.child_by_field_name("name") {
                if name.kind() == "package_identifier" {
                    self.push_binding(&name);
                    continue;
                }
                // dot and blank imports bind nothing trackable
                continue;
            }
            if let Some(path) = spec.child_by_field_name("path") {
                let text = self.text(&path).trim_matches('"');
                let binding = text.rsplit('/').next().unwrap_or(text).to_string();
                if !NON_BINDING_NAMES.contains(&binding.as_str()) {
                    self.import_bindings.push((binding, Self::location(&path)));
                }
            }
        }
    }

    /// Resolve import bindings against the identifiers used in the rest of
    /// the file and emit dead-code issues for the unused ones.
    fn finish_file(&mut self) {
        let bindings = std::mem::take(&mut self.import_bindings);
        for (name, location) in bindings {
            if !self.used_names.contains(&name) {
                self.structure.issues.push(Issue::new(
                    BACKEND_NAME,
                    "unused-import",
                    Severity::Low,
                    Category::DeadCode,
                    self.rel,
                    location,
                    format!("imported name `{name}` is never used"),
                ));
            }
        }
    }
}

fn collect_nodes_of_kind<'tree>(node: &Node<'tree>, kind: &str, out: &mut Vec<Node<'tree>>) {
    if node.kind() == kind {
        out.push(*node);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_nodes_of_kind(&child, kind, out);
    }
}

fn is_identifier_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "type_identifier"
            | "field_identifier"
            | "property_identifier"
            | "shorthand_property_identifier"
            | "package_identifier"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_python(source: &str) -> FileStructure {
        parse_and_walk(Lang::Python, source, Path::new("test.py")).unwrap()
    }

    fn walk_rust(source: &str) -> FileStructure {
        parse_and_walk(Lang::Rust, source, Path::new("test.rs")).unwrap()
    }

    /// A python function with `branches` independent if-statements, so its
    /// cyclomatic complexity is `branches + 1`.
    fn python_function_with_branches(branches: usize) -> String {
        let mut src = String::from("def busy(x):\n    total = 0\n");
        for i in 0..branches {
            src.push_str(&format!("    if x > {i}:\n        total += {i}\n"));
        }
        src.push_str("    return total\n");
        src
    }

    #[test]
    fn test_simple_function_complexity_is_one() {
        let structure = walk_python("def f():\n    return 1\n");
        assert_eq!(structure.functions.len(), 1);
        assert_eq!(structure.functions[0].complexity, 1);
        assert_eq!(structure.functions[0].name, "f");
    }

    #[test]
    fn test_branches_and_boolean_operators_counted() {
        let src = "\
def check(a, b):
    if a and b:
        return 1
    for i in range(10):
        while b:
            b -= 1
    return 0
";
        let structure = walk_python(src);
        // 1 base + if + and + for + while = 5
        assert_eq!(structure.functions[0].complexity, 5);
    }

    #[test]
    fn test_exception_handlers_counted() {
        let src = "\
def load(path):
    try:
        return open(path)
    except OSError:
        return None
    except ValueError:
        return None
";
        let structure = walk_python(src);
        // 1 base + two except clauses
        assert_eq!(structure.functions[0].complexity, 3);
    }

    #[test]
    fn test_fifteen_branches_against_threshold_ten_is_medium() {
        let src = python_function_with_branches(14);
        let structure = walk_python(&src);
        assert_eq!(structure.functions[0].complexity, 15);

        let issue = complexity_issue(&structure.functions[0], 10, Path::new("test.py"));
        // 15 is over the threshold but not over 2x10, so Medium
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.category, Category::Complexity);
        assert_eq!(issue.rule, "function-complexity");
    }

    #[test]
    fn test_complexity_above_double_threshold_is_high() {
        let src = python_function_with_branches(24);
        let structure = walk_python(&src);
        assert_eq!(structure.functions[0].complexity, 25);

        let issue = complexity_issue(&structure.functions[0], 10, Path::new("test.py"));
        assert_eq!(issue.severity, Severity::High);
    }

    #[test]
    fn test_exactly_double_threshold_stays_medium() {
        let function = FunctionInfo {
            name: "edge".into(),
            start: Location::new(1, 0),
            end: Location::new(2, 0),
            complexity: 20,
            loc: 2,
        };
        let issue = complexity_issue(&function, 10, Path::new("test.py"));
        assert_eq!(issue.severity, Severity::Medium);
    }

    #[test]
    fn test_class_and_method_counts() {
        let src = "\
class Account:
    def deposit(self, amount):
        self.balance += amount

    def withdraw(self, amount):
        self.balance -= amount

def free_function():
    pass
";
        let structure = walk_python(src);
        assert_eq!(structure.class_count, 1);
        assert_eq!(structure.method_count, 2);
        assert_eq!(structure.functions.len(), 3);
    }

    #[test]
    fn test_nesting_depth_tracked() {
        let src = "\
def deep(x):
    if x:
        for i in range(3):
            while i:
                i -= 1
";
        let structure = walk_python(src);
        assert_eq!(structure.max_nesting, 3);
    }

    #[test]
    fn test_unreachable_after_return() {
        let src = "\
def f(x):
    return x
    print('never')
";
        let structure = walk_python(src);
        let unreachable: Vec<_> = structure
            .issues
            .iter()
            .filter(|i| i.rule == "unreachable-code")
            .collect();
        assert_eq!(unreachable.len(), 1);
        assert_eq!(unreachable[0].severity, Severity::Medium);
        assert_eq!(unreachable[0].category, Category::DeadCode);
        assert_eq!(unreachable[0].start.line, 3);
    }

    #[test]
    fn test_unreachable_after_raise() {
        let src = "\
def f():
    raise ValueError('boom')
    cleanup()
";
        let structure = walk_python(src);
        assert!(structure.issues.iter().any(|i| i.rule == "unreachable-code"));
    }

    #[test]
    fn test_unused_import_flagged() {
        let src = "\
import os
import sys

def f():
    return sys.argv
";
        let structure = walk_python(src);
        let unused: Vec<_> = structure
            .issues
            .iter()
            .filter(|i| i.rule == "unused-import")
            .collect();
        assert_eq!(unused.len(), 1);
        assert!(unused[0].message.contains("`os`"));
        assert_eq!(unused[0].severity, Severity::Low);
    }

    #[test]
    fn test_aliased_import_tracks_alias() {
        let src = "\
import numpy as np

def f():
    return np.zeros(3)
";
        let structure = walk_python(src);
        assert!(!structure.issues.iter().any(|i| i.rule == "unused-import"));
    }

    #[test]
    fn test_from_import_binds_imported_name() {
        let src = "\
from collections import OrderedDict

def f():
    return OrderedDict()
";
        let structure = walk_python(src);
        assert!(!structure.issues.iter().any(|i| i.rule == "unused-import"));
    }

    #[test]
    fn test_syntax_error_yields_single_critical_issue() {
        let structure = walk_python("def broken(:\n    nope nope\n");
        assert_eq!(structure.issues.len(), 1);
        assert_eq!(structure.issues[0].rule, "syntax-error");
        assert_eq!(structure.issues[0].severity, Severity::Critical);
        assert!(structure.functions.is_empty());
    }

    #[test]
    fn test_rust_traversal() {
        let src = "\
use std::collections::HashMap;
use std::fmt;

fn lookup(map: &HashMap<String, u32>, key: &str) -> u32 {
    if let Some(v) = map.get(key) {
        return *v;
    }
    0
}
";
        let structure = walk_rust(src);
        assert_eq!(structure.functions.len(), 1);
        assert!(structure.functions[0].complexity >= 2);
        let unused: Vec<_> = structure
            .issues
            .iter()
            .filter(|i| i.rule == "unused-import")
            .collect();
        assert_eq!(unused.len(), 1, "only `fmt` should be unused: {unused:?}");
        assert!(unused[0].message.contains("`fmt`"));
    }

    #[test]
    fn test_rust_match_arms_counted() {
        let src = "\
fn classify(n: u32) -> &'static str {
    match n {
        0 => \"zero\",
        1 => \"one\",
        _ => \"many\",
    }
}
";
        let structure = walk_rust(src);
        // 1 base + three match arms
        assert_eq!(structure.functions[0].complexity, 4);
    }

    #[test]
    fn test_idempotent_over_same_source() {
        let src = python_function_with_branches(5);
        let first = walk_python(&src);
        let second = walk_python(&src);
        assert_eq!(first.functions.len(), second.functions.len());
        assert_eq!(first.issues.len(), second.issues.len());
        assert_eq!(
            first.functions[0].complexity,
            second.functions[0].complexity
        );
    }

    #[test]
    fn test_backend_reports_metrics_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("simple.py"),
            "def ok():\n    return 1\n",
        )
        .unwrap();
        fs::write(dir.path().join("busy.py"), python_function_with_branches(14)).unwrap();

        let project = Project::new(
            dir.path(),
            crate::project::QualityThresholds::default(),
        )
        .unwrap();
        let files = project.discover_files().unwrap();
        let report = analyze_project(&project, &files).unwrap();

        // one of two functions over the threshold -> complexity burden 50
        let complexity = report
            .metrics
            .iter()
            .find(|m| m.kind == MetricKind::Complexity)
            .unwrap();
        assert_eq!(complexity.value, 50.0);
        assert!(report
            .issues
            .iter()
            .any(|i| i.rule == "function-complexity"));
        assert!(report.notes[0].contains("2 files"));
    }
}
