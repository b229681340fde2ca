//! Language detection and tree-sitter grammar loading
//!
//! The syntax backend is table-driven: each supported language carries a
//! [`Grammar`] describing which node kinds represent functions, classes,
//! branching constructs, imports and blocks. Adding a language means adding
//! a grammar table, not new traversal code.

use std::path::Path;

use tree_sitter::Language;

use crate::error::{EngineError, Result};

/// Languages the internal syntax backend can analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
}

impl Lang {
    /// Detect language from file path extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| EngineError::Validation {
                message: format!("no extension on {}", path.display()),
            })?;
        Self::from_extension(ext)
    }

    /// Detect language from a file extension string
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Ok(Self::Python),
            "rs" => Ok(Self::Rust),
            "js" | "mjs" | "cjs" | "jsx" => Ok(Self::JavaScript),
            "ts" | "tsx" => Ok(Self::TypeScript),
            "go" => Ok(Self::Go),
            _ => Err(EngineError::Validation {
                message: format!("unsupported language extension: {ext}"),
            }),
        }
    }

    /// Canonical name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
        }
    }

    /// Tree-sitter Language for parsing
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Grammar table for the structural traversal
    pub fn grammar(&self) -> &'static Grammar {
        match self {
            Self::Python => &PYTHON_GRAMMAR,
            Self::Rust => &RUST_GRAMMAR,
            Self::JavaScript => &JAVASCRIPT_GRAMMAR,
            Self::TypeScript => &TYPESCRIPT_GRAMMAR,
            Self::Go => &GO_GRAMMAR,
        }
    }

    /// File extensions recognized for this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py", "pyi"],
            Self::Rust => &["rs"],
            Self::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Self::TypeScript => &["ts", "tsx"],
            Self::Go => &["go"],
        }
    }
}

/// Node-kind tables describing the structural shape of one language
#[derive(Debug)]
pub struct Grammar {
    /// Nodes that define a function (free or method)
    pub function_nodes: &'static [&'static str],

    /// Nodes that define a class-like container (class, struct, interface)
    pub class_nodes: &'static [&'static str],

    /// Branching constructs counted toward cyclomatic complexity
    pub branch_nodes: &'static [&'static str],

    /// Constructs that open a nesting level
    pub nesting_nodes: &'static [&'static str],

    /// Node kind carrying a short-circuit boolean operator
    pub boolean_operator_node: &'static str,

    /// Operator spellings that count as boolean branches
    pub boolean_operator_tokens: &'static [&'static str],

    /// Unconditional control-flow exits (return / raise / throw)
    pub terminator_nodes: &'static [&'static str],

    /// Import/use declarations
    pub import_nodes: &'static [&'static str],

    /// Statement-sequence containers scanned for unreachable code
    pub block_nodes: &'static [&'static str],
}

impl Grammar {
    pub fn is_function(&self, kind: &str) -> bool {
        self.function_nodes.contains(&kind)
    }

    pub fn is_class(&self, kind: &str) -> bool {
        self.class_nodes.contains(&kind)
    }

    pub fn is_branch(&self, kind: &str) -> bool {
        self.branch_nodes.contains(&kind)
    }

    pub fn is_nesting(&self, kind: &str) -> bool {
        self.nesting_nodes.contains(&kind)
    }

    pub fn is_terminator(&self, kind: &str) -> bool {
        self.terminator_nodes.contains(&kind)
    }

    pub fn is_import(&self, kind: &str) -> bool {
        self.import_nodes.contains(&kind)
    }

    pub fn is_block(&self, kind: &str) -> bool {
        self.block_nodes.contains(&kind)
    }
}

pub static PYTHON_GRAMMAR: Grammar = Grammar {
    function_nodes: &["function_definition"],
    class_nodes: &["class_definition"],
    branch_nodes: &[
        "if_statement",
        "elif_clause",
        "conditional_expression",
        "while_statement",
        "for_statement",
        "except_clause",
        "case_clause",
        "for_in_clause",
    ],
    nesting_nodes: &[
        "if_statement",
        "while_statement",
        "for_statement",
        "with_statement",
        "try_statement",
        "match_statement",
    ],
    boolean_operator_node: "boolean_operator",
    boolean_operator_tokens: &["and", "or"],
    terminator_nodes: &["return_statement", "raise_statement"],
    import_nodes: &["import_statement", "import_from_statement"],
    block_nodes: &["block"],
};

pub static RUST_GRAMMAR: Grammar = Grammar {
    function_nodes: &["function_item"],
    class_nodes: &["struct_item", "enum_item", "trait_item"],
    branch_nodes: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "loop_expression",
        "match_arm",
    ],
    nesting_nodes: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "loop_expression",
        "match_expression",
    ],
    boolean_operator_node: "binary_expression",
    boolean_operator_tokens: &["&&", "||"],
    terminator_nodes: &["return_expression"],
    import_nodes: &["use_declaration"],
    block_nodes: &["block"],
};

pub static JAVASCRIPT_GRAMMAR: Grammar = Grammar {
    function_nodes: &[
        "function_declaration",
        "function_expression",
        "arrow_function",
        "method_definition",
        "generator_function_declaration",
    ],
    class_nodes: &["class_declaration"],
    branch_nodes: &[
        "if_statement",
        "ternary_expression",
        "while_statement",
        "do_statement",
        "for_statement",
        "for_in_statement",
        "switch_case",
        "catch_clause",
    ],
    nesting_nodes: &[
        "if_statement",
        "while_statement",
        "do_statement",
        "for_statement",
        "for_in_statement",
        "switch_statement",
        "try_statement",
    ],
    boolean_operator_node: "binary_expression",
    boolean_operator_tokens: &["&&", "||"],
    terminator_nodes: &["return_statement", "throw_statement"],
    import_nodes: &["import_statement"],
    block_nodes: &["statement_block"],
};

pub static TYPESCRIPT_GRAMMAR: Grammar = Grammar {
    function_nodes: &[
        "function_declaration",
        "function_expression",
        "arrow_function",
        "method_definition",
        "generator_function_declaration",
    ],
    class_nodes: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
    ],
    branch_nodes: &[
        "if_statement",
        "ternary_expression",
        "while_statement",
        "do_statement",
        "for_statement",
        "for_in_statement",
        "switch_case",
        "catch_clause",
    ],
    nesting_nodes: &[
        "if_statement",
        "while_statement",
        "do_statement",
        "for_statement",
        "for_in_statement",
        "switch_statement",
        "try_statement",
    ],
    boolean_operator_node: "binary_expression",
    boolean_operator_tokens: &["&&", "||"],
    terminator_nodes: &["return_statement", "throw_statement"],
    import_nodes: &["import_statement"],
    block_nodes: &["statement_block"],
};

pub static GO_GRAMMAR: Grammar = Grammar {
    function_nodes: &["function_declaration", "method_declaration"],
    class_nodes: &["type_declaration"],
    branch_nodes: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
        "communication_case",
    ],
    nesting_nodes: &[
        "if_statement",
        "for_statement",
        "expression_switch_statement",
        "type_switch_statement",
        "select_statement",
    ],
    boolean_operator_node: "binary_expression",
    boolean_operator_tokens: &["&&", "||"],
    terminator_nodes: &["return_statement"],
    import_nodes: &["import_declaration"],
    block_nodes: &["block"],
};
