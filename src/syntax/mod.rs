//! Syntax model builder
//!
//! Parses source text with tree-sitter into a [`SyntaxModel`]: the functions,
//! classes, imports, exception handlers, name bindings and call sites the
//! graders score. Building a model never executes the input and is
//! deterministic: the same text and language always produce an identical
//! model.
//!
//! # Cyclomatic complexity
//!
//! Complexity per function is the linear McCabe approximation
//! `1 + decision_points`, where each of the following adds one decision point:
//! - a conditional branch (`if`, `elif`, ternary, `case`, comprehension `if`)
//! - a loop (`for`, `while`, `do`, comprehension `for`)
//! - an exception handler clause (`except`, `catch`)
//! - each boolean operator link (`and`, `or`, `&&`, `||`, `??`)
//!
//! This is not the control-flow-graph cyclomatic number. Decision points in a
//! nested function count toward that nested function only.

mod javascript;
mod python;
mod walker;

use serde::{Deserialize, Serialize};
use tree_sitter::Parser;

use crate::error::{GradingError, Result};

/// Languages the builder can model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    /// Resolve a language tag such as `python`, `py`, `js` or `typescript`
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "jsx" | "node" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            other => Err(GradingError::UnsupportedLanguage(other.to_string())),
        }
    }

    /// Map file extension to language
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" | "pyi" | "pyw" => Some(Language::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self> {
        Language::from_tag(s)
    }
}

/// A function, method or lambda-like unit with a body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionUnit {
    pub name: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub parameter_count: usize,
    pub has_docstring: bool,
    pub decision_points: u32,
    /// Deepest nesting of control blocks inside the body
    pub nesting_depth: u32,
    /// Deepest nesting of loops inside the body
    pub loop_depth: u32,
    /// Body contains a try/except or try/catch
    pub handles_errors: bool,
    /// Number of raise / throw statements
    pub raise_count: u32,
    /// Body opens with a guard that raises or returns early
    pub validates_input: bool,
    /// Parameters defaulting to a shared list, dict or set literal (Python)
    pub mutable_defaults: Vec<String>,
    /// Index into `SyntaxModel::classes` when this is a direct method
    #[serde(default)]
    pub class_index: Option<usize>,
}

impl FunctionUnit {
    /// Linear McCabe approximation
    pub fn complexity(&self) -> u32 {
        1 + self.decision_points
    }

    pub fn line_span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// A class (or class expression) and its direct methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassUnit {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub has_docstring: bool,
    pub methods: Vec<String>,
}

/// One imported module, in source order (duplicates kept)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub module: String,
    pub line: usize,
    /// `from x import *` / `import * as x` / `export * from`
    pub wildcard: bool,
}

/// How broadly an exception handler catches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// `except:` or `catch {}` with no binding
    Bare,
    /// `except Exception` or a catch that swallows silently
    Broad,
    Specific,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub line: usize,
    pub kind: HandlerKind,
}

/// A name introduced by assignment, declaration or parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub line: usize,
    /// Bound by a loop header (`for i in ...`, `for (let i = 0; ...)`)
    pub loop_counter: bool,
    /// Right-hand side is a plain string literal
    pub string_literal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Callee expression text, e.g. `eval` or `pickle.loads`
    pub callee: String,
    /// Argument list text with whitespace removed, e.g. `(cmd,shell=True)`
    pub arguments: String,
    pub line: usize,
}

/// Structural model of one source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxModel {
    pub language: Language,
    pub functions: Vec<FunctionUnit>,
    pub classes: Vec<ClassUnit>,
    pub imports: Vec<Import>,
    pub handlers: Vec<ExceptionHandler>,
    pub bindings: Vec<Binding>,
    pub calls: Vec<CallSite>,
    pub line_count: usize,
    /// Lines holding at least one non-comment token
    pub code_line_count: usize,
    /// Lines on which a comment starts
    pub comment_line_count: usize,
    /// Character count of every line, 1-based line = index + 1
    pub line_lengths: Vec<usize>,
}

impl SyntaxModel {
    fn empty(language: Language) -> Self {
        Self {
            language,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            handlers: Vec::new(),
            bindings: Vec::new(),
            calls: Vec::new(),
            line_count: 0,
            code_line_count: 0,
            comment_line_count: 0,
            line_lengths: Vec::new(),
        }
    }

    /// No functions, no classes and no executable lines
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty() && self.code_line_count == 0
    }

    /// Mean cyclomatic complexity across functions
    pub fn average_complexity(&self) -> Option<f64> {
        if self.functions.is_empty() {
            return None;
        }
        let total: u32 = self.functions.iter().map(FunctionUnit::complexity).sum();
        Some(total as f64 / self.functions.len() as f64)
    }

    pub fn max_complexity(&self) -> u32 {
        self.functions
            .iter()
            .map(FunctionUnit::complexity)
            .max()
            .unwrap_or(0)
    }

    /// Comment lines per executable line
    pub fn comment_ratio(&self) -> f64 {
        if self.code_line_count == 0 {
            0.0
        } else {
            self.comment_line_count as f64 / self.code_line_count as f64
        }
    }
}

/// Parse `source` as `language` into a syntax model
///
/// Returns `ParseFailure` with the 1-based location of the first syntax
/// error when the text is not valid for the language.
pub fn build_model(source: &str, language: Language) -> Result<SyntaxModel> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.grammar())
        .map_err(|e| GradingError::Other(format!("Failed to load {} grammar: {}", language, e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| GradingError::ParseFailure {
            line: 1,
            column: 1,
            message: "parser produced no tree".to_string(),
        })?;

    let root = tree.root_node();
    if let Some(error) = walker::first_error(root) {
        let position = error.start_position();
        let message = if error.is_missing() {
            format!("missing {}", error.kind())
        } else {
            "unexpected syntax".to_string()
        };
        return Err(GradingError::ParseFailure {
            line: position.row + 1,
            column: position.column + 1,
            message,
        });
    }

    let mut model = SyntaxModel::empty(language);
    model.line_lengths = source.lines().map(|l| l.chars().count()).collect();
    model.line_count = model.line_lengths.len();

    let dialect: &dyn walker::Dialect = match language {
        Language::Python => &python::PythonDialect,
        Language::JavaScript | Language::TypeScript => &javascript::JavaScriptDialect,
    };

    Ok(walker::ModelWalker::new(source.as_bytes(), dialect, model).run(root))
}
