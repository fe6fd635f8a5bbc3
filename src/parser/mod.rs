//! Parser boundary: source text in, owned syntax tree out.
//!
//! The indexer never touches tree-sitter directly. A [`SourceParser`] turns a
//! file into an [`Ast`] whose nodes carry a closed [`AstKind`], so every
//! consumer matches node kinds exhaustively.

pub mod language;
mod php;

pub use language::SupportedLanguage;

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{DictoError, Result};

/// Turns source text into an [`Ast`].
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &Path, source: &str) -> Result<Ast>;
}

/// A parsed file: the top-level statements of the program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ast {
    pub nodes: Vec<AstNode>,
}

/// One node of the syntax tree with its line range (1-indexed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: AstKind,
    pub start_line: usize,
    pub end_line: usize,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: AstKind, start_line: usize, end_line: usize) -> Self {
        Self {
            kind,
            start_line,
            end_line,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }
}

/// The node kinds the indexer and the extractors care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstKind {
    /// `class Foo { ... }`
    Class { name: String },
    /// A method inside a class body.
    Method { name: String },
    /// A free function.
    Function { name: String },
    /// `$obj->method()` and `$obj?->method()`.
    MethodCall { method: Callee },
    /// `bar()`, `\Ns\bar()`, `$fn()`, `$arr[0]()`.
    FunctionCall { function: Callee },
    /// `global $a, $b;` with the names stripped of `$`.
    Global { names: Vec<String> },
    /// `@expr`
    ErrorSuppression,
    /// Anything else, by grammar node kind.
    Other(&'static str),
}

impl AstKind {
    /// Short name of the kind, used for listener dispatch and logging.
    pub fn name(&self) -> &'static str {
        match self {
            AstKind::Class { .. } => "class",
            AstKind::Method { .. } => "method",
            AstKind::Function { .. } => "function",
            AstKind::MethodCall { .. } => "method_call",
            AstKind::FunctionCall { .. } => "function_call",
            AstKind::Global { .. } => "global",
            AstKind::ErrorSuppression => "error_suppression",
            AstKind::Other(kind) => *kind,
        }
    }
}

/// The thing being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// A literal identifier. The only statically resolvable form.
    Named(String),
    /// A variable holding the name, e.g. `$fn()` or `$obj->$m()`.
    Variable,
    /// An array element, e.g. `$arr[0]()`.
    Subscript,
    /// Any other computed expression.
    Dynamic,
}

impl Callee {
    pub fn name(&self) -> Option<&str> {
        match self {
            Callee::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// Parser backed by tree-sitter grammars, routed by file extension.
#[derive(Debug, Clone, Default)]
pub struct TreeSitterParser {
    tolerate_syntax_errors: bool,
}

impl TreeSitterParser {
    pub fn new(tolerate_syntax_errors: bool) -> Self {
        Self {
            tolerate_syntax_errors,
        }
    }
}

impl SourceParser for TreeSitterParser {
    fn parse(&self, path: &Path, source: &str) -> Result<Ast> {
        let language = SupportedLanguage::from_path(path)
            .ok_or_else(|| DictoError::UnsupportedLanguage(path.display().to_string()))?;

        let mut parser = Parser::new();
        parser
            .set_language(&language.tree_sitter_language())
            .map_err(|e| DictoError::parse(path, e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| DictoError::parse(path, "parser produced no tree"))?;
        let root = tree.root_node();

        if !self.tolerate_syntax_errors {
            if let Some(bad) = first_error(root) {
                return Err(DictoError::parse(
                    path,
                    format!("syntax error at line {}", bad.start_position().row + 1),
                ));
            }
        }

        let nodes = match language {
            SupportedLanguage::Php => php::lower(root, source.as_bytes()),
        };
        Ok(Ast { nodes })
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language() {
        let parser = TreeSitterParser::default();
        let result = parser.parse(Path::new("main.lua"), "print('hello')");
        assert!(matches!(result, Err(DictoError::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_empty_source() {
        let parser = TreeSitterParser::default();
        let ast = parser.parse(Path::new("empty.php"), "").unwrap();
        assert!(ast.nodes.is_empty());
    }

    #[test]
    fn test_malformed_syntax_is_parse_error() {
        let parser = TreeSitterParser::default();
        let source = "<?php\nfunction broken( { class }}}\n";
        let err = parser.parse(Path::new("bad.php"), source).unwrap_err();
        assert!(matches!(err, DictoError::Parse { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_malformed_syntax_tolerated_when_configured() {
        let parser = TreeSitterParser::new(true);
        let source = "<?php\nfunction broken( { class }}}\n";
        assert!(parser.parse(Path::new("bad.php"), source).is_ok());
    }

    #[test]
    fn test_callee_name() {
        assert_eq!(Callee::Named("bar".into()).name(), Some("bar"));
        assert_eq!(Callee::Variable.name(), None);
        assert_eq!(Callee::Subscript.name(), None);
    }
}
