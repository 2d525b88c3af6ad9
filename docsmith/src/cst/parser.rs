//! Tree-sitter based CST parser for Python source code.
//!
//! Ruff decides whether the text is valid Python; tree-sitter provides the
//! byte ranges the lossless tree is cut from.

use std::fmt;

use tree_sitter::{Node, Parser};

use super::builder::TreeBuilder;
use super::tree::SourceDocument;
use crate::utils::LineIndex;

/// Location and message of the first syntax error in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column, in characters.
    pub column: usize,
    /// Byte offset.
    pub offset: usize,
    /// Human-readable description.
    pub message: String,
}

impl SyntaxError {
    fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = LineIndex::new(source).line_col(source, offset);
        Self {
            line,
            column,
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// Error during CST parsing
#[derive(Debug, thiserror::Error)]
pub enum CstError {
    /// The text is not valid Python.
    #[error("Syntax error at {0}")]
    Syntax(SyntaxError),
    /// Failed to create parser
    #[error("Failed to create CST parser: {0}")]
    ParserCreation(String),
    /// Tree-sitter gave up without producing a tree
    #[error("Failed to parse source as Python")]
    ParseFailed,
}

/// Tree-sitter based CST parser
pub struct CstParser {
    parser: Parser,
}

impl CstParser {
    /// Create a new CST parser for Python
    ///
    /// # Errors
    /// Returns error if parser creation fails
    pub fn new() -> Result<Self, CstError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| CstError::ParserCreation(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse source code into a lossless document.
    ///
    /// # Errors
    /// Returns [`CstError::Syntax`] for invalid Python, or a parser error if
    /// tree-sitter fails.
    pub fn parse(&mut self, source: &str) -> Result<SourceDocument, CstError> {
        if let Err(err) = ruff_python_parser::parse_module(source) {
            return Err(CstError::Syntax(SyntaxError::at(
                source,
                err.location.start().to_usize(),
                err.error.to_string(),
            )));
        }

        let tree = self
            .parser
            .parse(source, None)
            .ok_or(CstError::ParseFailed)?;
        let module = tree.root_node();

        // Constructs ruff accepts but the grammar cannot place would leave the
        // tree without reliable ranges.
        if let Some(bad) = first_error(module) {
            let message = if bad.is_missing() {
                format!("missing {}", bad.kind())
            } else {
                "unsupported syntax".to_owned()
            };
            return Err(CstError::Syntax(SyntaxError::at(
                source,
                bad.start_byte(),
                message,
            )));
        }

        let (root, next_id) = TreeBuilder::new(source).build(module);
        Ok(SourceDocument::new(source.to_owned(), root, next_id))
    }
}

/// Parses `source` with a fresh parser.
///
/// # Errors
/// See [`CstParser::parse`].
pub fn parse(source: &str) -> Result<SourceDocument, CstError> {
    CstParser::new()?.parse(source)
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
    children.into_iter().find_map(first_error).or(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{NodeKind, SyntaxNode};

    fn defs(node: &SyntaxNode, out: &mut Vec<String>) {
        if let Some(header) = node.header() {
            out.push(header.name.clone());
        }
        for child in node.child_nodes() {
            defs(child, out);
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let source = "def foo():\n    pass\n";
        let doc = parse(source).unwrap();
        assert!(matches!(doc.root().kind(), NodeKind::Module));
        let mut names = Vec::new();
        defs(doc.root(), &mut names);
        assert_eq!(names, vec!["foo".to_owned()]);
        assert_eq!(doc.root().text(), source);
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse("x = 1\ndef f(:\n    pass\n").unwrap_err();
        match err {
            CstError::Syntax(syntax) => {
                assert_eq!(syntax.line, 2);
                assert!(syntax.column >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_empty_source() {
        let doc = parse("").unwrap();
        assert_eq!(doc.root().text(), "");
        assert_eq!(doc.root().child_nodes().count(), 0);
    }

    #[test]
    fn test_nested_definitions_found() {
        let source = "class A:\n    @staticmethod\n    def s():\n        def inner():\n            pass\n        return inner\n";
        let doc = parse(source).unwrap();
        let mut names = Vec::new();
        defs(doc.root(), &mut names);
        assert_eq!(names, vec!["A", "s", "inner"]);
        assert_eq!(doc.root().text(), source);
    }
}
