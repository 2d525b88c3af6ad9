//! Prompt context extraction.
//!
//! Everything here is a pure function of the tree: nothing is written back.

use crate::constants::MAX_RELATED;
use crate::cst::{Parameter, SourceDocument, SyntaxElement, SyntaxNode};
use crate::locator::{DefKind, Definition};
use crate::utils::{collapse_whitespace, truncate_chars};

/// A top-level definition referenced from the documented one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedDefinition {
    /// Definition name.
    pub name: String,
    /// Function or class.
    pub kind: DefKind,
    /// Collapsed, bounded source of the definition.
    pub snippet: String,
}

/// What the prompt builder knows about a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Definition name.
    pub name: String,
    /// Function or class.
    pub kind: DefKind,
    /// `async def`.
    pub is_async: bool,
    /// Defined directly in a class body.
    pub is_method: bool,
    /// Header from keyword to colon, whitespace collapsed.
    pub signature: String,
    /// Parameters in declaration order.
    pub params: Vec<Parameter>,
    /// Return annotation source.
    pub return_annotation: Option<String>,
    /// Class argument list.
    pub bases: Option<String>,
    /// Decorator lines.
    pub decorators: Vec<String>,
    /// Contains `return <expr>` outside nested scopes.
    pub returns_value: bool,
    /// Collapsed, bounded body text.
    pub body_summary: String,
    /// Comment lines directly above the definition.
    pub leading_comments: Vec<String>,
    /// Referenced top-level definitions.
    pub related: Vec<RelatedDefinition>,
}

impl Context {
    /// A minimal function context for tests.
    #[cfg(test)]
    pub(crate) fn stub(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: DefKind::Function,
            is_async: false,
            is_method: false,
            signature: format!("def {name}()"),
            params: Vec::new(),
            return_annotation: None,
            bases: None,
            decorators: Vec::new(),
            returns_value: false,
            body_summary: "pass".to_owned(),
            leading_comments: Vec::new(),
            related: Vec::new(),
        }
    }
}

/// Extracts the context of `def`. `related` is left empty.
#[must_use]
pub fn extract(def: &Definition<'_>, max_chars: usize) -> Context {
    let header = def.header;
    let body_summary = def
        .node
        .body()
        .map(|body| truncate_chars(&collapse_whitespace(&body.text()), max_chars))
        .unwrap_or_default();

    Context {
        name: header.name.clone(),
        kind: def.kind,
        is_async: header.is_async,
        is_method: header.is_method,
        signature: collapse_whitespace(&header.signature),
        params: header.params.clone(),
        return_annotation: header.return_annotation.clone(),
        bases: header.bases.clone(),
        decorators: header.decorators.iter().map(|d| collapse_whitespace(d)).collect(),
        returns_value: header.returns_value,
        body_summary,
        leading_comments: leading_comments(def.node.leading()),
        related: Vec::new(),
    }
}

/// Extracts the context of `def` including related top-level definitions.
#[must_use]
pub fn extract_with_related(
    doc: &SourceDocument,
    def: &Definition<'_>,
    max_chars: usize,
) -> Context {
    let mut ctx = extract(def, max_chars);
    ctx.related = related_definitions(doc, def, max_chars);
    ctx
}

/// Top-level definitions of the module that `def` calls or names in an
/// annotation, in reference order.
#[must_use]
pub fn related_definitions(
    doc: &SourceDocument,
    def: &Definition<'_>,
    max_chars: usize,
) -> Vec<RelatedDefinition> {
    let top_level: Vec<Definition<'_>> = doc
        .root()
        .child_nodes()
        .filter_map(Definition::from_node)
        .filter(|candidate| candidate.id != def.id)
        .collect();

    def.header
        .references
        .iter()
        .filter_map(|name| top_level.iter().find(|candidate| candidate.name() == name))
        .take(MAX_RELATED)
        .map(|related| RelatedDefinition {
            name: related.name().to_owned(),
            kind: related.kind,
            snippet: truncate_chars(
                &collapse_whitespace(&without_leading(related.node)),
                max_chars,
            ),
        })
        .collect()
}

/// Node text minus its leading trivia.
fn without_leading(node: &SyntaxNode) -> String {
    let mut out = String::new();
    for child in node.children() {
        match child {
            SyntaxElement::Token(text) => out.push_str(text),
            SyntaxElement::Node(inner) => inner.write_to(&mut out),
        }
    }
    out
}

/// Contiguous comment lines at the end of a leading-trivia slot.
fn leading_comments(trivia: &str) -> Vec<String> {
    let mut lines: Vec<&str> = trivia.lines().collect();
    // The last piece is the definition's own indentation.
    if lines.last().is_some_and(|last| last.trim().is_empty()) && !trivia.ends_with('\n') {
        lines.pop();
    }
    let mut comments: Vec<String> = lines
        .iter()
        .rev()
        .map(|line| line.trim())
        .take_while(|line| line.starts_with('#'))
        .map(str::to_owned)
        .collect();
    comments.reverse();
    comments
}
