//! Lossless syntax tree.
//!
//! Every byte of the source lives in exactly one place: a node's leading
//! trivia, one of its verbatim tokens, or its trailing trivia. Rendering is
//! plain concatenation in document order, so an untouched tree renders back
//! to the exact input.

use rustc_hash::FxHashMap;

use crate::constants::DEFAULT_INDENT_UNIT;

/// Stable identity of a node within one document.
///
/// Ids survive edits: inserting a statement never renumbers existing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Line terminator convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl LineEnding {
    /// The terminator text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// The most frequent terminator in `text`, `Lf` when there is none.
    #[must_use]
    pub fn dominant(text: &str) -> Self {
        let bytes = text.as_bytes();
        let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    crlf += 1;
                    i += 1;
                }
                b'\r' => cr += 1,
                b'\n' => lf += 1,
                _ => {}
            }
            i += 1;
        }
        if crlf > lf && crlf >= cr {
            Self::CrLf
        } else if cr > lf && cr > crlf {
            Self::Cr
        } else {
            Self::Lf
        }
    }

    /// The terminator `text` ends with, if any.
    #[must_use]
    pub fn suffix_of(text: &str) -> Option<Self> {
        if text.ends_with("\r\n") {
            Some(Self::CrLf)
        } else if text.ends_with('\n') {
            Some(Self::Lf)
        } else if text.ends_with('\r') {
            Some(Self::Cr)
        } else {
            None
        }
    }
}

/// Expression flavours the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// A plain or implicitly concatenated `str` literal (no f/b/t prefix).
    StringLiteral,
    /// Anything else.
    Other,
}

/// How a parameter binds arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Declared before a `/` separator.
    PositionalOnly,
    /// Ordinary positional-or-keyword parameter.
    Regular,
    /// `*args`
    VarPositional,
    /// Declared after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// A parameter in a function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Bare name, without `*`/`**`.
    pub name: String,
    /// Annotation source text.
    pub annotation: Option<String>,
    /// Default value source text.
    pub default: Option<String>,
    /// Binding kind.
    pub kind: ParamKind,
}

impl Parameter {
    /// Name as written in a signature (`*args`, `**kwargs`, `x`).
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind {
            ParamKind::VarPositional => format!("*{}", self.name),
            ParamKind::VarKeyword => format!("**{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Facts about a `def`/`class` header captured at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefHeader {
    /// Definition name.
    pub name: String,
    /// `async def`.
    pub is_async: bool,
    /// Function defined directly in a class body.
    pub is_method: bool,
    /// Header source from the keyword to the colon (decorators excluded).
    pub signature: String,
    /// Parameters in declaration order (empty for classes).
    pub params: Vec<Parameter>,
    /// Return annotation source.
    pub return_annotation: Option<String>,
    /// Class argument list without the parentheses.
    pub bases: Option<String>,
    /// Decorator source lines, `@` included.
    pub decorators: Vec<String>,
    /// Leading whitespace of the line holding the `def`/`class` keyword.
    pub indent: String,
    /// 1-indexed line of the keyword.
    pub line: usize,
    /// Contains `return <expr>` outside nested scopes.
    pub returns_value: bool,
    /// Names called or used in annotations inside the definition.
    pub references: Vec<String>,
}

/// Layout facts about a suite of statements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockLayout {
    /// Exact whitespace before the first statement, when that statement
    /// starts its own line. `None` for bodies on the header line.
    pub body_indent: Option<String>,
}

/// Node kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The whole file.
    Module,
    /// `class` definition, decorators included.
    ClassDef(Box<DefHeader>),
    /// `def`/`async def` definition, decorators included.
    FunctionDef(Box<DefHeader>),
    /// An indented (or inline) suite.
    Block(BlockLayout),
    /// A simple or compound statement.
    Statement,
    /// An expression worth modelling on its own.
    Expression(ExprKind),
}

/// A child of a node: verbatim text or a nested node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    /// Verbatim source text that is not modelled further.
    Token(String),
    /// A nested node.
    Node(SyntaxNode),
}

/// A node of the lossless tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) leading: String,
    pub(crate) children: Vec<SyntaxElement>,
    pub(crate) trailing: String,
    pub(crate) origin: Option<usize>,
}

impl SyntaxNode {
    /// Identity of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Kind of this node.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Trivia rendered before the node's children.
    #[must_use]
    pub fn leading(&self) -> &str {
        &self.leading
    }

    /// Trivia rendered after the node's children.
    #[must_use]
    pub fn trailing(&self) -> &str {
        &self.trailing
    }

    /// Children in document order.
    #[must_use]
    pub fn children(&self) -> &[SyntaxElement] {
        &self.children
    }

    /// Byte offset in the original text where this node's leading trivia
    /// starts; `None` for nodes created by an edit.
    #[must_use]
    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    /// Child nodes, skipping tokens.
    pub fn child_nodes(&self) -> impl DoubleEndedIterator<Item = &SyntaxNode> + '_ {
        self.children.iter().filter_map(|child| match child {
            SyntaxElement::Node(node) => Some(node),
            SyntaxElement::Token(_) => None,
        })
    }

    /// Header facts for definitions.
    #[must_use]
    pub fn header(&self) -> Option<&DefHeader> {
        match &self.kind {
            NodeKind::ClassDef(header) | NodeKind::FunctionDef(header) => Some(&**header),
            _ => None,
        }
    }

    /// The suite of a definition.
    #[must_use]
    pub fn body(&self) -> Option<&SyntaxNode> {
        self.header()?;
        self.child_nodes()
            .find(|node| matches!(node.kind, NodeKind::Block(_)))
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut SyntaxNode> {
        self.header()?;
        self.children.iter_mut().find_map(|child| match child {
            SyntaxElement::Node(node) if matches!(node.kind, NodeKind::Block(_)) => Some(node),
            _ => None,
        })
    }

    /// Whether this is an expression statement consisting of a string literal.
    #[must_use]
    pub fn is_docstring_statement(&self) -> bool {
        matches!(self.kind, NodeKind::Statement)
            && matches!(
                self.children.as_slice(),
                [SyntaxElement::Node(expr)]
                    if expr.kind == NodeKind::Expression(ExprKind::StringLiteral)
            )
    }

    /// Appends the verbatim text of this subtree to `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push_str(&self.leading);
        for child in &self.children {
            match child {
                SyntaxElement::Token(text) => out.push_str(text),
                SyntaxElement::Node(node) => node.write_to(out),
            }
        }
        out.push_str(&self.trailing);
    }

    /// The verbatim text of this subtree.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Pre-order search by id.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&SyntaxNode> {
        if self.id == id {
            return Some(self);
        }
        self.child_nodes().find_map(|child| child.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: NodeId) -> Option<&mut SyntaxNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            SyntaxElement::Node(node) => node.find_mut(id),
            SyntaxElement::Token(_) => None,
        })
    }
}

/// A parsed file: the original text and its lossless tree.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    source: String,
    root: SyntaxNode,
    indent_unit: String,
    line_ending: LineEnding,
    next_id: u32,
}

impl SourceDocument {
    pub(crate) fn new(source: String, root: SyntaxNode, next_id: u32) -> Self {
        let indent_unit = dominant_indent_unit(&root);
        let line_ending = LineEnding::dominant(&source);
        Self {
            source,
            root,
            indent_unit,
            line_ending,
            next_id,
        }
    }

    /// Parses `text` into a document.
    ///
    /// # Errors
    /// Returns an error if the text is not valid Python or the grammar
    /// cannot be loaded.
    pub fn parse(text: &str) -> Result<Self, super::CstError> {
        super::CstParser::new()?.parse(text)
    }

    /// The text this document was parsed from.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.source
    }

    /// The module node.
    #[must_use]
    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// The file's dominant indent step (e.g. four spaces or a tab).
    #[must_use]
    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    /// The file's dominant line terminator.
    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Looks a node up by id.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.root.find(id)
    }

    pub(crate) fn find_mut(&mut self, id: NodeId) -> Option<&mut SyntaxNode> {
        self.root.find_mut(id)
    }

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Picks the most common gap between a definition's header indentation and
/// its body indentation.
fn dominant_indent_unit(root: &SyntaxNode) -> String {
    fn collect(node: &SyntaxNode, counts: &mut FxHashMap<String, usize>) {
        if let (Some(header), Some(body)) = (node.header(), node.body()) {
            if let NodeKind::Block(BlockLayout {
                body_indent: Some(indent),
            }) = &body.kind
            {
                if let Some(step) = indent.strip_prefix(header.indent.as_str()) {
                    if !step.is_empty() {
                        *counts.entry(step.to_owned()).or_default() += 1;
                    }
                }
            }
        }
        for child in node.child_nodes() {
            collect(child, counts);
        }
    }

    let mut counts = FxHashMap::default();
    collect(root, &mut counts);
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // Highest count first; ties go to the lexicographically smallest step so
    // the choice never depends on hash order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .next()
        .map_or_else(|| DEFAULT_INDENT_UNIT.to_owned(), |(step, _)| step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_line_ending() {
        assert_eq!(LineEnding::dominant("a\r\nb\r\nc\n"), LineEnding::CrLf);
        assert_eq!(LineEnding::dominant("a\nb\n"), LineEnding::Lf);
        assert_eq!(LineEnding::dominant("abc"), LineEnding::Lf);
        assert_eq!(LineEnding::dominant("a\rb\r"), LineEnding::Cr);
    }

    #[test]
    fn test_suffix_of() {
        assert_eq!(LineEnding::suffix_of("  # c\r\n"), Some(LineEnding::CrLf));
        assert_eq!(LineEnding::suffix_of("\n"), Some(LineEnding::Lf));
        assert_eq!(LineEnding::suffix_of(" "), None);
    }

    #[test]
    fn test_indent_unit_learned_from_bodies() {
        let doc =
            SourceDocument::parse("def f():\n  return 1\n\nclass A:\n  def g(self):\n    pass\n")
                .unwrap();
        assert_eq!(doc.indent_unit(), "  ");
    }

    #[test]
    fn test_indent_unit_defaults_without_bodies() {
        let doc = SourceDocument::parse("x = 1\n").unwrap();
        assert_eq!(doc.indent_unit(), DEFAULT_INDENT_UNIT);
    }

    #[test]
    fn test_find_by_id() {
        let doc = SourceDocument::parse("def f():\n    pass\n").unwrap();
        let def = doc.root().child_nodes().next().unwrap();
        let found = doc.find(def.id()).unwrap();
        assert_eq!(found.header().unwrap().name, "f");
    }
}
