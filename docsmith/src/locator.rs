//! Definition discovery.
//!
//! Walks the lossless tree in pre-order (outer before nested, siblings left
//! to right) and yields the function and class definitions whose body does
//! not start with a docstring.

use crate::cst::{DefHeader, NodeId, NodeKind, SourceDocument, SyntaxNode};

/// Whether a definition is a function or a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
    /// `def` or `async def`.
    Function,
    /// `class`.
    Class,
}

impl DefKind {
    /// Lowercase name used in prompts and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
        }
    }
}

/// A borrowed view of a definition node.
#[derive(Debug, Clone, Copy)]
pub struct Definition<'a> {
    /// Identity of the definition node.
    pub id: NodeId,
    /// Function or class.
    pub kind: DefKind,
    /// Header facts captured at parse time.
    pub header: &'a DefHeader,
    /// The definition node itself (decorators included).
    pub node: &'a SyntaxNode,
    /// First body statement is a string literal.
    pub has_docstring: bool,
}

impl<'a> Definition<'a> {
    /// Views `node` as a definition, if it is one.
    #[must_use]
    pub fn from_node(node: &'a SyntaxNode) -> Option<Self> {
        let (kind, header) = match node.kind() {
            NodeKind::FunctionDef(header) => (DefKind::Function, header.as_ref()),
            NodeKind::ClassDef(header) => (DefKind::Class, header.as_ref()),
            _ => return None,
        };
        Some(Self {
            id: node.id(),
            kind,
            header,
            node,
            has_docstring: has_docstring(node),
        })
    }

    /// Definition name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.header.name
    }
}

/// Whether the body of `def` starts with a bare string-literal statement.
#[must_use]
pub fn has_docstring(def: &SyntaxNode) -> bool {
    def.body()
        .and_then(|body| body.child_nodes().next())
        .is_some_and(SyntaxNode::is_docstring_statement)
}

/// `__name__` style names.
#[must_use]
pub fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// `_name` style names that are not dunders.
#[must_use]
pub fn is_private(name: &str) -> bool {
    name.starts_with('_') && !is_dunder(name)
}

/// Name-based filters applied by the [`Locator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocatorFilter {
    /// Skip `_private` names.
    pub skip_private: bool,
    /// Skip `__dunder__` names.
    pub skip_dunder: bool,
}

impl LocatorFilter {
    /// Whether a definition named `name` passes the filter.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        !((self.skip_private && is_private(name)) || (self.skip_dunder && is_dunder(name)))
    }
}

/// Every definition in pre-order, documented or not.
#[derive(Debug, Clone)]
pub struct Definitions<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Definitions<'a> {
    /// Starts a walk at `root`.
    #[must_use]
    pub fn new(root: &'a SyntaxNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for Definitions<'a> {
    type Item = Definition<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            self.stack.extend(node.child_nodes().rev());
            if let Some(def) = Definition::from_node(node) {
                return Some(def);
            }
        }
        None
    }
}

/// Lazy sequence of undocumented definitions.
///
/// A clone resumes from the same position; [`Locator::new`] starts over
/// from the top of the document.
#[derive(Debug, Clone)]
pub struct Locator<'a> {
    walk: Definitions<'a>,
    filter: LocatorFilter,
}

impl<'a> Locator<'a> {
    /// Locates undocumented definitions in `doc`.
    #[must_use]
    pub fn new(doc: &'a SourceDocument) -> Self {
        Self {
            walk: Definitions::new(doc.root()),
            filter: LocatorFilter::default(),
        }
    }

    /// Applies name filters.
    #[must_use]
    pub fn with_filter(mut self, filter: LocatorFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl<'a> Iterator for Locator<'a> {
    type Item = Definition<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.walk
            .by_ref()
            .find(|def| !def.has_docstring && filter.admits(def.name()))
    }
}
