//! Docstring insertion.
//!
//! An insertion touches exactly one child list (the definition body) and
//! the trivia of the node it adds. The splice itself is a single
//! `Vec::insert`, so a failed insertion leaves the tree untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::replay::Splice;
use crate::cst::{ExprKind, LineEnding, NodeId, NodeKind, SourceDocument, SyntaxElement, SyntaxNode};
use crate::locator::has_docstring;
use crate::validator::Docstring;

/// Where the quotes go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocstringLayout {
    /// Summary on the opening line; closing quotes on their own line when
    /// the text spans several lines.
    #[default]
    Pep257,
    /// Opening and closing quotes on their own lines.
    Block,
}

impl FromStr for DocstringLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pep257" => Ok(Self::Pep257),
            "block" => Ok(Self::Block),
            other => Err(format!("unknown layout '{other}' (expected pep257 or block)")),
        }
    }
}

impl fmt::Display for DocstringLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pep257 => "pep257",
            Self::Block => "block",
        })
    }
}

/// A pending edit, consumed once by [`insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocstringInsertion {
    /// The definition to document.
    pub target: NodeId,
    /// Validated docstring.
    pub docstring: Docstring,
    /// Quote placement.
    pub layout: DocstringLayout,
}

/// What an insertion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionReceipt {
    /// The documented definition.
    pub target: NodeId,
    /// Its name.
    pub name: String,
    /// 1-indexed line of its `def`/`class` keyword.
    pub line: usize,
    /// Byte offset in the original text where the new text goes.
    pub offset: usize,
    /// The inserted text, trivia included.
    pub text: String,
}

impl InsertionReceipt {
    /// The insertion as a splice of the original text.
    #[must_use]
    pub fn splice(&self) -> Splice {
        Splice::new(self.offset, self.text.clone())
    }
}

/// Why a target cannot take a docstring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    /// No node with this id.
    #[error("no node with id {0:?}")]
    UnknownTarget(NodeId),
    /// The node is not a function or class.
    #[error("node is not a definition")]
    NotADefinition,
    /// The definition has no statements to precede.
    #[error("definition has no body")]
    MissingBody,
    /// The body already starts with a docstring.
    #[error("'{0}' already has a docstring")]
    AlreadyDocumented(String),
    /// The first body statement was itself inserted, so it has no original offset.
    #[error("body start has no position in the original text")]
    Unanchored,
}

/// Renders the literal. `indent` prefixes every continuation line and the
/// closing quotes when they sit on their own line.
#[must_use]
pub fn render_literal(
    docstring: &Docstring,
    layout: DocstringLayout,
    indent: &str,
    newline: &str,
) -> String {
    let open = docstring.quote_style.open();
    let close = docstring.quote_style.close();
    let indented = |line: &str| {
        if line.is_empty() {
            String::new()
        } else {
            format!("{indent}{line}")
        }
    };

    let mut out = open;
    match layout {
        DocstringLayout::Pep257 => {
            let mut lines = docstring.body_lines.iter();
            if let Some(first) = lines.next() {
                out.push_str(first);
            }
            if !docstring.is_single_line() {
                for line in lines {
                    out.push_str(newline);
                    out.push_str(&indented(line));
                }
                out.push_str(newline);
                out.push_str(indent);
            }
        }
        DocstringLayout::Block => {
            for line in &docstring.body_lines {
                out.push_str(newline);
                out.push_str(&indented(line));
            }
            out.push_str(newline);
            out.push_str(indent);
        }
    }
    out.push_str(close);
    out
}

/// Everything needed to splice, computed before the tree is borrowed mutably.
struct Plan {
    name: String,
    line: usize,
    offset: usize,
    leading: String,
    literal: String,
    trailing: String,
}

fn plan(doc: &SourceDocument, insertion: &DocstringInsertion) -> Result<Plan, InsertError> {
    let target = doc
        .find(insertion.target)
        .ok_or(InsertError::UnknownTarget(insertion.target))?;
    let header = target.header().ok_or(InsertError::NotADefinition)?;
    let body = target.body().ok_or(InsertError::MissingBody)?;
    if has_docstring(target) {
        return Err(InsertError::AlreadyDocumented(header.name.clone()));
    }
    let first = body.child_nodes().next().ok_or(InsertError::MissingBody)?;
    let offset = first.origin().ok_or(InsertError::Unanchored)?;

    let body_indent = match body.kind() {
        NodeKind::Block(layout) => layout.body_indent.clone(),
        _ => None,
    };
    let header_ending = LineEnding::suffix_of(body.leading());

    let (leading, literal, trailing) = match (body_indent, header_ending) {
        // Body starts on its own line: reuse its indentation and the
        // header line's terminator.
        (Some(indent), Some(ending)) => {
            let literal = render_literal(
                &insertion.docstring,
                insertion.layout,
                &indent,
                ending.as_str(),
            );
            (indent, literal, ending.as_str().to_owned())
        }
        // Body shares the header line: `def f(): """Doc."""; pass`.
        _ => {
            let indent = format!("{}{}", header.indent, doc.indent_unit());
            let newline = doc.line_ending().as_str();
            let literal = render_literal(&insertion.docstring, insertion.layout, &indent, newline);
            (String::new(), literal, "; ".to_owned())
        }
    };

    Ok(Plan {
        name: header.name.clone(),
        line: header.line,
        offset,
        leading,
        literal,
        trailing,
    })
}

/// Inserts a docstring as the first statement of the target's body.
///
/// # Errors
/// Returns [`InsertError`] when the target cannot take a docstring; the
/// document is unchanged in that case.
pub fn insert(
    doc: &mut SourceDocument,
    insertion: &DocstringInsertion,
) -> Result<InsertionReceipt, InsertError> {
    let plan = plan(doc, insertion)?;
    let text = format!("{}{}{}", plan.leading, plan.literal, plan.trailing);

    let expr = SyntaxNode {
        id: doc.allocate_id(),
        kind: NodeKind::Expression(ExprKind::StringLiteral),
        leading: String::new(),
        children: vec![SyntaxElement::Token(plan.literal)],
        trailing: String::new(),
        origin: None,
    };
    let statement = SyntaxNode {
        id: doc.allocate_id(),
        kind: NodeKind::Statement,
        leading: plan.leading,
        children: vec![SyntaxElement::Node(expr)],
        trailing: plan.trailing,
        origin: None,
    };

    let body = doc
        .find_mut(insertion.target)
        .and_then(SyntaxNode::body_mut)
        .ok_or(InsertError::MissingBody)?;
    body.children.insert(0, SyntaxElement::Node(statement));

    Ok(InsertionReceipt {
        target: insertion.target,
        name: plan.name,
        line: plan.line,
        offset: plan.offset,
        text,
    })
}

/// Pure form of [`insert`]: returns the edited document.
///
/// # Errors
/// See [`insert`].
pub fn apply(
    mut doc: SourceDocument,
    insertion: &DocstringInsertion,
) -> Result<SourceDocument, InsertError> {
    insert(&mut doc, insertion)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::render;
    use crate::locator::Locator;
    use crate::validator::validate;

    fn document(source: &str, layout: DocstringLayout, response: &str) -> String {
        let mut doc = SourceDocument::parse(source).unwrap();
        let targets: Vec<NodeId> = Locator::new(&doc).map(|d| d.id).collect();
        for target in targets {
            let insertion = DocstringInsertion {
                target,
                docstring: validate(response).unwrap(),
                layout,
            };
            insert(&mut doc, &insertion).unwrap();
        }
        render(&doc)
    }

    #[test]
    fn test_single_line_insert() {
        let out = document(
            "def add(a, b):\n    return a + b\n",
            DocstringLayout::Pep257,
            "Add numbers.",
        );
        assert_eq!(out, "def add(a, b):\n    \"\"\"Add numbers.\"\"\"\n    return a + b\n");
    }

    #[test]
    fn test_multi_line_layouts() {
        let source = "class A:\n\tx = 1\n";
        let pep = document(source, DocstringLayout::Pep257, "Summary.\n\nDetail.");
        assert_eq!(pep, "class A:\n\t\"\"\"Summary.\n\n\tDetail.\n\t\"\"\"\n\tx = 1\n");

        let block = document(source, DocstringLayout::Block, "Summary.");
        assert_eq!(block, "class A:\n\t\"\"\"\n\tSummary.\n\t\"\"\"\n\tx = 1\n");
    }

    #[test]
    fn test_uses_body_indentation_not_header() {
        let source = "if True:\n  def f():\n        pass\n";
        let out = document(source, DocstringLayout::Pep257, "Doc.");
        assert_eq!(out, "if True:\n  def f():\n        \"\"\"Doc.\"\"\"\n        pass\n");
    }

    #[test]
    fn test_crlf_header_line() {
        let source = "def f():  # note\r\n    pass\r\n";
        let out = document(source, DocstringLayout::Pep257, "Doc.\n\nMore.");
        assert_eq!(
            out,
            "def f():  # note\r\n    \"\"\"Doc.\r\n\r\n    More.\r\n    \"\"\"\r\n    pass\r\n"
        );
    }

    #[test]
    fn test_inline_body() {
        let out = document("def f(): pass\n", DocstringLayout::Pep257, "Doc.");
        assert_eq!(out, "def f(): \"\"\"Doc.\"\"\"; pass\n");
    }

    #[test]
    fn test_comment_before_first_statement_kept_in_place() {
        let source = "def f():\n\n    # why\n    return 1\n";
        let out = document(source, DocstringLayout::Pep257, "Doc.");
        assert_eq!(out, "def f():\n    \"\"\"Doc.\"\"\"\n\n    # why\n    return 1\n");
    }

    #[test]
    fn test_receipt_and_errors() {
        let mut doc = SourceDocument::parse("x = 1\ndef f():\n    pass\n").unwrap();
        let target = Locator::new(&doc).next().unwrap().id;
        let insertion = DocstringInsertion {
            target,
            docstring: validate("Doc.").unwrap(),
            layout: DocstringLayout::Pep257,
        };
        let receipt = insert(&mut doc, &insertion).unwrap();
        assert_eq!(receipt.name, "f");
        assert_eq!(receipt.line, 2);
        assert_eq!(receipt.offset, 15);
        assert_eq!(receipt.text, "    \"\"\"Doc.\"\"\"\n");

        assert_eq!(
            insert(&mut doc, &insertion),
            Err(InsertError::AlreadyDocumented("f".to_owned()))
        );
        let module = doc.root().id();
        let bad = DocstringInsertion { target: module, ..insertion.clone() };
        assert_eq!(insert(&mut doc, &bad), Err(InsertError::NotADefinition));
    }

    #[test]
    fn test_apply_is_pure() {
        let doc = SourceDocument::parse("def f():\n    pass\n").unwrap();
        let target = Locator::new(&doc).next().unwrap().id;
        let insertion = DocstringInsertion {
            target,
            docstring: validate("Doc.").unwrap(),
            layout: DocstringLayout::Block,
        };
        let edited = apply(doc.clone(), &insertion).unwrap();
        assert_eq!(render(&doc), "def f():\n    pass\n");
        assert_eq!(render(&edited), "def f():\n    \"\"\"\n    Doc.\n    \"\"\"\n    pass\n");
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!("Block".parse::<DocstringLayout>(), Ok(DocstringLayout::Block));
        assert!("fancy".parse::<DocstringLayout>().is_err());
        assert_eq!(DocstringLayout::default().to_string(), "pep257");
    }
}
