//! CST (Concrete Syntax Tree) module.
//!
//! A full-fidelity Python tree that keeps every byte of the source:
//! - Tree-sitter supplies byte ranges, Ruff decides validity
//! - Whitespace and comments live in leading/trailing trivia slots
//! - Unmodelled syntax is kept as verbatim tokens
//!
//! # Design Principles
//!
//! - **Ruff decides, tree-sitter cuts**: invalid Python never reaches the builder
//! - **Cursor-built**: the builder slices the source with a single forward cursor
//! - **No back-edges**: indentation a parent would provide is stored on the node

mod builder;
mod parser;
mod render;
mod tree;

pub use parser::{parse, CstError, CstParser, SyntaxError};
pub use render::render;
pub use tree::{
    BlockLayout, DefHeader, ExprKind, LineEnding, NodeId, NodeKind, ParamKind, Parameter,
    SourceDocument, SyntaxElement, SyntaxNode,
};
