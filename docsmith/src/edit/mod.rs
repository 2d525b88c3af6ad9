//! Tree editing.
//!
//! This module provides the write side of the engine:
//! - Docstring insertion into definition bodies
//! - Splice replay of the recorded insertions onto the original text
//! - Post-edit invariant checks backed by the Ruff parser
//!
//! The editor never renders; it only changes child lists and trivia.

mod editor;
mod invariants;
mod replay;

pub use editor::{
    apply, insert, render_literal, DocstringInsertion, DocstringLayout, InsertError,
    InsertionReceipt,
};
pub use invariants::{documented_definitions, verify, InvariantError};
pub use replay::{ReplayError, Splice, SpliceReplay};
