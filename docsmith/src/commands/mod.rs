//! Commands module - CLI command implementations.
//!
//! The engine never touches the file system; reading, writing and printing
//! happen here.

mod document;

pub use document::{document_file, run_document, DocumentOptions, FileOutcome, FileStatus};
