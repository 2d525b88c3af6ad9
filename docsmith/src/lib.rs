//! Core library for the docsmith docstring writer.
//!
//! docsmith finds Python functions and classes without a docstring, asks a
//! model to describe them and inserts the result without changing any other
//! byte of the file. Parsing goes into a lossless tree (`cst`), edits are
//! tree-to-tree (`edit`) and every run is checked against the original text
//! before anything is written.

// Allow common complexity warnings - these are intentional design choices
#![allow(
    clippy::type_complexity,
    clippy::too_many_arguments,
    clippy::ptr_arg,
    clippy::similar_names,
    clippy::format_push_string,
    clippy::map_unwrap_or,
    clippy::items_after_statements
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Lossless concrete syntax tree: parsing, node types and rendering.
pub mod cst;

/// Discovery of undocumented definitions.
pub mod locator;

/// Per-definition facts handed to the prompt builder.
pub mod context;

/// Prompt text and the JSON template the model fills in.
pub mod prompt;

/// Turns model responses into safe docstring payloads.
pub mod validator;

/// Docstring insertion and post-edit invariant checks.
pub mod edit;

/// The model capability and its Ollama implementation.
pub mod generator;

/// Per-file orchestration of the whole pipeline.
pub mod pipeline;

/// Module for loading configuration.
pub mod config;

/// Module containing utility functions.
pub mod utils;

/// Module defining the entry point logic shared by both binaries.
pub mod entry_point;

/// Module containing shared constants and regex patterns.
pub mod constants;

/// Module for rich CLI output formatting with colored text and progress bars.
pub mod output;

/// Module defining the command-line interface arguments and structs.
pub mod cli;

/// Module for handling CLI commands and their execution logic.
pub mod commands;
