use crate::cli::Cli;
use crate::commands::{run_document, DocumentOptions};
use crate::config::{Config, DocsmithConfig};
use crate::constants::{DEFAULT_MODEL, DEFAULT_SUMMARY_CHARS, DEFAULT_TIMEOUT_SECS};
use crate::generator::OllamaGenerator;
use crate::locator::LocatorFilter;
use crate::pipeline::{CancellationToken, EngineOptions, OutputMode};

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

/// Runs docsmith with the given arguments.
///
/// # Errors
///
/// Returns an error if argument parsing fails, or if the command execution fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Run docsmith with the given arguments, writing output to the specified writer.
///
/// This is the testable version of `run_with_args` that allows output capture.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["docsmith".to_owned()];
    program_args.extend(args);
    let cli_var = match Cli::try_parse_from(program_args) {
        Ok(c) => c,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                write!(writer, "{e}")?;
                writer.flush()?;
                return Ok(0);
            }
            _ => {
                eprint!("{e}");
                return Ok(1);
            }
        },
    };

    for path in &cli_var.paths {
        if !path.exists() {
            eprintln!(
                "Error: The file or directory '{}' does not exist.",
                path.display()
            );
            return Ok(1);
        }
    }

    // Load config from the first path or current directory
    let config_path = cli_var
        .paths
        .first()
        .map_or(std::path::Path::new("."), std::path::PathBuf::as_path);
    let config = Config::load_from_path(config_path);
    let options = resolve_options(&cli_var, &config.docsmith);
    let host = OllamaGenerator::resolve_host(
        cli_var
            .model
            .host
            .as_deref()
            .or(config.docsmith.host.as_deref()),
    );
    let timeout = Duration::from_secs(
        cli_var
            .model
            .timeout
            .or(config.docsmith.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    if cli_var.output.verbose {
        eprintln!("[VERBOSE] docsmith v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("[VERBOSE] Using {} threads", rayon::current_num_threads());
        if let Some(path) = &config.config_file_path {
            eprintln!("[VERBOSE] Config: {}", path.display());
        }
        eprintln!(
            "[VERBOSE] Model: {} at {host} (timeout {}s)",
            options.engine.model,
            timeout.as_secs()
        );
        eprintln!("[VERBOSE] Layout: {}", options.engine.layout);
        crate::output::print_exclusion_list(&mut std::io::stderr(), &options.exclude)?;
        eprintln!();
    }

    let generator = OllamaGenerator::new(&host, timeout);
    run_document(
        &cli_var.paths,
        &generator,
        &options,
        &CancellationToken::new(),
        writer,
    )
}

/// Merges CLI flags over config file values over built-in defaults.
fn resolve_options(cli: &Cli, config: &DocsmithConfig) -> DocumentOptions {
    let mode = if cli.output.diff {
        OutputMode::Preview
    } else {
        OutputMode::WriteBack
    };
    let filter = LocatorFilter {
        skip_private: cli.docstrings.skip_private || config.skip_private.unwrap_or(false),
        skip_dunder: cli.docstrings.skip_dunder || config.skip_dunder.unwrap_or(false),
    };

    let mut exclude = config.exclude_folders.clone().unwrap_or_default();
    exclude.extend(cli.exclude_folders.iter().cloned());

    DocumentOptions {
        engine: EngineOptions {
            model: cli
                .model
                .model
                .clone()
                .or_else(|| config.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            layout: cli.docstrings.layout.or(config.layout).unwrap_or_default(),
            filter,
            max_summary_chars: config.max_summary_chars.unwrap_or(DEFAULT_SUMMARY_CHARS),
            include_related: config.include_related.unwrap_or(true),
            mode,
        },
        print_only: cli.output.output_only,
        exclude,
        verbose: cli.output.verbose,
    }
}
