//! The document command: runs the engine over files and directories.

use crate::generator::Generator;
use crate::output;
use crate::pipeline::{CancellationToken, EngineOptions, Orchestrator, OutputMode, Skipped};
use crate::utils::{collect_python_files, normalize_display_path};

use anyhow::Result;
use colored::Colorize;
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options for the document command.
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    /// Engine settings shared by every file.
    pub engine: EngineOptions,
    /// Print the documented text instead of writing it back.
    pub print_only: bool,
    /// Folders skipped while walking directories.
    pub exclude: Vec<String>,
    /// Verbose output.
    pub verbose: bool,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Docstrings were written back.
    Written,
    /// Text or diff was printed.
    Printed,
    /// Nothing to insert.
    Unchanged,
    /// Read, parse, invariant or write failure.
    Failed(String),
}

/// Result of documenting one file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// The file.
    pub path: PathBuf,
    /// Final status.
    pub status: FileStatus,
    /// Number of committed insertions.
    pub inserted: usize,
    /// Definitions left undocumented.
    pub skipped: Vec<Skipped>,
    /// Text to print (documented source or diff).
    pub output: Option<String>,
}

impl FileOutcome {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed(message),
            inserted: 0,
            skipped: Vec::new(),
            output: None,
        }
    }
}

/// Documents a single file.
///
/// Never panics on I/O: every failure becomes [`FileStatus::Failed`].
pub fn document_file(
    path: &Path,
    generator: &dyn Generator,
    options: &DocumentOptions,
    cancel: &CancellationToken,
) -> FileOutcome {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => return FileOutcome::failed(path, format!("failed to read: {e}")),
    };

    let label = normalize_display_path(path);
    let report = match Orchestrator::new(generator, &options.engine)
        .with_cancellation(cancel.clone())
        .run(&source, &label)
    {
        Ok(report) => report,
        Err(e) => return FileOutcome::failed(path, e.to_string()),
    };

    let changed = report.changed();
    let inserted = report.inserted.len();
    let text = report.output.as_str().to_owned();
    let (status, output) = match options.engine.mode {
        OutputMode::Preview if changed => (FileStatus::Printed, Some(text)),
        OutputMode::Preview => (FileStatus::Unchanged, None),
        OutputMode::WriteBack if options.print_only => (FileStatus::Printed, Some(text)),
        OutputMode::WriteBack if changed => match fs::write(path, &text) {
            Ok(()) => (FileStatus::Written, None),
            Err(e) => (FileStatus::Failed(format!("failed to write: {e}")), None),
        },
        OutputMode::WriteBack => (FileStatus::Unchanged, None),
    };

    FileOutcome {
        path: path.to_path_buf(),
        status,
        inserted,
        skipped: report.skipped,
        output,
    }
}

/// Documents every Python file under `paths`.
///
/// Files are processed in parallel, each worker owning its document.
/// Printed output, warnings and the summary are emitted afterwards in path
/// order. Returns the process exit code: 1 if any file failed.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn run_document<W: Write>(
    paths: &[PathBuf],
    generator: &dyn Generator,
    options: &DocumentOptions,
    cancel: &CancellationToken,
    mut writer: W,
) -> Result<i32> {
    let files = collect_python_files(paths, &options.exclude, options.verbose);
    if files.is_empty() {
        eprintln!("{}", "No Python files found.".yellow());
        return Ok(0);
    }
    if options.verbose {
        eprintln!("[VERBOSE] Documenting {} files", files.len());
    }

    let pb = output::create_progress_bar(files.len() as u64, options.verbose);
    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| {
            if options.verbose {
                eprintln!("[VERBOSE] Processing {}", normalize_display_path(path));
            }
            let outcome = document_file(path, generator, options, cancel);
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_and_clear();

    let mut stderr = std::io::stderr();
    for outcome in &outcomes {
        if let Some(text) = &outcome.output {
            if options.engine.mode == OutputMode::Preview || files.len() == 1 {
                write!(writer, "{text}")?;
            } else {
                writeln!(writer, "# {}", normalize_display_path(&outcome.path))?;
                write!(writer, "{text}")?;
            }
            if !text.is_empty() && !text.ends_with('\n') {
                writeln!(writer)?;
            }
        }
        output::print_skipped(&mut stderr, &outcome.path, &outcome.skipped)?;
        if let FileStatus::Failed(message) = &outcome.status {
            output::print_failure(&mut stderr, &outcome.path, message)?;
        }
        if options.verbose {
            eprintln!(
                "[VERBOSE] {}: {} inserted, {} skipped",
                normalize_display_path(&outcome.path),
                outcome.inserted,
                outcome.skipped.len()
            );
        }
    }

    let writes_back = options.engine.mode == OutputMode::WriteBack && !options.print_only;
    if writes_back {
        output::print_summary(&mut writer, &outcomes)?;
    }
    writer.flush()?;

    let failed = outcomes
        .iter()
        .any(|o| matches!(o.status, FileStatus::Failed(_)));
    Ok(i32::from(failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Completion, GenerationRequest, ModelError};
    use tempfile::TempDir;

    fn stub(text: &'static str) -> impl Generator {
        move |_: &GenerationRequest| -> Result<Completion, ModelError> { Ok(Completion::new(text)) }
    }

    fn setup(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_write_back_directory() {
        let dir = setup(&[
            ("a.py", "def f():\n    pass\n"),
            ("pkg/b.py", "def g():\n    \"\"\"Done.\"\"\"\n"),
            ("notes.txt", "def h():\n    pass\n"),
        ]);
        let generator = stub("Do it.");
        let mut out = Vec::new();
        let code = run_document(
            &[dir.path().to_path_buf()],
            &generator,
            &DocumentOptions::default(),
            &CancellationToken::new(),
            &mut out,
        )
        .unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "def f():\n    \"\"\"Do it.\"\"\"\n    pass\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("pkg/b.py")).unwrap(),
            "def g():\n    \"\"\"Done.\"\"\"\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
            "def h():\n    pass\n"
        );
    }

    #[test]
    fn test_parse_failure_sets_exit_code_and_keeps_other_files() {
        let dir = setup(&[("bad.py", "def broken(:\n"), ("good.py", "class A:\n    x = 1\n")]);
        let generator = stub("A thing.");
        let code = run_document(
            &[dir.path().to_path_buf()],
            &generator,
            &DocumentOptions::default(),
            &CancellationToken::new(),
            std::io::sink(),
        )
        .unwrap();

        assert_eq!(code, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("bad.py")).unwrap(),
            "def broken(:\n"
        );
        assert!(fs::read_to_string(dir.path().join("good.py"))
            .unwrap()
            .contains("\"\"\"A thing.\"\"\""));
    }

    #[test]
    fn test_print_only_leaves_file_untouched() {
        let dir = setup(&[("m.py", "def f():\n    return 1\n")]);
        let path = dir.path().join("m.py");
        let generator = stub("Return one.");
        let options = DocumentOptions {
            print_only: true,
            ..DocumentOptions::default()
        };
        let mut out = Vec::new();
        let code = run_document(
            &[path.clone()],
            &generator,
            &options,
            &CancellationToken::new(),
            &mut out,
        )
        .unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "def f():\n    \"\"\"Return one.\"\"\"\n    return 1\n"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "def f():\n    return 1\n");
    }

    #[test]
    fn test_preview_prints_diff() {
        let dir = setup(&[("m.py", "def f():\n    return 1\n")]);
        let path = dir.path().join("m.py");
        let generator = stub("Return one.");
        let mut options = DocumentOptions::default();
        options.engine.mode = OutputMode::Preview;

        let outcome = document_file(&path, &generator, &options, &CancellationToken::new());
        assert_eq!(outcome.status, FileStatus::Printed);
        let diff = outcome.output.unwrap();
        assert!(diff.contains("+    \"\"\"Return one.\"\"\""));
        assert_eq!(fs::read_to_string(&path).unwrap(), "def f():\n    return 1\n");
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let generator = stub("x");
        let outcome = document_file(
            &dir.path().join("nope.py"),
            &generator,
            &DocumentOptions::default(),
            &CancellationToken::new(),
        );
        assert!(
            matches!(outcome.status, FileStatus::Failed(ref m) if m.starts_with("failed to read"))
        );
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let generator = stub("x");
        let code = run_document(
            &[dir.path().to_path_buf()],
            &generator,
            &DocumentOptions::default(),
            &CancellationToken::new(),
            std::io::sink(),
        )
        .unwrap();
        assert_eq!(code, 0);
    }
}
