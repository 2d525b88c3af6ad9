//! The per-file orchestrator.
//!
//! Parses once, snapshots the undocumented definitions, then runs
//! extract → prompt → generate → validate → insert for each of them. The
//! tree is rendered once at the end and checked against the post-edit
//! invariants before any text is handed back.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use similar::TextDiff;

use crate::constants::{DEFAULT_MODEL, DEFAULT_SUMMARY_CHARS};
use crate::context;
use crate::cst::{self, CstError, NodeId, SourceDocument};
use crate::edit::{
    self, documented_definitions, DocstringInsertion, DocstringLayout, InsertError,
    InsertionReceipt, InvariantError, Splice,
};
use crate::generator::{GenerationRequest, Generator, ModelError};
use crate::locator::{Definition, Locator, LocatorFilter};
use crate::prompt;
use crate::validator::{self, ValidationError};

/// What the run hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// The full edited text.
    #[default]
    WriteBack,
    /// A unified diff against the original.
    Preview,
}

/// Per-run settings, resolved by the command layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Model identifier passed to the generator.
    pub model: String,
    /// Quote placement for inserted docstrings.
    pub layout: DocstringLayout,
    /// Name filters.
    pub filter: LocatorFilter,
    /// Bound for body summaries and related snippets.
    pub max_summary_chars: usize,
    /// Quote referenced top-level definitions in prompts.
    pub include_related: bool,
    /// Full text or diff.
    pub mode: OutputMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            layout: DocstringLayout::default(),
            filter: LocatorFilter::default(),
            max_summary_chars: DEFAULT_SUMMARY_CHARS,
            include_related: true,
            mode: OutputMode::default(),
        }
    }
}

/// Shared flag that stops a run between definitions.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a definition was left undocumented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The model call failed or timed out.
    Model(ModelError),
    /// The response could not be turned into a safe docstring.
    Validation(ValidationError),
    /// The tree editor refused the target.
    Insert(InsertError),
    /// The run was cancelled while this definition was in flight.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "{e}"),
            Self::Validation(e) => write!(f, "{e}"),
            Self::Insert(e) => write!(f, "{e}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A skipped definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Definition name.
    pub name: String,
    /// 1-indexed line of its keyword.
    pub line: usize,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// The text a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    /// Full edited text.
    Text(String),
    /// Unified diff, empty when nothing changed.
    Diff(String),
}

impl RunOutput {
    /// The text, whichever form it takes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) | Self::Diff(text) => text,
        }
    }
}

/// Outcome of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Edited text or diff.
    pub output: RunOutput,
    /// Committed insertions in document order.
    pub inserted: Vec<InsertionReceipt>,
    /// Definitions left undocumented.
    pub skipped: Vec<Skipped>,
    /// The run stopped early.
    pub cancelled: bool,
}

impl RunReport {
    /// Whether the file text changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.inserted.is_empty()
    }
}

/// Document-level failure: no output is produced.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The input is not valid Python.
    #[error(transparent)]
    Parse(#[from] CstError),
    /// The edit broke an invariant.
    #[error("insertion invariant violated: {0}")]
    InsertionInvariantViolation(#[from] InvariantError),
}

/// Runs the docstring pipeline over one source text.
pub struct Orchestrator<'a> {
    generator: &'a dyn Generator,
    options: &'a EngineOptions,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator using `generator` for completions.
    #[must_use]
    pub fn new(generator: &'a dyn Generator, options: &'a EngineOptions) -> Self {
        Self {
            generator,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Observes `token` before each model call and each commit.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Documents `source`. `label` names the file in diff headers.
    ///
    /// # Errors
    /// Returns [`EngineError`] when the source does not parse or an edit
    /// breaks an invariant. Per-definition failures are reported in
    /// [`RunReport::skipped`] instead.
    pub fn run(&self, source: &str, label: &str) -> Result<RunReport, EngineError> {
        let mut doc = cst::parse(source)?;
        let targets: Vec<NodeId> = Locator::new(&doc)
            .with_filter(self.options.filter)
            .map(|def| def.id)
            .collect();
        let schema = prompt::response_schema();

        let mut inserted = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = false;

        for target in targets {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(def) = doc.find(target).and_then(Definition::from_node) else {
                continue;
            };
            let name = def.name().to_owned();
            let line = def.header.line;
            let skip = |reason| Skipped {
                name: name.clone(),
                line,
                reason,
            };

            let ctx = if self.options.include_related {
                context::extract_with_related(&doc, &def, self.options.max_summary_chars)
            } else {
                context::extract(&def, self.options.max_summary_chars)
            };
            let request = GenerationRequest {
                prompt: prompt::build(&ctx),
                model_id: self.options.model.clone(),
                schema: Some(schema.clone()),
            };

            let completion = match self.generator.generate(&request) {
                Ok(completion) => completion,
                Err(e) => {
                    skipped.push(skip(SkipReason::Model(e)));
                    continue;
                }
            };
            let docstring = match validator::validate(&completion.text) {
                Ok(docstring) => docstring,
                Err(e) => {
                    skipped.push(skip(SkipReason::Validation(e)));
                    continue;
                }
            };

            if self.cancel.is_cancelled() {
                skipped.push(skip(SkipReason::Cancelled));
                cancelled = true;
                break;
            }

            let insertion = DocstringInsertion {
                target,
                docstring,
                layout: self.options.layout,
            };
            match edit::insert(&mut doc, &insertion) {
                Ok(receipt) => inserted.push(receipt),
                Err(e) => skipped.push(skip(SkipReason::Insert(e))),
            }
        }

        let rendered = cst::render(&doc);
        check_invariants(&doc, &rendered, &inserted)?;

        let output = match self.options.mode {
            OutputMode::WriteBack => RunOutput::Text(rendered),
            OutputMode::Preview => RunOutput::Diff(unified_diff(source, &rendered, label)),
        };
        Ok(RunReport {
            output,
            inserted,
            skipped,
            cancelled,
        })
    }
}

fn check_invariants(
    doc: &SourceDocument,
    rendered: &str,
    inserted: &[InsertionReceipt],
) -> Result<(), InvariantError> {
    let original = doc.original();
    let before = documented_definitions(original).map_err(InvariantError::Unparseable)?;
    let splices: Vec<Splice> = inserted.iter().map(InsertionReceipt::splice).collect();
    edit::verify(original, rendered, &splices, before)
}

/// Unified diff of `original` → `edited` with `a/` and `b/` headers.
#[must_use]
pub fn unified_diff(original: &str, edited: &str, label: &str) -> String {
    if original == edited {
        return String::new();
    }
    TextDiff::from_lines(original, edited)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Completion;

    fn stub(text: &'static str) -> impl Generator {
        move |_: &GenerationRequest| -> Result<Completion, ModelError> { Ok(Completion::new(text)) }
    }

    #[test]
    fn test_write_back_inserts_and_reports() {
        let generator = stub("Do the thing.");
        let options = EngineOptions::default();
        let report = Orchestrator::new(&generator, &options)
            .run("def f():\n    pass\n", "f.py")
            .unwrap();
        assert_eq!(
            report.output,
            RunOutput::Text("def f():\n    \"\"\"Do the thing.\"\"\"\n    pass\n".to_owned())
        );
        assert_eq!(report.inserted.len(), 1);
        assert!(report.skipped.is_empty());
        assert!(report.changed());
    }

    #[test]
    fn test_model_failure_skips_definition() {
        let generator = |request: &GenerationRequest| {
            if request.prompt.as_str().contains("def bad") {
                Err(ModelError::Timeout(std::time::Duration::from_secs(1)))
            } else {
                Ok(Completion::new("Fine."))
            }
        };
        let options = EngineOptions::default();
        let source = "def bad():\n    pass\n\ndef good():\n    pass\n";
        let report = Orchestrator::new(&generator, &options)
            .run(source, "m.py")
            .unwrap();
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].name, "good");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "bad");
        assert!(matches!(report.skipped[0].reason, SkipReason::Model(ModelError::Timeout(_))));
    }

    #[test]
    fn test_validation_failure_skips_definition() {
        let generator = stub("   ");
        let options = EngineOptions::default();
        let report = Orchestrator::new(&generator, &options)
            .run("def f():\n    pass\n", "f.py")
            .unwrap();
        assert!(!report.changed());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::Validation(ValidationError::Empty)
        );
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let generator = stub("Doc.");
        let options = EngineOptions::default();
        let result = Orchestrator::new(&generator, &options)
            .run("def f(:\n", "bad.py");
        assert!(matches!(result, Err(EngineError::Parse(CstError::Syntax(_)))));
    }

    #[test]
    fn test_preview_returns_diff() {
        let generator = stub("Doc.");
        let options = EngineOptions {
            mode: OutputMode::Preview,
            ..EngineOptions::default()
        };
        let report = Orchestrator::new(&generator, &options)
            .run("def f():\n    pass\n", "pkg/f.py")
            .unwrap();
        let diff = report.output.as_str();
        assert!(diff.contains("--- a/pkg/f.py"));
        assert!(diff.contains("+++ b/pkg/f.py"));
        assert!(diff.contains("+    \"\"\"Doc.\"\"\""));
    }

    #[test]
    fn test_cancellation_keeps_committed_insertions() {
        let token = CancellationToken::new();
        let observer = token.clone();
        let generator = move |request: &GenerationRequest| -> Result<Completion, ModelError> {
            if request.prompt.as_str().contains("def second") {
                observer.cancel();
            }
            Ok(Completion::new("Doc."))
        };
        let options = EngineOptions::default();
        let source =
            "def first():\n    pass\n\ndef second():\n    pass\n\ndef third():\n    pass\n";
        let report = Orchestrator::new(&generator, &options)
            .with_cancellation(token)
            .run(source, "c.py")
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].name, "first");
        assert_eq!(report.skipped[0].reason, SkipReason::Cancelled);
    }

    #[test]
    fn test_filters_are_applied() {
        let generator = stub("Doc.");
        let options = EngineOptions {
            filter: LocatorFilter {
                skip_private: true,
                skip_dunder: false,
            },
            ..EngineOptions::default()
        };
        let report = Orchestrator::new(&generator, &options)
            .run("def _hidden():\n    pass\n", "p.py")
            .unwrap();
        assert!(!report.changed());
        assert!(report.skipped.is_empty());
    }
}
