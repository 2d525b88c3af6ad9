//! Post-edit invariants.
//!
//! After rendering, the edited text must equal the original plus the
//! recorded splices, must still parse, and must hold exactly one more
//! documented definition per insertion.

use ruff_python_ast::{self as ast, Expr, Stmt};

use super::replay::{ReplayError, Splice, SpliceReplay};

/// A broken post-edit invariant. Always fatal for the file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    /// The recorded splices could not be replayed.
    #[error("splice replay failed: {0}")]
    Replay(#[from] ReplayError),
    /// The rendered tree differs from the replayed original.
    #[error("rendered text diverges from the original plus insertions at byte {0}")]
    Divergence(usize),
    /// The edited text is not valid Python.
    #[error("edited text no longer parses: {0}")]
    Unparseable(String),
    /// The number of documented definitions did not grow by the number of insertions.
    #[error("expected {expected} documented definitions, found {found}")]
    DocumentedCount {
        /// Documented before plus insertions.
        expected: usize,
        /// Documented after rendering.
        found: usize,
    },
}

/// Counts definitions whose body starts with a string literal.
///
/// # Errors
/// Returns the parser message if `source` is not valid Python.
pub fn documented_definitions(source: &str) -> Result<usize, String> {
    let parsed = ruff_python_parser::parse_module(source).map_err(|e| e.error.to_string())?;
    Ok(count_documented(&parsed.into_syntax().body))
}

fn starts_with_docstring(body: &[Stmt]) -> bool {
    matches!(
        body.first(),
        Some(Stmt::Expr(expr_stmt)) if matches!(&*expr_stmt.value, Expr::StringLiteral(_))
    )
}

fn count_documented(body: &[Stmt]) -> usize {
    body.iter()
        .map(|stmt| match stmt {
            Stmt::FunctionDef(f) => {
                usize::from(starts_with_docstring(&f.body)) + count_documented(&f.body)
            }
            Stmt::ClassDef(c) => {
                usize::from(starts_with_docstring(&c.body)) + count_documented(&c.body)
            }
            Stmt::If(s) => {
                count_documented(&s.body)
                    + s.elif_else_clauses
                        .iter()
                        .map(|clause| count_documented(&clause.body))
                        .sum::<usize>()
            }
            Stmt::For(s) => count_documented(&s.body) + count_documented(&s.orelse),
            Stmt::While(s) => count_documented(&s.body) + count_documented(&s.orelse),
            Stmt::With(s) => count_documented(&s.body),
            Stmt::Try(s) => {
                let handlers: usize = s
                    .handlers
                    .iter()
                    .map(|handler| {
                        let ast::ExceptHandler::ExceptHandler(h) = handler;
                        count_documented(&h.body)
                    })
                    .sum();
                count_documented(&s.body)
                    + handlers
                    + count_documented(&s.orelse)
                    + count_documented(&s.finalbody)
            }
            Stmt::Match(s) => s.cases.iter().map(|case| count_documented(&case.body)).sum(),
            _ => 0,
        })
        .sum()
}

/// Checks every post-edit invariant.
///
/// `documented_before` is [`documented_definitions`] of `original`.
///
/// # Errors
/// Returns the first invariant that does not hold.
pub fn verify(
    original: &str,
    rendered: &str,
    splices: &[Splice],
    documented_before: usize,
) -> Result<(), InvariantError> {
    let mut replay = SpliceReplay::new(original);
    replay.add_all(splices.iter().cloned());
    let expected = replay.apply()?;
    if expected != rendered {
        let at = expected
            .bytes()
            .zip(rendered.bytes())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| expected.len().min(rendered.len()));
        return Err(InvariantError::Divergence(at));
    }

    let found = documented_definitions(rendered).map_err(InvariantError::Unparseable)?;
    let expected = documented_before + splices.len();
    if found != expected {
        return Err(InvariantError::DocumentedCount { expected, found });
    }
    Ok(())
}
