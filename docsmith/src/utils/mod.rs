//! Utilities module for docsmith.
//!
//! Offset bookkeeping, snippet shaping and path helpers shared by the engine
//! and the command layer.

mod paths;

pub use paths::{collect_python_files, is_excluded, normalize_display_path};

use crate::constants::WHITESPACE_RE;

/// A utility struct to convert byte offsets to line/column positions.
///
/// The parsers work with byte offsets, but diagnostics are reported with
/// 1-indexed lines and columns which are more human-readable.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for line breaks.
    ///
    /// A lone `\r` counts as a line break, matching Python's tokenizer.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0];
        for (i, byte) in bytes.iter().enumerate() {
            match byte {
                b'\n' => line_starts.push(i + 1),
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => line_starts.push(i + 1),
                _ => {}
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-indexed line number.
    #[must_use]
    pub fn line(&self, offset: usize) -> usize {
        // Binary search to find which line range the offset falls into.
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Byte offset of the start of the line containing `offset`.
    #[must_use]
    pub fn line_start(&self, offset: usize) -> usize {
        self.line_starts[self.line(offset) - 1]
    }

    /// Converts a byte offset to a 1-indexed `(line, column)` pair.
    ///
    /// Columns count characters, not bytes.
    #[must_use]
    pub fn line_col(&self, source: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(source.len());
        let line = self.line(offset);
        let start = self.line_starts[line - 1];
        let column = source
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        (line, column + 1)
    }
}

/// Collapses every whitespace run to a single space and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE().replace_all(text.trim(), " ").into_owned()
}

/// Truncates `text` to at most `max_chars` characters, marking the cut with `…`.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_counts_chars() {
        let source = "x = 1\ny = 'é'\n";
        let index = LineIndex::new(source);
        let offset = source.find('\'').unwrap();
        assert_eq!(index.line_col(source, offset), (2, 5));
        assert_eq!(index.line_col(source, 0), (1, 1));
    }

    #[test]
    fn test_line_index_handles_crlf_and_cr() {
        let source = "a\r\nb\rc\n";
        let index = LineIndex::new(source);
        assert_eq!(index.line(source.find('b').unwrap()), 2);
        assert_eq!(index.line(source.find('c').unwrap()), 3);
        assert_eq!(index.line_start(source.find('c').unwrap()), 5);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\t b   c \n"), "a b c");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 10), "abcdef");
        assert_eq!(truncate_chars("abc def", 4), "abc…");
        assert_eq!(truncate_chars("ééé", 2), "éé…");
    }
}
