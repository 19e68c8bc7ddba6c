//! Source file and span utilities
//!
//! `SourceFile` is the reverse index from tree nodes back to source
//! text: every AST node carries a `Span`, and the file can re-slice any
//! span to the exact text it came from.

use crate::diagnostics::Span;
use std::path::PathBuf;

/// A source file with its content and line information
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Index a source text, recording line starts for span lookups
    pub fn new(path: PathBuf, content: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            path,
            content,
            line_starts,
        }
    }

    /// The full source text
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Create a span for a byte range
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (start_line, start_col) = self.line_col(start);
        let (end_line, end_col) = self.line_col(end);

        Span {
            file: self.path.clone(),
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Re-slice the source text covered by a span
    pub fn slice(&self, span: &Span) -> &str {
        let start = span.start.min(self.content.len());
        let end = span.end.min(self.content.len());
        &self.content[start..end]
    }

    /// Convert a byte offset to line and column (1-indexed)
    fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        let col = offset - line_start + 1;
        (line + 1, col)
    }
}

#[cfg(test)]
#[path = "span_tests.rs"]
mod tests;
