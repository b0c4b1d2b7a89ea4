//! Source positions and spans.
//!
//! Tokens, AST nodes and diagnostics all carry a [`Span`]. Nodes created by
//! the optimizer reuse the span of the construct they were derived from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in characters)
    pub column: usize,
    /// Byte offset from start of input
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// The first character of the input.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open region of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Where the region starts
    pub start: SourceLocation,
    /// One past the last character of the region
    pub end: SourceLocation,
}

impl Span {
    /// Create a span between two locations.
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// A span for nodes that have no source text.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Whether this span was produced by [`Span::dummy`].
    pub fn is_dummy(&self) -> bool {
        self.start.line == 0
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        if self.is_dummy() {
            return *other;
        }
        if other.is_dummy() {
            return *self;
        }
        let start = if self.start.offset <= other.start.offset { self.start } else { other.start };
        let end = if self.end.offset >= other.end.offset { self.end } else { other.end };
        Span { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}:{}-{}", self.start.line, self.start.column, self.end.column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}

/// Line index over a source text, used to render diagnostics.
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: String,
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Index the given source text.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { source, line_starts }
    }

    /// Get a line of source (1-indexed), without its line terminator.
    pub fn line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line_number - 1];
        let end = self
            .line_starts
            .get(line_number)
            .copied()
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Render the first line of `span` with a caret underline.
    pub fn snippet(&self, span: &Span) -> Option<String> {
        if span.is_dummy() {
            return None;
        }
        let text = self.line(span.start.line)?;
        let width = if span.end.line == span.start.line {
            span.end.column.saturating_sub(span.start.column).max(1)
        } else {
            1
        };
        let pad = " ".repeat(span.start.column.saturating_sub(1));
        Some(format!("{}\n{}{}", text, pad, "^".repeat(width)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(l1: usize, c1: usize, o1: usize, l2: usize, c2: usize, o2: usize) -> Span {
        Span::new(SourceLocation::new(l1, c1, o1), SourceLocation::new(l2, c2, o2))
    }

    #[test]
    fn test_span_display() {
        assert_eq!(span(1, 5, 4, 1, 10, 9).to_string(), "1:5-10");
        assert_eq!(span(1, 5, 4, 3, 10, 30).to_string(), "1:5-3:10");
    }

    #[test]
    fn test_span_merge() {
        let merged = span(1, 1, 0, 1, 5, 4).merge(&span(1, 10, 9, 1, 15, 14));
        assert_eq!(merged.start.column, 1);
        assert_eq!(merged.end.column, 15);
        assert_eq!(Span::dummy().merge(&merged), merged);
    }

    #[test]
    fn test_source_map_lines() {
        let map = SourceMap::new("int a;\r\nprint(a);\n");
        assert_eq!(map.line(1), Some("int a;"));
        assert_eq!(map.line(2), Some("print(a);"));
        assert_eq!(map.line(9), None);
    }

    #[test]
    fn test_snippet_underlines_span() {
        let map = SourceMap::new("int x = y;");
        let rendered = map.snippet(&span(1, 9, 8, 1, 10, 9)).unwrap();
        assert_eq!(rendered, "int x = y;\n        ^");
    }
}
