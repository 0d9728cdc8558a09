//! Common types shared between the diagnostic, error, and output modules.

use serde::{Deserialize, Serialize};

use crate::patch::Span;
use crate::text::LineIndex;

// ============================================================================
// Location Type
// ============================================================================

/// Location of a finding in a source file.
///
/// - `file`: path as given on the command line or relative to the walked root
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, UTF-8 bytes
/// - `byte_start` / `byte_end`: half-open byte range of the flagged expression
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, UTF-8 bytes).
    pub col: u32,
    /// Byte offset from file start.
    pub byte_start: usize,
    /// Byte offset end, exclusive.
    pub byte_end: usize,
}

impl Location {
    /// Build a location for `span` using a precomputed line index.
    pub fn from_span(file: impl Into<String>, index: &LineIndex, span: Span) -> Self {
        let (line, col) = index.position(span.start);
        Location {
            file: file.into(),
            line,
            col,
            byte_start: span.start,
            byte_end: span.end,
        }
    }

    /// The byte span this location covers.
    pub fn span(&self) -> Span {
        Span::new(self.byte_start, self.byte_end.max(self.byte_start))
    }

    /// Comparison key for deterministic sorting: (file, line, col, end).
    fn sort_key(&self) -> (&str, u32, u32, usize) {
        (&self.file, self.line, self.col, self.byte_end)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_span_computes_line_and_col() {
        let text = "class C\n{\n    int x = a.b;\n}\n";
        let index = LineIndex::new(text);
        let loc = Location::from_span("C.cs", &index, Span::new(18, 21));
        assert_eq!((loc.line, loc.col), (3, 9));
        assert_eq!(loc.span(), Span::new(18, 21));
        assert_eq!(loc.to_string(), "C.cs:3:9");
    }

    #[test]
    fn ordering_is_file_then_line_then_col() {
        let index = LineIndex::new("aaaa\nbbbb\n");
        let mut locs = vec![
            Location::from_span("b.cs", &index, Span::new(0, 1)),
            Location::from_span("a.cs", &index, Span::new(6, 7)),
            Location::from_span("a.cs", &index, Span::new(5, 6)),
            Location::from_span("a.cs", &index, Span::new(2, 3)),
        ];
        locs.sort();
        let keys: Vec<_> = locs.iter().map(|l| (l.file.as_str(), l.line, l.col)).collect();
        assert_eq!(
            keys,
            vec![("a.cs", 1, 3), ("a.cs", 2, 1), ("a.cs", 2, 2), ("b.cs", 1, 1)]
        );
    }
}
