//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count bytes; C# sources handled by the front end are UTF-8 and
//!   findings are reported in the same units the patch IR uses

use crate::patch::Span;

// ============================================================================
// One-shot Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds content length, returns the position at end of content.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let before = &content[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    (line, (offset - line_start) as u32 + 1)
}

/// Extract the bytes covered by a span.
///
/// Returns `None` if the span extends beyond content bounds.
pub fn extract_span<'a>(content: &'a [u8], span: &Span) -> Option<&'a [u8]> {
    content.get(span.start..span.end)
}

/// Extract the text of a span as a string slice.
///
/// Returns `None` if the span is out of bounds or splits a UTF-8 sequence.
pub fn extract_span_str<'a>(content: &'a str, span: &Span) -> Option<&'a str> {
    content.get(span.start..span.end)
}

// ============================================================================
// LineIndex
// ============================================================================

/// Precomputed line starts for repeated offset lookups over one buffer.
///
/// The analyzer converts every finding span to a location; a document with
/// many findings would otherwise rescan the buffer once per finding.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the index for `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            line_starts,
            len: text.len(),
        }
    }

    /// Number of lines (a trailing newline starts an empty last line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-indexed `(line, col)` for a byte offset, clamped to the end of text.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        (line as u32 + 1, (offset - self.line_starts[line]) as u32 + 1)
    }

    /// Byte offset where the given 1-indexed line starts.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        let idx = (line as usize).checked_sub(1)?;
        self.line_starts.get(idx).copied()
    }

    /// Byte span of the full lines touched by `span`, newline excluded.
    pub fn line_span(&self, text: &str, span: Span) -> Span {
        let (first, _) = self.position(span.start);
        let (last, _) = self.position(span.end.saturating_sub(1).max(span.start));
        let start = self.line_start(first).unwrap_or(0);
        let end = text[span.end.min(text.len())..]
            .find('\n')
            .map(|p| span.end + p)
            .unwrap_or(text.len());
        debug_assert!(first <= last);
        Span::new(start, end.max(start))
    }
}

// ============================================================================
// Tests
// ============================================================================
