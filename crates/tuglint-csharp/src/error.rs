// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Front-end errors.

use std::cmp::min;

use thiserror::Error;
use tuglint_core::error::LintError;
use tuglint_core::patch::Span;
use tuglint_core::text::LineIndex;
use tuglint_core::types::Location;

/// A file that could not be tokenized or parsed.
///
/// Carries the source line (with one line of context on each side) so the
/// error can be rendered without the original text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}:{line}:{col}: {message}")]
pub struct ParseError {
    pub path: String,
    pub message: String,
    pub span: Span,
    pub line: u32,
    pub col: u32,
    context: String,
    context_line_start: usize,
    context_offset: usize,
}

impl ParseError {
    pub fn new(path: &str, text: &str, message: impl Into<String>, span: Span) -> Self {
        let index = LineIndex::new(text);
        let (line, col) = index.position(span.start);
        let first_line = line.saturating_sub(1).max(1);
        let start = index.line_start(first_line).unwrap_or(0);
        let end = index.line_start(line + 2).unwrap_or(text.len());
        ParseError {
            path: path.to_string(),
            message: message.into(),
            span,
            line,
            col,
            context: text.get(start..end).unwrap_or_default().to_string(),
            context_line_start: first_line as usize,
            context_offset: start,
        }
    }

    /// Render the error with the offending source highlighted.
    pub fn render(&self, styled: bool) -> String {
        use annotate_snippets::{Level, Renderer, Snippet};

        let start = self.span.start.saturating_sub(self.context_offset);
        let end = self.span.end.saturating_sub(self.context_offset);
        let end = if start == end {
            min(end + 1, self.context.len())
        } else {
            min(end, self.context.len())
        };
        let start = min(start, end);
        let renderer = if styled {
            Renderer::styled()
        } else {
            Renderer::plain()
        };
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(&self.context)
                .origin(&self.path)
                .line_start(self.context_line_start)
                .fold(false)
                .annotations(vec![Level::Error.span(start..end).label(&self.message)]),
        );
        let rendered = renderer.render(message);
        rendered.to_string()
    }
}

impl From<ParseError> for LintError {
    fn from(err: ParseError) -> Self {
        let location = Location {
            file: err.path.clone(),
            line: err.line,
            col: err.col,
            byte_start: err.span.start,
            byte_end: err.span.end,
        };
        LintError::ParseError {
            file: err.path,
            message: err.message,
            location: Some(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let text = "class C\n{\n    int x = 1\n}\n";
        let err = ParseError::new("a.cs", text, "expected ';'", Span::new(24, 25));
        assert_eq!(err.to_string(), "a.cs:4:1: expected ';'");
    }

    #[test]
    fn render_plain_shows_source_line() {
        let text = "class C\n{\n    int x = 1\n}\n";
        let err = ParseError::new("a.cs", text, "expected ';'", Span::new(24, 25));
        let rendered = err.render(false);
        assert!(rendered.contains("expected ';'"));
        assert!(rendered.contains("int x = 1"));
        assert!(rendered.contains("a.cs"));
    }

    #[test]
    fn render_styled_points_at_the_span() {
        let text = "class {\n";
        let err = ParseError::new("b.cs", text, "expected identifier", Span::new(6, 7));
        let rendered = err.render(true);
        assert!(rendered.contains("class {"));
        assert!(rendered.contains("expected identifier"));
        assert!(err.render(false).contains('^'));
    }

    #[test]
    fn converts_to_lint_error() {
        let err = ParseError::new("a.cs", "x", "bad", Span::new(0, 1));
        let lint: LintError = err.into();
        match lint {
            LintError::ParseError { file, location, .. } => {
                assert_eq!(file, "a.cs");
                assert_eq!(location.map(|l| (l.line, l.col)), Some((1, 1)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
