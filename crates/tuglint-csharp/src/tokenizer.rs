// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tokenizer for the supported C# subset.
//!
//! Every token owns the trivia around it:
//!
//! - **Trailing trivia** runs from the end of the token up to and including
//!   the first newline (spaces, tabs, comments on the same line).
//! - **Leading trivia** is everything else between the previous token's
//!   trailing trivia and the token: blank lines, indentation, comments on
//!   their own lines, and preprocessor directive lines.
//!
//! Concatenating every token's leading trivia, text, and trailing trivia
//! reproduces the source exactly.
//!
//! An interpolated string is split into an `InterpolatedStringStart` token
//! (`$"`), `InterpolatedStringText` runs, the tokens of each hole between
//! `{` and `}`, and an `InterpolatedStringEnd` token (`"`). Text runs and
//! the delimiters next to them carry no trivia.

use memchr::{memchr2, memmem};
use thiserror::Error;
use tuglint_core::patch::Span;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    NumericLiteral,
    StringLiteral,
    CharLiteral,
    /// `$"`, `$@"` or `@$"`.
    InterpolatedStringStart,
    /// Literal text or a format specifier inside an interpolated string.
    InterpolatedStringText,
    /// The closing `"` of an interpolated string.
    InterpolatedStringEnd,
    Punctuation,
    EndOfFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The token text, trivia excluded.
    pub span: Span,
    pub leading: Span,
    pub trailing: Span,
}

impl Token {
    /// Span including leading and trailing trivia.
    pub fn full_span(&self) -> Span {
        Span::new(self.leading.start, self.trailing.end)
    }
}

/// Reserved words. Contextual keywords (`var`, `partial`, `get`, `record`,
/// `global`, `await`, ...) lex as identifiers and are recognised by the parser.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// Multi-character punctuators, longest first. `>` is always a single token;
/// the parser joins adjacent `>` tokens into shift and comparison operators.
const PUNCTUATORS: &[&str] = &[
    "??=", "<<=", "=>", "==", "!=", "<=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "<<", "::", "->", "..",
];

const SINGLE_PUNCTUATORS: &[u8] = b"{}()[];,.:?+-*/%&|^!~=<>@";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

// ============================================================================
// Lexer
// ============================================================================

/// Position inside an interpolated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Text { verbatim: bool, start: usize },
    /// `depth` counts brackets opened inside the hole.
    Hole { depth: usize },
    /// Format specifier after `:` in a hole.
    Format { verbatim: bool },
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    frames: Vec<Frame>,
}

/// Tokenize `text`. The last token is always `EndOfFile`, whose leading
/// trivia holds whatever trails the final real token.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        frames: Vec::new(),
    };
    let mut tokens = Vec::new();
    loop {
        let leading_start = lexer.pos;
        if !lexer.in_text() {
            lexer.leading_trivia()?;
        }
        let leading = Span::new(leading_start, lexer.pos);

        if lexer.pos >= lexer.bytes.len() {
            if let Some(start) = lexer.open_string() {
                return Err(lexer.error("unterminated interpolated string", start));
            }
            tokens.push(Token {
                kind: TokenKind::EndOfFile,
                span: Span::new(lexer.pos, lexer.pos),
                leading,
                trailing: Span::new(lexer.pos, lexer.pos),
            });
            return Ok(tokens);
        }

        let start = lexer.pos;
        let kind = if lexer.in_text() {
            lexer.interpolated_text()?
        } else {
            lexer.token()?
        };
        if lexer.pos == start {
            return Err(lexer.unexpected(start));
        }
        let span = Span::new(start, lexer.pos);

        let trailing_start = lexer.pos;
        if !lexer.in_text() {
            lexer.trailing_trivia()?;
        }
        tokens.push(Token {
            kind,
            span,
            leading,
            trailing: Span::new(trailing_start, lexer.pos),
        });
    }
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.text.get(self.pos + offset..)?.chars().next()
    }

    /// Consume the character at `start` and report it.
    fn unexpected(&mut self, start: usize) -> LexError {
        self.pos = start;
        let ch = self.char_at(0).unwrap_or('\u{fffd}');
        self.pos += ch.len_utf8();
        self.error(format!("unexpected character '{}'", ch), start)
    }

    fn error(&self, message: impl Into<String>, start: usize) -> LexError {
        LexError {
            message: message.into(),
            span: Span::new(start, self.pos.max(start + 1).min(self.bytes.len().max(start))),
        }
    }

    fn at_line_start(&self) -> bool {
        self.bytes[..self.pos]
            .iter()
            .rev()
            .take_while(|&&b| b != b'\n' && b != b'\r')
            .all(|&b| b == b' ' || b == b'\t')
    }

    fn skip_horizontal_space(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | 0x0b | 0x0c) => self.pos += 1,
                // Unicode spaces and the byte order mark.
                Some(b) if b >= 0x80 => match self.char_at(0) {
                    Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                        self.pos += ch.len_utf8();
                    }
                    _ => return,
                },
                _ => return,
            }
        }
    }

    fn skip_newline(&mut self) -> bool {
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                true
            }
            Some(b'\n') => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn skip_to_line_end(&mut self) {
        self.pos = memchr2(b'\n', b'\r', &self.bytes[self.pos..])
            .map(|p| self.pos + p)
            .unwrap_or(self.bytes.len());
    }

    /// Consume one comment if one starts here.
    fn skip_comment(&mut self) -> Result<bool, LexError> {
        match (self.peek(), self.peek_at(1)) {
            (Some(b'/'), Some(b'/')) => {
                self.skip_to_line_end();
                Ok(true)
            }
            (Some(b'/'), Some(b'*')) => {
                let start = self.pos;
                match memmem::find(&self.bytes[self.pos + 2..], b"*/") {
                    Some(p) => {
                        self.pos += 2 + p + 2;
                        Ok(true)
                    }
                    None => {
                        self.pos = self.bytes.len();
                        Err(self.error("unterminated block comment", start))
                    }
                }
            }
            _ => Ok(false),
        }
    }

    fn leading_trivia(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_horizontal_space();
            if self.skip_newline() || self.skip_comment()? {
                continue;
            }
            if self.peek() == Some(b'#') && self.at_line_start() {
                self.skip_to_line_end();
                continue;
            }
            return Ok(());
        }
    }

    fn trailing_trivia(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_horizontal_space();
            if self.skip_newline() {
                return Ok(());
            }
            if !self.skip_comment()? {
                return Ok(());
            }
        }
    }

    fn token(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(TokenKind::EndOfFile);
        };

        match b {
            b'"' => self.string_literal(start, false),
            b'\'' => self.char_literal(start),
            b'$' | b'@' if self.string_prefix().is_some() => {
                let (verbatim, len) = self.string_prefix().unwrap_or((false, 0));
                let interpolated = self.bytes[start..start + len].contains(&b'$');
                self.pos += len;
                let quotes = self.bytes[self.pos..].iter().take_while(|&&b| b == b'"').count();
                if interpolated && quotes < 3 {
                    self.pos += 1;
                    self.frames.push(Frame::Text { verbatim, start });
                    return Ok(TokenKind::InterpolatedStringStart);
                }
                self.string_literal(start, verbatim)
            }
            b'0'..=b'9' => {
                self.number();
                Ok(TokenKind::NumericLiteral)
            }
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => {
                self.number();
                Ok(TokenKind::NumericLiteral)
            }
            b'@' if self.char_at(1).is_some_and(is_ident_start) => {
                self.pos += 1;
                self.identifier_tail();
                Ok(TokenKind::Identifier)
            }
            _ if self.char_at(0).is_some_and(is_ident_start) => {
                self.identifier_tail();
                let text = &self.text[start..self.pos];
                Ok(if is_keyword(text) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                })
            }
            _ => {
                let rest = &self.text[self.pos..];
                if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
                    // `a ? .5 : b`
                    if *p == "?." && matches!(self.peek_at(2), Some(b'0'..=b'9')) {
                        self.pos += 1;
                    } else {
                        self.pos += p.len();
                    }
                    return Ok(TokenKind::Punctuation);
                }
                if SINGLE_PUNCTUATORS.contains(&b) {
                    self.pos += 1;
                    self.hole_punctuation(b);
                    return Ok(TokenKind::Punctuation);
                }
                Err(self.unexpected(start))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Interpolated strings
    // ------------------------------------------------------------------------

    fn in_text(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Text { .. } | Frame::Format { .. }))
    }

    /// Start of the innermost unterminated interpolated string.
    fn open_string(&self) -> Option<usize> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Text { start, .. } => Some(*start),
            _ => None,
        })
    }

    fn verbatim_text(&self) -> bool {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Text { verbatim, .. } => Some(*verbatim),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Track brackets inside a hole. `}` at depth zero closes the hole and
    /// `:` at depth zero starts the format specifier.
    fn hole_punctuation(&mut self, b: u8) {
        let Some(&Frame::Hole { depth }) = self.frames.last() else {
            return;
        };
        let next = match b {
            b'{' | b'(' | b'[' => Frame::Hole { depth: depth + 1 },
            b'}' | b')' | b']' if depth > 0 => Frame::Hole { depth: depth - 1 },
            b'}' => {
                self.frames.pop();
                return;
            }
            b':' if depth == 0 => {
                let verbatim = self.verbatim_text();
                self.frames.push(Frame::Format { verbatim });
                return;
            }
            _ => return,
        };
        if let Some(top) = self.frames.last_mut() {
            *top = next;
        }
    }

    /// Lex the next piece of interpolated string text: a literal run, the
    /// `{` opening a hole, the `}` ending a format specifier, or the
    /// closing quote.
    fn interpolated_text(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let (verbatim, format) = match self.frames.last() {
            Some(Frame::Text { verbatim, .. }) => (*verbatim, false),
            Some(Frame::Format { verbatim }) => (*verbatim, true),
            _ => return self.token(),
        };
        match (self.peek(), self.peek_at(1)) {
            (Some(b'"'), next) if !format && !(verbatim && next == Some(b'"')) => {
                self.pos += 1;
                self.frames.pop();
                return Ok(TokenKind::InterpolatedStringEnd);
            }
            (Some(b'{'), next) if !format && next != Some(b'{') => {
                self.pos += 1;
                self.frames.push(Frame::Hole { depth: 0 });
                return Ok(TokenKind::Punctuation);
            }
            (Some(b'}'), _) if format => {
                self.pos += 1;
                self.frames.pop();
                self.frames.pop();
                return Ok(TokenKind::Punctuation);
            }
            _ => {}
        }
        loop {
            let Some(b) = self.peek() else {
                return Err(self.error("unterminated interpolated string", start));
            };
            match b {
                b'\\' if !verbatim => self.pos += 2,
                b'"' if format => {
                    return Err(self.error("expected '}' after format specifier", start))
                }
                b'"' if verbatim && self.peek_at(1) == Some(b'"') => self.pos += 2,
                b'"' => break,
                b'{' if format => break,
                b'{' if self.peek_at(1) == Some(b'{') => self.pos += 2,
                b'{' => break,
                b'}' if format => break,
                b'}' if self.peek_at(1) == Some(b'}') => self.pos += 2,
                b'\n' | b'\r' if !verbatim => {
                    return Err(self.error("newline in string literal", start))
                }
                _ => self.pos += 1,
            }
        }
        Ok(TokenKind::InterpolatedStringText)
    }

    /// `(verbatim, prefix_len)` for `@"`, `$"`, `$@"`, `@$"`, `$$"""`.
    fn string_prefix(&self) -> Option<(bool, usize)> {
        let rest = &self.bytes[self.pos..];
        let prefix_len = rest.iter().take_while(|&&b| b == b'$' || b == b'@').count();
        if prefix_len == 0 || rest.get(prefix_len) != Some(&b'"') {
            return None;
        }
        let prefix = &rest[..prefix_len];
        let ats = prefix.iter().filter(|&&b| b == b'@').count();
        if ats > 1 {
            return None;
        }
        Some((ats == 1, prefix_len))
    }

    fn identifier_tail(&mut self) {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else if b >= 0x80 {
                let ch = self.text[self.pos..].chars().next().unwrap_or(' ');
                if ch.is_alphanumeric() {
                    self.pos += ch.len_utf8();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    fn number(&mut self) {
        let is_digit = |b: u8, hex: bool| b.is_ascii_digit() || b == b'_' || (hex && b.is_ascii_hexdigit());
        let hex_or_bin = self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x' | b'X' | b'b' | b'B'));
        if hex_or_bin {
            let hex = matches!(self.peek_at(1), Some(b'x' | b'X'));
            self.pos += 2;
            while self.peek().is_some_and(|b| is_digit(b, hex)) {
                self.pos += 1;
            }
        } else {
            while self.peek().is_some_and(|b| is_digit(b, false)) {
                self.pos += 1;
            }
            if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
                while self.peek().is_some_and(|b| is_digit(b, false)) {
                    self.pos += 1;
                }
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
                if self.peek_at(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1 + sign;
                    while self.peek().is_some_and(|b| is_digit(b, false)) {
                        self.pos += 1;
                    }
                }
            }
        }
        while matches!(
            self.peek(),
            Some(b'u' | b'U' | b'l' | b'L' | b'f' | b'F' | b'd' | b'D' | b'm' | b'M')
        ) {
            self.pos += 1;
        }
    }

    fn char_literal(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.pos += 1;
        loop {
            match self.peek() {
                Some(b'\\') => self.pos += 2,
                Some(b'\'') => {
                    self.pos += 1;
                    return Ok(TokenKind::CharLiteral);
                }
                Some(b'\n' | b'\r') | None => {
                    return Err(self.error("unterminated character literal", start))
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Lex a string literal whose opening quote is at `self.pos`.
    fn string_literal(&mut self, start: usize, verbatim: bool) -> Result<TokenKind, LexError> {
        let quotes = self.bytes[self.pos..]
            .iter()
            .take_while(|&&b| b == b'"')
            .count();
        if quotes >= 3 {
            return self.raw_string(start, quotes);
        }
        self.pos += 1;
        loop {
            let Some(b) = self.peek() else {
                return Err(self.error("unterminated string literal", start));
            };
            match b {
                b'\\' if !verbatim => self.pos += 2,
                b'"' if verbatim && self.peek_at(1) == Some(b'"') => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Ok(TokenKind::StringLiteral);
                }
                b'\n' | b'\r' if !verbatim => {
                    return Err(self.error("newline in string literal", start))
                }
                _ => self.pos += 1,
            }
        }
    }

    fn raw_string(&mut self, start: usize, quotes: usize) -> Result<TokenKind, LexError> {
        self.pos += quotes;
        let fence = vec![b'"'; quotes];
        match memmem::find(&self.bytes[self.pos..], &fence) {
            Some(p) => {
                self.pos += p + quotes;
                while self.peek() == Some(b'"') {
                    self.pos += 1;
                }
                Ok(TokenKind::StringLiteral)
            }
            None => {
                self.pos = self.bytes.len();
                Err(self.error("unterminated raw string literal", start))
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<&str> {
        tokenize(src)
            .unwrap_or_default()
            .iter()
            .filter(|t| t.kind != TokenKind::EndOfFile)
            .map(|t| &src[t.span.start..t.span.end])
            .collect()
    }

    fn reassemble(src: &str, tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|t| &src[t.full_span().start..t.full_span().end])
            .collect()
    }

    mod token_tests {
        use super::*;

        #[test]
        fn member_chain() {
            assert_eq!(
                texts("int id = Thread.CurrentThread.ManagedThreadId;"),
                vec!["int", "id", "=", "Thread", ".", "CurrentThread", ".", "ManagedThreadId", ";"]
            );
        }

        #[test]
        fn keywords_and_contextual_keywords() {
            let src = "var x = new global::System.Object();";
            let tokens = tokenize(src).unwrap_or_default();
            assert_eq!(tokens[0].kind, TokenKind::Identifier);
            assert_eq!(tokens[3].kind, TokenKind::Keyword);
            assert_eq!(&src[tokens[5].span.start..tokens[5].span.end], "::");
        }

        #[test]
        fn greater_than_is_never_joined() {
            assert_eq!(texts("a >>= b"), vec!["a", ">", ">", "=", "b"]);
            assert_eq!(texts("List<List<int>>"), vec!["List", "<", "List", "<", "int", ">", ">"]);
        }

        #[test]
        fn literals() {
            assert_eq!(
                texts(r#"f(1.5e3f, 0xFF_u, 'x', '\'', "a\"b", @"c""d", 1.ToString())"#),
                vec![
                    "f", "(", "1.5e3f", ",", "0xFF_u", ",", "'x'", ",", r"'\''", ",", r#""a\"b""#,
                    ",", r#"@"c""d""#, ",", "1", ".", "ToString", "(", ")", ")"
                ]
            );
        }

        #[test]
        fn interpolated_string_holes_are_tokens() {
            let src = r#"$"id {Thread.CurrentThread.ManagedThreadId} {{x}} {f("}")}" + 1"#;
            assert_eq!(
                texts(src),
                vec![
                    "$\"", "id ", "{", "Thread", ".", "CurrentThread", ".", "ManagedThreadId", "}",
                    " {{x}} ", "{", "f", "(", "\"}\"", ")", "}", "\"", "+", "1"
                ]
            );
            let kinds: Vec<TokenKind> = tokenize(src)
                .unwrap_or_default()
                .iter()
                .map(|t| t.kind)
                .collect();
            assert_eq!(kinds[0], TokenKind::InterpolatedStringStart);
            assert_eq!(kinds[1], TokenKind::InterpolatedStringText);
            assert_eq!(kinds[13], TokenKind::StringLiteral);
            assert_eq!(kinds[16], TokenKind::InterpolatedStringEnd);
        }

        #[test]
        fn interpolation_alignment_and_format() {
            assert_eq!(
                texts(r#"$"{x,5:X2} {y:0.0}""#),
                vec!["$\"", "{", "x", ",", "5", ":", "X2", "}", " ", "{", "y", ":", "0.0", "}", "\""]
            );
        }

        #[test]
        fn verbatim_and_nested_interpolation() {
            assert_eq!(
                texts(r#"$@"a""b{$"<{s}>"}""#),
                vec!["$@\"", "a\"\"b", "{", "$\"", "<", "{", "s", "}", ">", "\"", "}", "\""]
            );
        }

        #[test]
        fn non_ascii_identifiers() {
            assert_eq!(texts("café = ñ1 + _x;"), vec!["café", "=", "ñ1", "+", "_x", ";"]);
        }

        #[test]
        fn raw_string_literal() {
            let src = "var s = \"\"\"\n  a \"quoted\" b\n  \"\"\";";
            let toks = texts(src);
            assert_eq!(toks.len(), 5);
            assert!(toks[3].starts_with("\"\"\"") && toks[3].ends_with("\"\"\""));
        }

        #[test]
        fn verbatim_identifier() {
            assert_eq!(texts("@class.x"), vec!["@class", ".", "x"]);
            assert_eq!(tokenize("@class").map(|t| t[0].kind), Ok(TokenKind::Identifier));
        }
    }

    mod trivia_tests {
        use super::*;

        #[test]
        fn trailing_trivia_ends_at_first_newline() {
            let src = "a; // note\n\n  // own line\n  b;";
            let tokens = tokenize(src).unwrap_or_default();
            let semi = tokens[1];
            assert_eq!(&src[semi.trailing.start..semi.trailing.end], " // note\n");
            let b = tokens[2];
            assert_eq!(&src[b.leading.start..b.leading.end], "\n  // own line\n  ");
        }

        #[test]
        fn inline_block_comment_is_trailing_trivia() {
            let src = "Thread.CurrentThread/*c*/.ManagedThreadId";
            let tokens = tokenize(src).unwrap_or_default();
            assert_eq!(&src[tokens[2].trailing.start..tokens[2].trailing.end], "/*c*/");
            assert!(tokens[3].leading.is_empty());
        }

        #[test]
        fn preprocessor_lines_are_leading_trivia() {
            let src = "#region R\n#if DEBUG\nclass C {}\n#endif\n";
            let tokens = tokenize(src).unwrap_or_default();
            assert_eq!(&src[tokens[0].leading.start..tokens[0].leading.end], "#region R\n#if DEBUG\n");
            let eof = tokens[tokens.len() - 1];
            assert_eq!(eof.kind, TokenKind::EndOfFile);
            assert_eq!(&src[eof.leading.start..eof.leading.end], "#endif\n");
        }

        #[test]
        fn unicode_spaces_are_trivia() {
            let src = "int\u{a0}x\u{2003}= 1;";
            assert_eq!(texts(src), vec!["int", "x", "=", "1", ";"]);
            let tokens = tokenize(src).unwrap_or_default();
            assert_eq!(reassemble(src, &tokens), src);
        }

        #[test]
        fn whitespace_inside_holes_is_trivia() {
            let src = "$\"a { x /* c */ } b\";";
            let tokens = tokenize(src).unwrap_or_default();
            assert_eq!(reassemble(src, &tokens), src);
            let text = tokens[5];
            assert_eq!(text.kind, TokenKind::InterpolatedStringText);
            assert_eq!(&src[text.span.start..text.span.end], " b");
            assert!(text.leading.is_empty() && text.trailing.is_empty());
        }

        #[test]
        fn trivia_reassembles_source() {
            let src = "\u{feff}using System;\r\n/* a */ class C { int x = 1; } // end";
            let tokens = tokenize(src).unwrap_or_default();
            assert_eq!(reassemble(src, &tokens), src);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn unterminated_string() {
            let err = tokenize("var s = \"abc\n;").err();
            assert_eq!(err.map(|e| e.message), Some("newline in string literal".to_string()));
        }

        #[test]
        fn unterminated_comment() {
            let err = tokenize("a /* never closed").err();
            assert_eq!(err.map(|e| e.span.start), Some(2));
        }

        #[test]
        fn unexpected_character() {
            let err = tokenize("a ` b").err();
            assert_eq!(err.map(|e| e.message), Some("unexpected character '`'".to_string()));
        }

        #[test]
        fn non_ascii_symbols_are_errors() {
            let err = tokenize("var a = b \u{2192} c;").err();
            assert_eq!(err.map(|e| e.message), Some("unexpected character '\u{2192}'".to_string()));

            let err = tokenize("x = \u{1F600};").err();
            assert_eq!(err.map(|e| e.span), Some(Span::new(4, 8)));
        }

        #[test]
        fn unterminated_interpolated_string() {
            let err = tokenize("var s = $\"abc").err();
            assert_eq!(err.map(|e| e.message), Some("unterminated interpolated string".to_string()));

            let err = tokenize("var s = $\"{x").err();
            assert_eq!(err.map(|e| e.span.start), Some(8));
        }
    }
}
