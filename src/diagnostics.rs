//! Diagnostic sink — 4.A
//!
//! Every fallible library function returns `Result<T, CompileError>`.
//! `CompileError` renders itself as a source line followed by a caret
//! pointing at the offending column, matching the `errorAt`/`errorTok`
//! behavior of the original `rvcc` (see `original_source/tokenize.c`).
//! Nothing in this module calls `std::process::exit`; the binary crate
//! is the only place that does that, after printing `Display` output.

use std::fmt;

use crate::token::Token;

/// A single fatal compile error, optionally located in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub location: Option<ErrorLocation>,
}

/// A rendered source position: the full text of the offending line and
/// the 0-indexed column within it, plus a 1-indexed line number for
/// human-facing messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLocation {
    pub line_no: usize,
    pub line_text: String,
    pub column: usize,
}

impl CompileError {
    /// An unlocated fatal error (format string with no source position).
    pub fn fatal(message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
            location: None,
        }
    }

    /// An error at a byte offset into `src`.
    pub fn at(src: &str, loc: usize, message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
            location: Some(ErrorLocation::locate(src, loc)),
        }
    }

    /// An error pointing at a token's starting position.
    pub fn at_token(src: &str, tok: &Token, message: impl Into<String>) -> Self {
        Self::at(src, tok.loc, message)
    }
}

impl ErrorLocation {
    fn locate(src: &str, loc: usize) -> Self {
        let loc = loc.min(src.len());
        let line_start = src[..loc].rfind('\n').map_or(0, |i| i + 1);
        let line_end = src[loc..]
            .find('\n')
            .map_or(src.len(), |i| loc + i);
        let line_no = src[..line_start].matches('\n').count() + 1;
        ErrorLocation {
            line_no,
            line_text: src[line_start..line_end].to_string(),
            column: loc - line_start,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            None => write!(f, "{}", self.message),
            Some(loc) => {
                writeln!(f, "{}", loc.line_text)?;
                write!(f, "{}^ {}", " ".repeat(loc.column), self.message)
            }
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    #[test]
    fn unlocated_error_renders_message_only() {
        let e = CompileError::fatal("out of memory");
        assert_eq!(e.to_string(), "out of memory");
    }

    #[test]
    fn located_error_renders_caret_under_column() {
        let src = "int main() {\n  retur 0;\n}\n";
        let loc = src.find("retur").unwrap();
        let e = CompileError::at(src, loc, "expected 'return'");
        let rendered = e.to_string();
        let mut lines = rendered.lines();
        assert_eq!(lines.next().unwrap(), "  retur 0;");
        let caret_line = lines.next().unwrap();
        assert_eq!(caret_line.find('^'), Some(2));
        assert!(caret_line.ends_with("expected 'return'"));
    }

    #[test]
    fn multiline_source_reports_correct_line_and_column() {
        let src = "a\nbb\nccc\n";
        let loc = src.find("ccc").unwrap() + 1;
        let e = CompileError::at(src, loc, "bad");
        let loc_info = e.location.unwrap();
        assert_eq!(loc_info.line_no, 3);
        assert_eq!(loc_info.line_text, "ccc");
        assert_eq!(loc_info.column, 1);
    }

    #[test]
    fn at_token_uses_token_loc() {
        let src = "1 + 2";
        let tok = Token {
            kind: TokenKind::Num,
            loc: 4,
            len: 1,
            line: 1,
            val: 2,
            str_val: None,
        };
        let e = CompileError::at_token(src, &tok, "unexpected");
        assert_eq!(e.location.unwrap().column, 4);
    }
}
