//! Read errors and recovery.

use std::fmt;

use deftrace_core::Span;

use crate::lexer::Token;

/// Reader error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadError {
    pub kind: ReadErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of read error.
///
/// The reader reports every error and keeps going, so each kind names the
/// recovery it took as well as the fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorKind {
    /// Input the lexer could not match; the bytes are skipped.
    InvalidToken,

    /// A closing delimiter with no matching opener, or the wrong closer
    /// for the innermost open collection. The closer is skipped.
    UnexpectedToken,

    /// Input ended inside a collection or after a prefix such as `'`.
    /// The partial form is kept.
    UnexpectedEof,

    /// Well-formed tokens that do not make a form (a map with an odd
    /// number of entries).
    InvalidSyntax,

    /// Forms nested past the reader's depth limit. The over-deep form and
    /// the rest of its enclosing collection are skipped.
    TooDeep,
}

impl ReadError {
    pub fn invalid_token(text: &str, span: Span) -> Self {
        Self {
            kind: ReadErrorKind::InvalidToken,
            span,
            message: format!("unrecognised input `{text}`"),
        }
    }

    /// A closer that does not close anything open.
    pub fn unexpected_closer(found: &Token, expected: Option<&Token>, span: Span) -> Self {
        let message = match expected {
            Some(expected) => format!("expected {expected}, found {found}"),
            None => format!("unmatched {found}"),
        };
        Self {
            kind: ReadErrorKind::UnexpectedToken,
            span,
            message,
        }
    }

    /// End of input while `context` was still open.
    pub fn unexpected_eof(context: &str, span: Span) -> Self {
        Self {
            kind: ReadErrorKind::UnexpectedEof,
            span,
            message: format!("unexpected end of input {context}"),
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ReadErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    pub fn too_deep(limit: usize, span: Span) -> Self {
        Self {
            kind: ReadErrorKind::TooDeep,
            span,
            message: format!("forms nested deeper than {limit} levels, skipping"),
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ReadError {}
