//! Token stream wrapper for the reader.

use std::ops::Range;

use deftrace_core::{LineIndex, Span};

use crate::lexer::Token;

/// Token stream with lookahead and span tracking.
///
/// Each token is paired with its byte range so forms and errors carry
/// accurate locations.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    lines: &'src LineIndex,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [(Token, Range<usize>)], lines: &'src LineIndex) -> Self {
        Self {
            tokens,
            pos: 0,
            lines,
        }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&'src Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    /// Advance to the next token and return the current one.
    pub fn advance(&mut self) -> Option<&'src Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn current_pos(&self) -> usize {
        self.pos
    }

    /// Span from the token at `start` to the last consumed token.
    ///
    /// Empty at `start` when nothing has been consumed since.
    pub fn span_from(&self, start: usize) -> Span {
        let start_byte = self
            .tokens
            .get(start)
            .map(|(_, span)| span.start)
            .unwrap_or_else(|| self.end_byte());
        let end_byte = if self.pos > start {
            self.tokens
                .get(self.pos - 1)
                .map(|(_, span)| span.end)
                .unwrap_or(start_byte)
        } else {
            start_byte
        };
        self.lines.span(start_byte, end_byte)
    }

    /// Span of the current token, or an empty span at end of input.
    pub fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => self.lines.span(span.start, span.end),
            None => {
                let end = self.end_byte();
                self.lines.span(end, end)
            }
        }
    }

    fn end_byte(&self) -> usize {
        self.tokens.last().map(|(_, span)| span.end).unwrap_or(0)
    }
}
