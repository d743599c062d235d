//! Source location and node identity.
//!
//! # Design
//!
//! - `Span`: byte range in a translation unit with a cached start line
//! - `NodeId`: stable identity of a parse-tree node (pre-order index)
//! - `Ident`: an identifier occurrence: node, text and span
//! - `LineIndex`: byte offset → 1-based line lookup for front-ends
//!
//! Node identity is what lets the emitter recognise that a declaration's
//! own name must not be re-emitted as a reference to itself, so it must be
//! derived from the tree and never from pointer equality.
//!
//! # Examples
//!
//! ```
//! # use deftrace_core::foundation::LineIndex;
//! let index = LineIndex::new("(ns a)\n(def x 1)\n");
//! assert_eq!(index.line_of(0), 1);
//! assert_eq!(index.line_of(8), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte range in a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
    /// Cached line number (1-based) for the start position, 0 when unknown
    #[serde(default)]
    pub start_line: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start: u32, end: u32, start_line: u32) -> Self {
        Self {
            start,
            end,
            start_line,
        }
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Length of this span in bytes (zero for malformed spans).
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Merge two spans (returns span covering both).
    pub fn merge(&self, other: &Span) -> Span {
        let start_line = match (self.start_line, other.start_line) {
            (0, line) | (line, 0) => line,
            (a, b) => a.min(b),
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line > 0 {
            write!(f, "{}:{}..{}", self.start_line, self.start, self.end)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// Stable identity of a parse-tree node within one translation unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An identifier occurrence in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ident {
    /// Node carrying the identifier
    pub node: NodeId,
    /// Identifier text as written
    pub text: String,
    /// Where it was written
    #[serde(default)]
    pub span: Span,
}

impl Ident {
    pub fn new(node: NodeId, text: impl Into<String>, span: Span) -> Self {
        Self {
            node,
            text: text.into(),
            span,
        }
    }
}

/// Byte offset → line lookup for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of each line start; `line_starts[0]` is always 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| (i + 1) as u32),
        );
        Self { line_starts }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: u32) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx as u32 + 1,
            Err(idx) => idx.max(1) as u32,
        }
    }

    /// Build a span for a byte range, filling in the start line.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let start = start as u32;
        Span::new(start, end as u32, self.line_of(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_keeps_known_line() {
        let a = Span::new(4, 8, 0);
        let b = Span::new(0, 2, 3);
        let merged = a.merge(&b);
        assert_eq!(merged, Span::new(0, 8, 3));
    }

    #[test]
    fn test_span_len_of_malformed_span_is_zero() {
        assert_eq!(Span::new(5, 2, 1).len(), 0);
        assert!(Span::new(5, 2, 1).is_empty());
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(1), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
        assert_eq!(index.span(2, 4), Span::new(2, 4, 2));
    }

    #[test]
    fn test_node_id_serializes_as_number() {
        let json = serde_json::to_string(&NodeId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
