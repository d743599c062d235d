//! Foundation types shared by the core and every front-end
//!
//! These describe where things are in a translation unit. They carry no
//! resolution semantics of their own.

pub mod span;

pub use span::{Ident, LineIndex, NodeId, Span};
