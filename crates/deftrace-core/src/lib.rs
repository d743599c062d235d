// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # deftrace core
//!
//! Scope-and-resolution machinery shared by every deftrace front-end.
//!
//! A front-end walks one translation unit and drives this crate with
//! enter/exit events. Declarations become [`Def`] records, uses that bind
//! to a known declaration become [`Ref`] records, and both are keyed by a
//! def-key path built from the lexical structure of the unit.
//!
//! ## Architecture
//!
//! ```text
//! path        separator-joined paths, call-keys
//!   ↓
//! scope       one lexical frame (prefix, name, counter, bindings)
//!   ↓
//! context     stack of scopes with outward lookup
//!   ↓
//! namespace   current namespace + used namespaces over per-namespace contexts
//!   ↓
//! type_info   type path → members (kind + name → type)
//!   ↓
//! expr        type stack + call-target stack for expression resolution
//!   ↓
//! emit        two-pass gate in front of a record sink
//!   ↓
//! driver      runs pass 1 (defs) then pass 2 (refs) over a set of units
//! ```
//!
//! The resolver is best-effort: anything it cannot resolve degrades to
//! [`InferredType::Unknown`] or to no record at all.

pub mod config;
pub mod context;
pub mod driver;
pub mod emit;
pub mod error;
pub mod expr;
pub mod foundation;
pub mod namespace;
pub mod path;
pub mod record;
pub mod scope;
pub mod sink;
pub mod type_info;

pub use config::IndexerConfig;
pub use context::{Context, LookupResult};
pub use driver::{FrontEnd, IndexStats, Indexer};
pub use emit::{Emitter, Pass};
pub use error::{IndexError, Result};
pub use expr::{CalleeShape, ExprEnv, ExprResolver, InferredType, Primary, Variable};
pub use foundation::{Ident, LineIndex, NodeId, Span};
pub use namespace::{NamespaceResolver, Resolved};
pub use path::Separators;
pub use record::{Def, DefData, DefFormat, DefKey, DefKind, FormatSeparator, Record, Ref};
pub use scope::Scope;
pub use sink::{Collector, JsonLinesSink, NullSink, Sink, SinkError};
pub use type_info::{Property, TypeInfo, TypeInfos};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
