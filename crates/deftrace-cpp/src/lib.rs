// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # deftrace C-family front-end
//!
//! Indexes C-family translation units from a typed parse-tree event stream.
//!
//! A parser produces a flat, depth-first sequence of [`CppEvent`]s per unit;
//! [`CppListener`] replays it against the deftrace core, once per pass.
//!
//! ```
//! # use deftrace_core::{Collector, Indexer, IndexerConfig, Ident, NodeId, Span};
//! # use deftrace_cpp::{CppEvent, CppFrontEnd, CppUnit, TypeSpec};
//! let x = Ident::new(NodeId(1), "x", Span::default());
//! let unit = CppUnit::new("a.cpp", vec![CppEvent::Declaration {
//!     ty: Some(TypeSpec::builtin("int")),
//!     declarators: vec![x],
//! }]);
//!
//! let config = IndexerConfig::default();
//! let mut sink = Collector::new();
//! Indexer::new(config.clone())
//!     .run(&CppFrontEnd::from_config(&config), &[unit], &mut sink)
//!     .unwrap();
//! assert_eq!(sink.defs().next().unwrap().path(), "x");
//! ```

pub mod event;
pub mod frontend;
pub mod listener;

pub use event::{ClassKey, ClassSpec, CppEvent, FunctionSpec, MemberDecl, ParamDecl, TypeSpec};
pub use frontend::{CppFrontEnd, CppUnit};
pub use listener::CppListener;
