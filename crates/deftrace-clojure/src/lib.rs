// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # deftrace Clojure front-end
//!
//! Indexes Clojure source: the [`lexer`] tokenizes with logos, the
//! [`reader`] builds forms with stable node ids, and the [`walker`] turns
//! binding forms into Defs and symbols into Refs through the namespace
//! resolver of the deftrace core.
//!
//! ```
//! # use deftrace_core::{Collector, Indexer, IndexerConfig};
//! # use deftrace_clojure::{ClojureFrontEnd, ClojureUnit};
//! let unit = ClojureUnit::parse("demo.clj", "(ns demo) (defn twice [x] (* 2 x))");
//! let mut sink = Collector::new();
//! Indexer::default()
//!     .run(&ClojureFrontEnd::default(), &[unit], &mut sink)
//!     .unwrap();
//!
//! let defs: Vec<_> = sink.defs().map(|d| d.path()).collect();
//! assert_eq!(defs, ["demo", "demo/twice", "demo/twice.x"]);
//! assert_eq!(sink.refs().next().unwrap().path(), "demo/twice.x");
//! ```

pub mod frontend;
pub mod lexer;
pub mod reader;
pub mod walker;

pub use frontend::{ClojureFrontEnd, ClojureUnit};
pub use reader::{read_source, Form, FormKind, ReadError, ReadErrorKind};
pub use walker::Walker;
