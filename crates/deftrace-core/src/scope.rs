//! Lexical scope frames
//!
//! A [`Scope`] is one named frame of the lexical structure: a function body,
//! a class body, a namespace, a let-form or a binding group. Its path is the
//! enclosing scope's path joined with its own name, and it is the prefix for
//! every def-key declared inside it.
//!
//! The bound value type is chosen by the front-end: a marker `()` for
//! Lisp-family code, a [`Variable`](crate::expr::Variable) for C-family code.

use indexmap::IndexMap;

use crate::path;

/// One lexical frame.
///
/// The prefix is captured at construction and never changes.
#[derive(Debug, Clone)]
pub struct Scope<V> {
    prefix: String,
    name: String,
    path: String,
    sep: char,
    /// Next anonymous child index
    counter: u32,
    bindings: IndexMap<String, V>,
}

impl<V> Scope<V> {
    /// The root frame: empty prefix, empty name.
    pub fn root(sep: char) -> Self {
        Self::new("", "", sep)
    }

    /// Create a frame named `name` under `prefix`.
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, sep: char) -> Self {
        let name = name.into();
        let prefix = prefix.into();
        let path = path::join(&prefix, &name, sep);
        Self {
            prefix,
            name,
            path,
            sep,
            counter: 0,
            bindings: IndexMap::new(),
        }
    }

    /// A named child of this frame.
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.path.clone(), self.sep)
    }

    /// Mint a fresh anonymous child frame (`"0"`, `"1"`, …).
    ///
    /// Sibling anonymous frames always get distinct paths.
    pub fn next(&mut self) -> Self {
        let name = self.counter.to_string();
        self.counter += 1;
        self.child(name)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `prefix ⊕ sep ⊕ name`, or just `name` at top level.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn separator(&self) -> char {
        self.sep
    }

    /// Def-key path of `name` declared in this frame.
    pub fn path_to(&self, name: &str) -> String {
        path::join(&self.path, name, self.sep)
    }

    /// Bind `name`; the last write wins.
    pub fn put(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        self.bindings.insert(name.into(), value)
    }

    /// Single-frame lookup.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bindings in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &V)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
