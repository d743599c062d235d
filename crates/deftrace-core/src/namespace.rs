//! Namespace-qualified name resolution
//!
//! Adds a namespace dimension above [`Context`]: every namespace owns its
//! own scope stack, one namespace is current, and each namespace keeps a
//! set of *used* namespaces whose root scopes are visible without
//! qualification. Aliases map a short name to a namespace for qualified
//! symbols (`alias/name`).
//!
//! # Resolution order
//!
//! 1. The current namespace's scope stack (innermost → outermost)
//! 2. The root scope of each used namespace, in the order they were added
//!
//! A hit yields `namespace ⊕ NS_SEP ⊕ scope.path_to(name)`.
//!
//! # Examples
//!
//! ```
//! # use deftrace_core::{NamespaceResolver, Separators};
//! let mut ns: NamespaceResolver<()> = NamespaceResolver::new("user", Separators::default());
//! ns.enter_namespace("foo");
//! ns.context_mut().current_mut().put("g", ());
//! assert_eq!(ns.lookup("g").unwrap().path, "foo/g");
//! ```

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::context::Context;
use crate::path::{self, Separators};

/// A name resolved through the namespace resolver.
#[derive(Debug)]
pub struct Resolved<'a, V> {
    /// Namespace the binding lives in
    pub namespace: &'a str,
    /// Fully-qualified def-key path
    pub path: String,
    /// The bound value
    pub value: &'a V,
}

/// Current namespace plus per-namespace scope stacks.
#[derive(Debug, Clone)]
pub struct NamespaceResolver<V> {
    current: String,
    namespaces: IndexMap<String, Context<V>>,
    used: IndexMap<String, IndexSet<String>>,
    aliases: IndexMap<String, IndexMap<String, String>>,
    separators: Separators,
}

impl<V> NamespaceResolver<V> {
    /// Start in `default_namespace` with an empty scope stack.
    pub fn new(default_namespace: impl Into<String>, separators: Separators) -> Self {
        let current = default_namespace.into();
        let mut namespaces = IndexMap::new();
        namespaces.insert(current.clone(), Context::new(separators.path));
        Self {
            current,
            namespaces,
            used: IndexMap::new(),
            aliases: IndexMap::new(),
            separators,
        }
    }

    pub fn separators(&self) -> Separators {
        self.separators
    }

    pub fn current_namespace(&self) -> &str {
        &self.current
    }

    /// Switch to `name`, creating an empty scope stack on first entry.
    ///
    /// Re-entering a namespace resumes its existing stack.
    pub fn enter_namespace(&mut self, name: impl Into<String>) {
        let name = name.into();
        let sep = self.separators.path;
        self.namespaces
            .entry(name.clone())
            .or_insert_with(|| Context::new(sep));
        trace!(namespace = %name, "entered namespace");
        self.current = name;
    }

    /// Make `name` visible unqualified from the current namespace.
    pub fn add_used_namespace(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name == self.current {
            return;
        }
        self.used
            .entry(self.current.clone())
            .or_default()
            .insert(name);
    }

    /// Let `alias/x` mean `target/x` from the current namespace.
    pub fn add_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases
            .entry(self.current.clone())
            .or_default()
            .insert(alias.into(), target.into());
    }

    /// Namespaces used by the current namespace.
    pub fn used_namespaces(&self) -> impl Iterator<Item = &str> {
        self.used
            .get(&self.current)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Scope stack of the current namespace.
    pub fn context(&self) -> &Context<V> {
        &self.namespaces[&self.current]
    }

    pub fn context_mut(&mut self) -> &mut Context<V> {
        let sep = self.separators.path;
        self.namespaces
            .entry(self.current.clone())
            .or_insert_with(|| Context::new(sep))
    }

    /// Scope stack of any known namespace.
    pub fn context_of(&self, namespace: &str) -> Option<&Context<V>> {
        self.namespaces.get(namespace)
    }

    /// Known namespaces in first-entered order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Prefix a local path with the current namespace.
    pub fn qualify(&self, local: &str) -> String {
        path::qualify(&self.current, local, self.separators.namespace)
    }

    /// Def-key path for `name` declared in the current scope.
    pub fn def_path(&self, name: &str) -> String {
        self.qualify(&self.context().current().path_to(name))
    }

    /// Resolve an unqualified identifier.
    pub fn lookup(&self, name: &str) -> Option<Resolved<'_, V>> {
        if let Some(hit) = self.context().lookup(name) {
            return Some(Resolved {
                namespace: &self.current,
                path: self.qualify(&hit.scope.path_to(name)),
                value: hit.value,
            });
        }
        self.used_namespaces()
            .find_map(|ns| self.lookup_root(ns, name))
    }

    /// Resolve `name` in the root scope of `namespace` (or of the namespace
    /// an alias of the current namespace points at).
    pub fn lookup_in(&self, namespace: &str, name: &str) -> Option<Resolved<'_, V>> {
        let target = self
            .aliases
            .get(&self.current)
            .and_then(|aliases| aliases.get(namespace))
            .map(String::as_str)
            .unwrap_or(namespace);
        self.lookup_root(target, name)
    }

    fn lookup_root(&self, namespace: &str, name: &str) -> Option<Resolved<'_, V>> {
        let (ns, context) = self.namespaces.get_key_value(namespace)?;
        let root = context.root();
        let value = root.get(name)?;
        Some(Resolved {
            namespace: ns,
            path: path::qualify(ns, &root.path_to(name), self.separators.namespace),
            value,
        })
    }
}
