//! Type-info registry
//!
//! Maps a fully-qualified type path to what is known about the type: the
//! scope of its body (so member def-keys are built from it) and its
//! properties, keyed by `(kind, name)` so a variable and a function may
//! share a simple name. Function properties are keyed by call-key and
//! record the return type.
//!
//! A distinguished root entry holds free functions and globals. The
//! registry is created per indexing run and passed to front-ends
//! explicitly; it is never global state.
//!
//! # Examples
//!
//! ```
//! # use deftrace_core::{DefKind, TypeInfos, Scope};
//! let mut infos: TypeInfos<()> = TypeInfos::new('.');
//! infos.set_data("A", Scope::new("A", "", '.'));
//! infos.set_property("A", DefKind::Variable, "n", Some("int".to_string()));
//!
//! let a = infos.get_type("A").unwrap();
//! assert_eq!(a.property(DefKind::Variable, "n").unwrap().ty.as_deref(), Some("int"));
//! assert_eq!(a.path_to("n"), "A.n");
//! ```

use indexmap::IndexMap;
use tracing::trace;

use crate::context::Context;
use crate::path;
use crate::record::DefKind;
use crate::scope::Scope;

/// Alias chains longer than this are treated as cycles.
const MAX_ALIAS_DEPTH: usize = 8;

/// One recorded member or function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Member type, or return type for functions; `None` when not known
    pub ty: Option<String>,
}

/// What is known about one type path.
#[derive(Debug, Clone)]
pub struct TypeInfo<V> {
    path: String,
    sep: char,
    data: Option<Scope<V>>,
    properties: IndexMap<(DefKind, String), Property>,
}

impl<V> TypeInfo<V> {
    fn new(path: impl Into<String>, sep: char) -> Self {
        Self {
            path: path.into(),
            sep,
            data: None,
            properties: IndexMap::new(),
        }
    }

    /// Registry key of this entry.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Scope of the type body, once the type has been declared.
    pub fn data(&self) -> Option<&Scope<V>> {
        self.data.as_ref()
    }

    /// Whether this entry describes a declared type (rather than a plain
    /// owner of functions, such as a namespace).
    pub fn is_type(&self) -> bool {
        self.data.is_some()
    }

    pub fn property(&self, kind: DefKind, name: &str) -> Option<&Property> {
        self.properties.get(&(kind, name.to_string()))
    }

    pub fn properties(&self) -> impl Iterator<Item = (DefKind, &str, &Property)> {
        self.properties
            .iter()
            .map(|((kind, name), prop)| (*kind, name.as_str(), prop))
    }

    /// Def-key path of member `name`.
    pub fn path_to(&self, name: &str) -> String {
        match &self.data {
            Some(scope) => scope.path_to(name),
            None => path::join(&self.path, name, self.sep),
        }
    }
}

/// Registry of all type infos for one run.
#[derive(Debug, Clone)]
pub struct TypeInfos<V> {
    infos: IndexMap<String, TypeInfo<V>>,
    aliases: IndexMap<String, String>,
    root: TypeInfo<V>,
    sep: char,
}

impl<V> TypeInfos<V> {
    pub fn new(sep: char) -> Self {
        Self {
            infos: IndexMap::new(),
            aliases: IndexMap::new(),
            root: TypeInfo::new("", sep),
            sep,
        }
    }

    pub fn separator(&self) -> char {
        self.sep
    }

    /// Entry for `path`, following typedef aliases.
    pub fn get(&self, path: &str) -> Option<&TypeInfo<V>> {
        let mut current = path;
        for _ in 0..MAX_ALIAS_DEPTH {
            if let Some(info) = self.infos.get(current) {
                return Some(info);
            }
            current = self.aliases.get(current).map(String::as_str)?;
        }
        trace!(path, "alias chain too deep");
        None
    }

    /// Entry for `path` only if it is a declared type.
    pub fn get_type(&self, path: &str) -> Option<&TypeInfo<V>> {
        self.get(path).filter(|info| info.is_type())
    }

    /// Whether `path` names a type or a type alias.
    pub fn is_type_name(&self, path: &str) -> bool {
        self.aliases.contains_key(path) || self.get_type(path).is_some()
    }

    /// Owner of free functions and globals.
    pub fn root(&self) -> &TypeInfo<V> {
        &self.root
    }

    /// Owner entry: the root for an empty path.
    pub fn owner(&self, path: &str) -> Option<&TypeInfo<V>> {
        if path.is_empty() {
            Some(&self.root)
        } else {
            self.get(path)
        }
    }

    /// Record the body scope of type `path`, making it a declared type.
    pub fn set_data(&mut self, path: &str, scope: Scope<V>) {
        self.entry(path).data = Some(scope);
    }

    /// Record a property on owner `owner` (the root when empty).
    ///
    /// The `(kind, name)` pair is the key; the last write wins.
    pub fn set_property(
        &mut self,
        owner: &str,
        kind: DefKind,
        name: impl Into<String>,
        ty: Option<String>,
    ) {
        let info = if owner.is_empty() {
            &mut self.root
        } else {
            self.entry(owner)
        };
        info.properties.insert((kind, name.into()), Property { ty });
    }

    /// Make `alias` resolve to `target`.
    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        let alias = alias.into();
        let target = target.into();
        if alias != target {
            self.aliases.insert(alias, target);
        }
    }

    /// Resolve a written type name to its registered path.
    ///
    /// The bare name is tried first, then the name qualified by each
    /// enclosing scope from the innermost outward.
    pub fn resolve_type_name<B>(&self, context: &Context<B>, name: &str) -> Option<String> {
        if self.is_type_name(name) {
            return Some(name.to_string());
        }
        context
            .scopes()
            .filter(|scope| !scope.path().is_empty())
            .map(|scope| scope.path_to(name))
            .find(|qualified| self.is_type_name(qualified))
    }

    /// Registered paths in first-registered order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.infos.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    fn entry(&mut self, path: &str) -> &mut TypeInfo<V> {
        let sep = self.sep;
        self.infos
            .entry(path.to_string())
            .or_insert_with(|| TypeInfo::new(path, sep))
    }
}
