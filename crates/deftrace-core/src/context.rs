//! Scope stack with outward lookup
//!
//! A [`Context`] owns its scopes by value. Index 0 is always the root
//! scope; `exit` never removes it. Lookup scans innermost → outermost and
//! hands back a borrow of the frame that binds the name, so callers can
//! build the reference path from that frame.

use tracing::warn;

use crate::scope::Scope;

/// Result of a successful [`Context::lookup`].
#[derive(Debug)]
pub struct LookupResult<'a, V> {
    /// Innermost frame binding the name
    pub scope: &'a Scope<V>,
    /// The bound value
    pub value: &'a V,
}

impl<V> Clone for LookupResult<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for LookupResult<'_, V> {}

/// Non-empty stack of scopes.
#[derive(Debug, Clone)]
pub struct Context<V> {
    scopes: Vec<Scope<V>>,
}

impl<V> Context<V> {
    pub fn new(sep: char) -> Self {
        Self {
            scopes: vec![Scope::root(sep)],
        }
    }

    /// Push `scope` as the new innermost frame.
    pub fn enter(&mut self, scope: Scope<V>) {
        self.scopes.push(scope);
    }

    /// Pop the innermost frame and hand it back.
    ///
    /// The root frame is never popped; an unbalanced exit is logged and
    /// ignored.
    pub fn exit(&mut self) -> Option<Scope<V>> {
        if self.scopes.len() <= 1 {
            warn!("scope exit without matching enter, keeping root scope");
            return None;
        }
        self.scopes.pop()
    }

    pub fn current(&self) -> &Scope<V> {
        // Non-empty by construction: `exit` never pops the root.
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Scope<V> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn root(&self) -> &Scope<V> {
        &self.scopes[0]
    }

    pub fn root_mut(&mut self) -> &mut Scope<V> {
        &mut self.scopes[0]
    }

    /// Number of frames, root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Path of the current frame.
    pub fn path(&self) -> &str {
        self.current().path()
    }

    /// Prefix for a frame entered below the current one.
    pub fn prefix(&self) -> String {
        self.current().path().to_string()
    }

    /// A named frame one level below the current one.
    pub fn child(&self, name: impl Into<String>) -> Scope<V> {
        self.current().child(name)
    }

    /// A fresh anonymous frame below the current one.
    pub fn next_child(&mut self) -> Scope<V> {
        self.current_mut().next()
    }

    /// Frames from innermost to outermost.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope<V>> {
        self.scopes.iter().rev()
    }

    /// Find the innermost frame binding `name`.
    pub fn lookup(&self, name: &str) -> Option<LookupResult<'_, V>> {
        self.scopes().find_map(|scope| {
            scope
                .get(name)
                .map(|value| LookupResult { scope, value })
        })
    }

    /// Pop every frame above the root, returning how many were popped.
    pub fn unwind(&mut self) -> usize {
        let popped = self.scopes.len() - 1;
        self.scopes.truncate(1);
        popped
    }
}
