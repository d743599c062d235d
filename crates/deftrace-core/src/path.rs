//! Path algebra for def-keys
//!
//! Def-key paths are separator-joined segments:
//!
//! ```text
//! def-key-path   := [namespace NS_SEP] local-path
//! local-path     := segment ( PATH_SEP segment )*
//! segment        := identifier | call-key | anon-index
//! call-key       := identifier '(' signature ')'
//! signature      := ε | '_' ( ',' '_' )*
//! anon-index     := decimal-digit+
//! ```
//!
//! The path separator and the namespace separator are independent
//! characters chosen by the front-end.
//!
//! # Examples
//!
//! ```
//! # use deftrace_core::path::{call_key, join};
//! assert_eq!(join("", "x", '.'), "x");
//! assert_eq!(join("f()", "x", '.'), "f().x");
//! assert_eq!(call_key("bar", 2), "bar(_,_)");
//! ```

use serde::{Deserialize, Serialize};

/// Placeholder for one argument in a call signature.
///
/// Signatures are arity-only; argument types are never spelled into them.
pub const ARG_PLACEHOLDER: &str = "_";

/// The two separator characters a front-end builds def-keys with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
    /// Separator between segments of a local path
    pub path: char,
    /// Separator between a namespace and its local path
    pub namespace: char,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            path: '.',
            namespace: '/',
        }
    }
}

/// Join `name` onto `prefix`, omitting the separator when `prefix` is empty.
pub fn join(prefix: &str, name: &str, sep: char) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    let mut path = String::with_capacity(prefix.len() + name.len() + 1);
    path.push_str(prefix);
    path.push(sep);
    path.push_str(name);
    path
}

/// Prefix a local path with its namespace.
///
/// An empty namespace yields the local path unchanged.
pub fn qualify(namespace: &str, local: &str, ns_sep: char) -> String {
    join(namespace, local, ns_sep)
}

/// Comma-joined placeholder list for `arity` arguments.
pub fn signature(arity: usize) -> String {
    vec![ARG_PLACEHOLDER; arity].join(",")
}

/// `name(signature)` for a callable of the given arity.
pub fn call_key(name: &str, arity: usize) -> String {
    format!("{}({})", name, signature(arity))
}

/// Last segment of a path (the whole path when it has a single segment).
pub fn last_segment(path: &str, sep: char) -> &str {
    match path.rfind(sep) {
        Some(pos) => &path[pos + sep.len_utf8()..],
        None => path,
    }
}
