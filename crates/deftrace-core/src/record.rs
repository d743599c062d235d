//! Def and Ref records
//!
//! These are the only things the core produces. A [`Def`] is a symbol
//! declaration; a [`Ref`] is a use that binds to a Def by path equality.
//! Both are immutable once handed to a sink.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::foundation::{NodeId, Span};

/// Closed vocabulary of definition kinds.
///
/// Serialized spellings are part of the output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefKind {
    Function,
    Func,
    Variable,
    Var,
    Param,
    Argument,
    Member,
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Typedef,
    Letvar,
}

/// Spellings, indexed in declaration order of [`DefKind`].
const DEF_KIND_NAMES: &[&str] = &[
    "FUNCTION",
    "FUNC",
    "VARIABLE",
    "VAR",
    "PARAM",
    "ARGUMENT",
    "MEMBER",
    "NAMESPACE",
    "CLASS",
    "STRUCT",
    "UNION",
    "ENUM",
    "TYPEDEF",
    "LETVAR",
];

const ALL_KINDS: &[DefKind] = &[
    DefKind::Function,
    DefKind::Func,
    DefKind::Variable,
    DefKind::Var,
    DefKind::Param,
    DefKind::Argument,
    DefKind::Member,
    DefKind::Namespace,
    DefKind::Class,
    DefKind::Struct,
    DefKind::Union,
    DefKind::Enum,
    DefKind::Typedef,
    DefKind::Letvar,
];

impl DefKind {
    pub fn as_str(self) -> &'static str {
        DEF_KIND_NAMES[self as usize]
    }

    /// Every kind, in vocabulary order.
    pub fn all() -> &'static [DefKind] {
        ALL_KINDS
    }
}

impl fmt::Display for DefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DEF_KIND_NAMES
            .iter()
            .position(|name| *name == s)
            .map(|idx| ALL_KINDS[idx])
            .ok_or_else(|| format!("unknown definition kind '{}'", s))
    }
}

/// Globally meaningful key of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefKey {
    /// Source unit label, when the run has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Def-key path
    pub path: String,
}

/// Separator placed between a definition's keyword and its representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSeparator {
    #[default]
    Empty,
    Space,
}

impl FormatSeparator {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatSeparator::Empty => "",
            FormatSeparator::Space => " ",
        }
    }
}

/// Display format of a definition: `keyword ⊕ separator ⊕ repr`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefFormat {
    pub keyword: String,
    pub repr: String,
    pub separator: FormatSeparator,
}

impl fmt::Display for DefFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keyword.is_empty() || self.repr.is_empty() {
            return write!(f, "{}{}", self.keyword, self.repr);
        }
        write!(f, "{}{}{}", self.keyword, self.separator.as_str(), self.repr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefData {
    pub kind: DefKind,
}

/// A symbol declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Def {
    /// Node declaring the symbol (its name identifier)
    pub node: NodeId,
    /// Simple name as written
    pub name: String,
    pub kind: DefKind,
    pub def_key: DefKey,
    pub format: DefFormat,
    pub def_data: DefData,
    pub span: Span,
}

impl Def {
    /// A definition whose key is filled in at emission time.
    pub fn new(node: NodeId, name: impl Into<String>, kind: DefKind, span: Span) -> Self {
        Self {
            node,
            name: name.into(),
            kind,
            def_key: DefKey {
                unit: None,
                path: String::new(),
            },
            format: DefFormat::default(),
            def_data: DefData { kind },
            span,
        }
    }

    pub fn with_format(
        mut self,
        keyword: impl Into<String>,
        repr: impl Into<String>,
        separator: FormatSeparator,
    ) -> Self {
        self.format = DefFormat {
            keyword: keyword.into(),
            repr: repr.into(),
            separator,
        };
        self
    }

    pub fn path(&self) -> &str {
        &self.def_key.path
    }
}

/// A use of a symbol bound to a definition by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    /// Node of the referencing identifier
    pub node: NodeId,
    pub def_key: DefKey,
    pub span: Span,
}

impl Ref {
    pub fn path(&self) -> &str {
        &self.def_key.path
    }
}

/// Either record, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Def(Def),
    Ref(Ref),
}

impl Record {
    pub fn path(&self) -> &str {
        match self {
            Record::Def(def) => def.path(),
            Record::Ref(reference) => reference.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_spellings_round_trip() {
        for kind in DefKind::all() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<DefKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_kind_vocabulary() {
        assert_eq!(DefKind::Letvar.as_str(), "LETVAR");
        assert_eq!(DefKind::Typedef.to_string(), "TYPEDEF");
        assert!("LET".parse::<DefKind>().is_err());
    }

    #[test]
    fn test_format_display() {
        let def = Def::new(NodeId(1), "Foo", DefKind::Class, Span::default()).with_format(
            "class",
            "class",
            FormatSeparator::Space,
        );
        assert_eq!(def.format.to_string(), "class class");

        let def = Def::new(NodeId(1), "f", DefKind::Func, Span::default()).with_format(
            "defn",
            "",
            FormatSeparator::Empty,
        );
        assert_eq!(def.format.to_string(), "defn");
    }

    #[test]
    fn test_unit_omitted_when_absent() {
        let reference = Ref {
            node: NodeId(3),
            def_key: DefKey {
                unit: None,
                path: "x".to_string(),
            },
            span: Span::new(0, 1, 1),
        };
        let json = serde_json::to_string(&Record::Ref(reference)).unwrap();
        assert!(json.starts_with("{\"Ref\""));
        assert!(!json.contains("unit"));
    }
}
