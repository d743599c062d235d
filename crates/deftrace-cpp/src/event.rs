//! Tree events for C-family input
//!
//! A parser (out of tree) walks its parse tree depth-first and reports the
//! nodes the indexer cares about as a flat sequence of [`CppEvent`]s.
//! Enter/exit events must be balanced; expression exits arrive in
//! post-order, so a call's callee and arguments precede the call itself.
//!
//! Events are serde-tagged so a sequence can be stored as JSON:
//!
//! ```json
//! [
//!   {"event": "class_enter", "key": "class", "name": {"node": 1, "text": "A"},
//!    "members": [{"member": "field", "name": {"node": 2, "text": "n"},
//!                 "ty": {"type": "builtin", "text": "int"}}]},
//!   {"event": "class_exit"}
//! ]
//! ```

use serde::{Deserialize, Serialize};

use deftrace_core::{CalleeShape, DefKind, Ident, Primary};

/// A type as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeSpec {
    /// A fundamental type (`int`, `unsigned long`, `void`)
    Builtin { text: String },
    /// A class, enum, typedef or template name
    Named { name: Ident },
}

impl TypeSpec {
    pub fn builtin(text: impl Into<String>) -> Self {
        TypeSpec::Builtin { text: text.into() }
    }

    pub fn named(name: Ident) -> Self {
        TypeSpec::Named { name }
    }

    /// Spelling as written.
    pub fn text(&self) -> &str {
        match self {
            TypeSpec::Builtin { text } => text,
            TypeSpec::Named { name } => &name.text,
        }
    }
}

/// `class`, `struct` or `union`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

impl ClassKey {
    pub fn keyword(self) -> &'static str {
        match self {
            ClassKey::Class => "class",
            ClassKey::Struct => "struct",
            ClassKey::Union => "union",
        }
    }

    pub fn kind(self) -> DefKind {
        match self {
            ClassKey::Class => DefKind::Class,
            ClassKey::Struct => DefKind::Struct,
            ClassKey::Union => DefKind::Union,
        }
    }
}

/// One parameter of a function declarator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// `None` for unnamed parameters
    #[serde(default)]
    pub name: Option<Ident>,
    #[serde(default)]
    pub ty: Option<TypeSpec>,
}

/// One member declarator of a class body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum MemberDecl {
    Field {
        name: Ident,
        #[serde(default)]
        ty: Option<TypeSpec>,
    },
    Method {
        name: Ident,
        /// `None` for constructors
        #[serde(default)]
        return_type: Option<TypeSpec>,
        #[serde(default)]
        params: Vec<ParamDecl>,
        /// Whether the body follows inside the class (as a later
        /// `function_enter`)
        #[serde(default)]
        has_body: bool,
    },
}

/// Head of a class specifier, with every member declarator of its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub key: ClassKey,
    pub name: Ident,
    #[serde(default)]
    pub bases: Vec<Ident>,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
}

/// Head of a function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: Ident,
    /// `None` for constructors
    #[serde(default)]
    pub return_type: Option<TypeSpec>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

/// One parse-tree event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CppEvent {
    /// `namespace n {` (named) or `namespace {` (unnamed)
    NamespaceEnter {
        #[serde(default)]
        name: Option<Ident>,
    },
    NamespaceExit,
    ClassEnter(ClassSpec),
    ClassExit,
    EnumDecl {
        name: Ident,
        #[serde(default)]
        enumerators: Vec<Ident>,
    },
    Typedef {
        name: Ident,
        target: TypeSpec,
    },
    FunctionEnter(FunctionSpec),
    FunctionExit,
    /// A compound statement nested in a function body
    BlockEnter,
    BlockExit,
    /// `type a, b, c;`
    Declaration {
        #[serde(default)]
        ty: Option<TypeSpec>,
        declarators: Vec<Ident>,
    },
    PrimaryExit {
        primary: Primary,
        /// Whether this primary is the callee of the enclosing call
        #[serde(default)]
        callee: bool,
    },
    MemberAccessExit {
        member: Ident,
        #[serde(default)]
        callee: bool,
    },
    CallExit {
        args: usize,
        callee: CalleeShape,
    },
    /// `static_cast<T>(e)` and friends
    CastExit {
        #[serde(default)]
        target: Option<TypeSpec>,
    },
    /// `T(args..)` where `T` is a simple type specifier
    ConversionExit {
        target: TypeSpec,
        #[serde(default)]
        args: usize,
    },
    /// A unary, binary or conditional operator
    OperatorExit { operands: usize },
    /// End of a full expression (expression statement, initializer)
    ExpressionEnd,
}

#[cfg(test)]
mod tests {
    use super::*;
    use deftrace_core::NodeId;

    #[test]
    fn test_event_json_shape() {
        let json = r#"[
            {"event": "namespace_enter"},
            {"event": "class_enter", "key": "struct", "name": {"node": 1, "text": "A"},
             "members": [{"member": "field", "name": {"node": 2, "text": "n"},
                          "ty": {"type": "builtin", "text": "int"}}]},
            {"event": "class_exit"},
            {"event": "primary_exit", "primary": {"ident": {"node": 3, "text": "a"}}},
            {"event": "call_exit", "args": 0, "callee": "member_access"},
            {"event": "namespace_exit"}
        ]"#;
        let events: Vec<CppEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], CppEvent::NamespaceEnter { name: None });

        let CppEvent::ClassEnter(spec) = &events[1] else {
            panic!("expected class_enter, got {:?}", events[1]);
        };
        assert_eq!(spec.key, ClassKey::Struct);
        assert_eq!(spec.name.node, NodeId(1));
        assert!(matches!(&spec.members[0], MemberDecl::Field { ty: Some(ty), .. } if ty.text() == "int"));

        assert!(matches!(
            &events[3],
            CppEvent::PrimaryExit { primary: Primary::Ident(ident), callee: false } if ident.text == "a"
        ));
        assert!(matches!(
            events[4],
            CppEvent::CallExit { args: 0, callee: CalleeShape::MemberAccess }
        ));
    }

    #[test]
    fn test_class_key_kinds() {
        assert_eq!(ClassKey::Union.kind(), DefKind::Union);
        assert_eq!(ClassKey::Struct.keyword(), "struct");
    }
}
