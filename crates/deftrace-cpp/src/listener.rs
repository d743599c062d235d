//! Event listener for one C-family translation unit
//!
//! Maps each [`CppEvent`] onto the core: declarations bind names in the
//! scope stack, register type members and emit Defs; expression exits feed
//! the [`ExprResolver`] which emits Refs.
//!
//! # Design
//!
//! - Scopes are keyed by declaration: a namespace or class by its name, a
//!   function by its call-key, a block by a fresh anonymous index.
//! - A class body is pre-processed on class enter so that method bodies can
//!   reference members declared further down.
//! - A named namespace that is closed and reopened resumes its old scope
//!   rather than minting a sibling.
//! - Type names resolve bare first, then qualified by each enclosing scope
//!   from the innermost outward. Only registered types produce Refs.

use indexmap::IndexMap;
use tracing::{trace, warn};

use deftrace_core::path::{self, Separators};
use deftrace_core::{
    Context, Def, DefKind, Emitter, ExprEnv, ExprResolver, FormatSeparator, Ident, InferredType,
    Scope, TypeInfos, Variable,
};

use crate::event::{ClassSpec, CppEvent, FunctionSpec, MemberDecl, ParamDecl, TypeSpec};

/// A parameter after its type has been resolved.
struct Param<'e> {
    name: Option<&'e Ident>,
    ty: Option<String>,
}

impl Param<'_> {
    fn repr(&self) -> String {
        match (&self.ty, self.name) {
            (Some(ty), Some(name)) => format!("{} {}", ty, name.text),
            (Some(ty), None) => ty.clone(),
            (None, Some(name)) => name.text.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Display form of a function: `(int a, float b) ret`.
fn function_repr(params: &[Param<'_>], return_type: Option<&str>) -> String {
    let params: Vec<String> = params.iter().map(Param::repr).collect();
    match return_type {
        Some(ret) => format!("({}) {}", params.join(", "), ret),
        None => format!("({})", params.join(", ")),
    }
}

/// What a scope on the stack was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Namespace { named: bool },
    Class,
    Function,
    Block,
}

/// State of one walk over one unit.
pub struct CppListener<'u, 'e, 's> {
    infos: &'u mut TypeInfos<Variable>,
    emitter: &'e mut Emitter<'s>,
    context: Context<Variable>,
    frames: Vec<Frame>,
    resolver: ExprResolver,
    /// Paths of enclosing classes, innermost last
    classes: Vec<String>,
    /// Closed named namespaces by path, resumed on re-entry
    parked: IndexMap<String, Scope<Variable>>,
}

impl<'u, 'e, 's> CppListener<'u, 'e, 's> {
    pub fn new(
        infos: &'u mut TypeInfos<Variable>,
        emitter: &'e mut Emitter<'s>,
        separators: Separators,
    ) -> Self {
        Self {
            infos,
            emitter,
            context: Context::new(separators.path),
            frames: Vec::new(),
            resolver: ExprResolver::new(),
            classes: Vec::new(),
            parked: IndexMap::new(),
        }
    }

    /// Feed every event, then close whatever the stream left open.
    pub fn walk(&mut self, events: &[CppEvent]) {
        for event in events {
            self.event(event);
        }
        self.finish();
    }

    pub fn event(&mut self, event: &CppEvent) {
        match event {
            CppEvent::NamespaceEnter { name } => self.enter_namespace(name.as_ref()),
            CppEvent::NamespaceExit => self.exit_frame(|f| matches!(f, Frame::Namespace { .. })),
            CppEvent::ClassEnter(spec) => self.enter_class(spec),
            CppEvent::ClassExit => self.exit_frame(|f| f == Frame::Class),
            CppEvent::EnumDecl { name, enumerators } => self.declare_enum(name, enumerators),
            CppEvent::Typedef { name, target } => self.declare_typedef(name, target),
            CppEvent::FunctionEnter(spec) => self.enter_function(spec),
            CppEvent::FunctionExit => self.exit_frame(|f| f == Frame::Function),
            CppEvent::BlockEnter => {
                let block = self.context.next_child();
                self.push_frame(block, Frame::Block);
            }
            CppEvent::BlockExit => self.exit_frame(|f| f == Frame::Block),
            CppEvent::Declaration { ty, declarators } => {
                self.declare_variables(ty.as_ref(), declarators)
            }
            CppEvent::PrimaryExit { primary, callee } => {
                let (mut env, resolver) = self.split();
                resolver.exit_primary(&mut env, primary, *callee);
            }
            CppEvent::MemberAccessExit { member, callee } => {
                let (mut env, resolver) = self.split();
                resolver.exit_member_access(&mut env, member, *callee);
            }
            CppEvent::CallExit { args, callee } => {
                let (mut env, resolver) = self.split();
                resolver.exit_call(&mut env, *args, *callee);
            }
            CppEvent::CastExit { target } => {
                let ty = target
                    .as_ref()
                    .and_then(|spec| self.process_type(spec, true))
                    .map_or(InferredType::Unknown, InferredType::Known);
                self.resolver.exit_cast(ty);
            }
            CppEvent::ConversionExit { target, args } => {
                let ty = self
                    .process_type(target, true)
                    .map_or(InferredType::Unknown, InferredType::Known);
                self.resolver.exit_conversion(ty, *args);
            }
            CppEvent::OperatorExit { operands } => self.resolver.exit_operator(*operands),
            CppEvent::ExpressionEnd => {
                let leftover = self.resolver.finish_expression();
                trace!(leftover, "expression end");
            }
        }
    }

    /// Unwind scopes left open by a truncated event stream.
    pub fn finish(&mut self) {
        if !self.resolver.is_empty() {
            self.resolver.finish_expression();
        }
        if !self.frames.is_empty() {
            warn!(
                open = self.frames.len(),
                path = self.context.path(),
                "unbalanced events at end of unit, unwinding"
            );
            self.context.unwind();
            self.frames.clear();
            self.classes.clear();
        }
    }

    /// Current scope depth, root included.
    pub fn depth(&self) -> usize {
        self.context.depth()
    }

    /// Resolution state for the expression resolver, alongside the resolver.
    fn split(&mut self) -> (ExprEnv<'_, 's>, &mut ExprResolver) {
        let env = ExprEnv::new(
            &self.context,
            &*self.infos,
            self.classes.last().map(String::as_str),
            &mut *self.emitter,
        );
        (env, &mut self.resolver)
    }

    // === Scopes ===

    fn push_frame(&mut self, scope: Scope<Variable>, frame: Frame) {
        self.context.enter(scope);
        self.frames.push(frame);
    }

    fn exit_frame(&mut self, expected: impl Fn(Frame) -> bool) {
        let Some(frame) = self.frames.pop() else {
            warn!("exit event without matching enter, ignoring");
            return;
        };
        if !expected(frame) {
            warn!(?frame, path = self.context.path(), "exit event does not match open scope");
        }
        let Some(scope) = self.context.exit() else {
            return;
        };
        match frame {
            Frame::Class => {
                self.classes.pop();
            }
            Frame::Namespace { named: true } => {
                self.parked.insert(scope.path().to_string(), scope);
            }
            Frame::Namespace { named: false } | Frame::Function | Frame::Block => {}
        }
    }

    fn enter_namespace(&mut self, name: Option<&Ident>) {
        let Some(name) = name else {
            let scope = self.context.next_child();
            self.push_frame(scope, Frame::Namespace { named: false });
            return;
        };

        let path = self.context.current().path_to(&name.text);
        let def = Def::new(name.node, &name.text, DefKind::Namespace, name.span).with_format(
            "namespace",
            "",
            FormatSeparator::Empty,
        );
        self.emitter.def(def, path.clone());

        let scope = match self.parked.shift_remove(&path) {
            Some(scope) => scope,
            None => self.context.child(&name.text),
        };
        self.push_frame(scope, Frame::Namespace { named: true });
    }

    // === Types ===

    /// Resolve a written type to its path, emitting a Ref when it names a
    /// registered type and `emit` is set.
    fn process_type(&mut self, spec: &TypeSpec, emit: bool) -> Option<String> {
        match spec {
            TypeSpec::Builtin { text } => Some(text.clone()),
            TypeSpec::Named { name } => {
                match self.infos.resolve_type_name(&self.context, &name.text) {
                    Some(path) => {
                        if emit {
                            self.emitter.reference(name.node, name.span, path.clone());
                        }
                        Some(path)
                    }
                    None => {
                        trace!(name = %name.text, "unregistered type name");
                        Some(name.text.clone())
                    }
                }
            }
        }
    }

    fn process_params<'p>(&mut self, params: &'p [ParamDecl], emit: bool) -> Vec<Param<'p>> {
        params
            .iter()
            .map(|param| Param {
                name: param.name.as_ref(),
                ty: param.ty.as_ref().and_then(|ty| self.process_type(ty, emit)),
            })
            .collect()
    }

    fn enter_class(&mut self, spec: &ClassSpec) {
        let keyword = spec.key.keyword();
        let name = &spec.name;
        let path = self.context.current().path_to(&name.text);
        let def = Def::new(name.node, &name.text, spec.key.kind(), name.span).with_format(
            keyword,
            keyword,
            FormatSeparator::Space,
        );
        self.emitter.def(def, path.clone());

        for base in &spec.bases {
            match self.infos.resolve_type_name(&self.context, &base.text) {
                Some(base_path) => self.emitter.reference(base.node, base.span, base_path),
                None => trace!(base = %base.text, "unregistered base class"),
            }
        }

        let scope = self.context.child(&name.text);
        self.push_frame(scope, Frame::Class);
        self.classes.push(path.clone());
        // Registered before members so members may name the class itself.
        self.infos.set_data(&path, self.context.current().clone());

        for member in &spec.members {
            match member {
                MemberDecl::Field { name, ty } => self.declare_field(&path, name, ty.as_ref()),
                MemberDecl::Method {
                    name,
                    return_type,
                    params,
                    has_body,
                } => self.declare_method(&path, name, return_type.as_ref(), params, *has_body),
            }
        }
        self.infos.set_data(&path, self.context.current().clone());
    }

    fn declare_field(&mut self, class: &str, name: &Ident, ty: Option<&TypeSpec>) {
        let ty = ty.and_then(|ty| self.process_type(ty, true));
        let def = Def::new(name.node, &name.text, DefKind::Member, name.span).with_format(
            "",
            ty.clone().unwrap_or_default(),
            FormatSeparator::Space,
        );
        self.emitter.def(def, self.context.current().path_to(&name.text));
        self.context
            .current_mut()
            .put(&name.text, Variable { ty: ty.clone() });
        self.infos
            .set_property(class, DefKind::Variable, &name.text, ty);
    }

    /// Register a method so calls resolve before its body is seen.
    ///
    /// Methods without an in-class body get their Def here; the others get
    /// it (and their type Refs) when their definition is entered.
    fn declare_method(
        &mut self,
        class: &str,
        name: &Ident,
        return_type: Option<&TypeSpec>,
        params: &[ParamDecl],
        has_body: bool,
    ) {
        let emit = !has_body;
        let ret = match return_type {
            Some(spec) => self.process_type(spec, emit),
            None => Some(class.to_string()),
        };
        let params = self.process_params(params, emit);
        let key = path::call_key(&name.text, params.len());

        if !has_body {
            let repr = function_repr(&params, return_type.and(ret.as_deref()));
            let def = Def::new(name.node, &name.text, DefKind::Function, name.span).with_format(
                "",
                repr,
                FormatSeparator::Empty,
            );
            self.emitter.def(def, self.context.current().path_to(&key));
        }
        self.infos.set_property(class, DefKind::Function, key, ret);
    }

    fn declare_enum(&mut self, name: &Ident, enumerators: &[Ident]) {
        let path = self.context.current().path_to(&name.text);
        let def = Def::new(name.node, &name.text, DefKind::Enum, name.span).with_format(
            "enum",
            "enum",
            FormatSeparator::Space,
        );
        self.emitter.def(def, path.clone());

        let scope = self.context.child(&name.text);
        for enumerator in enumerators {
            let def = Def::new(enumerator.node, &enumerator.text, DefKind::Member, enumerator.span)
                .with_format("", path.clone(), FormatSeparator::Space);
            self.emitter.def(def, scope.path_to(&enumerator.text));
            self.infos.set_property(
                &path,
                DefKind::Variable,
                &enumerator.text,
                Some(path.clone()),
            );
        }
        self.infos.set_data(&path, scope);
    }

    fn declare_typedef(&mut self, name: &Ident, target: &TypeSpec) {
        let path = self.context.current().path_to(&name.text);
        let target_path = self.process_type(target, true);
        let def = Def::new(name.node, &name.text, DefKind::Typedef, name.span).with_format(
            "typedef",
            target_path.clone().unwrap_or_default(),
            FormatSeparator::Space,
        );
        self.emitter.def(def, path.clone());
        if let Some(target_path) = target_path {
            self.infos.set_alias(path, target_path);
        }
    }

    // === Functions and variables ===

    fn enter_function(&mut self, spec: &FunctionSpec) {
        let owner = self.context.path().to_string();
        let ret = match &spec.return_type {
            Some(ty) => self.process_type(ty, true),
            // Constructor: returns the enclosing class.
            None => Some(owner.clone()),
        };
        let params = self.process_params(&spec.params, true);
        let key = path::call_key(&spec.name.text, params.len());

        let name = &spec.name;
        let repr = function_repr(&params, ret.as_deref().filter(|_| spec.return_type.is_some()));
        let def = Def::new(name.node, &name.text, DefKind::Function, name.span).with_format(
            "",
            repr,
            FormatSeparator::Empty,
        );
        self.emitter.def(def, self.context.current().path_to(&key));
        self.infos
            .set_property(&owner, DefKind::Function, key.clone(), ret);

        let scope = self.context.child(key);
        self.push_frame(scope, Frame::Function);
        for param in &params {
            let Some(name) = param.name else {
                continue;
            };
            let def = Def::new(name.node, &name.text, DefKind::Argument, name.span).with_format(
                "",
                param.ty.clone().unwrap_or_default(),
                FormatSeparator::Space,
            );
            self.emitter.def(def, self.context.current().path_to(&name.text));
            self.context
                .current_mut()
                .put(&name.text, Variable { ty: param.ty.clone() });
        }
    }

    fn declare_variables(&mut self, ty: Option<&TypeSpec>, declarators: &[Ident]) {
        let ty = ty.and_then(|ty| self.process_type(ty, true));
        let in_class_body = self
            .classes
            .last()
            .is_some_and(|class| class.as_str() == self.context.path());

        for name in declarators {
            let path = self.context.current().path_to(&name.text);
            let def = Def::new(name.node, &name.text, DefKind::Variable, name.span).with_format(
                "",
                ty.clone().unwrap_or_default(),
                FormatSeparator::Space,
            );
            self.emitter.def(def, path);
            self.context
                .current_mut()
                .put(&name.text, Variable { ty: ty.clone() });
            if in_class_body {
                let class = self.context.path().to_string();
                self.infos
                    .set_property(&class, DefKind::Variable, &name.text, ty.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deftrace_core::{Collector, NodeId, Pass, Span};

    fn id(node: u32, text: &str) -> Ident {
        Ident::new(NodeId(node), text, Span::default())
    }

    fn walk(events: &[CppEvent], pass: Pass) -> (Collector, usize) {
        walk_with(events, pass, Separators::default())
    }

    fn walk_with(events: &[CppEvent], pass: Pass, separators: Separators) -> (Collector, usize) {
        let mut infos = TypeInfos::new(separators.path);
        let mut sink = Collector::new();
        let depth = {
            let mut emitter = Emitter::new(pass, None, &mut sink);
            let mut listener = CppListener::new(&mut infos, &mut emitter, separators);
            listener.walk(events);
            listener.depth()
        };
        (sink, depth)
    }

    fn def_paths(sink: &Collector) -> Vec<&str> {
        sink.defs().map(|d| d.path()).collect()
    }

    #[test]
    fn test_function_def_format() {
        let events = vec![
            CppEvent::FunctionEnter(FunctionSpec {
                name: id(1, "add"),
                return_type: Some(TypeSpec::builtin("int")),
                params: vec![
                    ParamDecl {
                        name: Some(id(2, "a")),
                        ty: Some(TypeSpec::builtin("int")),
                    },
                    ParamDecl {
                        name: None,
                        ty: Some(TypeSpec::builtin("float")),
                    },
                ],
            }),
            CppEvent::FunctionExit,
        ];
        let (sink, depth) = walk(&events, Pass::Definitions);
        assert_eq!(depth, 1);
        assert_eq!(def_paths(&sink), vec!["add(_,_)", "add(_,_).a"]);

        let add = sink.defs().next().unwrap();
        assert_eq!(add.kind, DefKind::Function);
        assert_eq!(add.format.repr, "(int a, float) int");
        let a = sink.defs().nth(1).unwrap();
        assert_eq!(a.kind, DefKind::Argument);
        assert_eq!(a.format.to_string(), "int");
    }

    #[test]
    fn test_namespace_reentry_resumes_scope() {
        let events = vec![
            CppEvent::NamespaceEnter {
                name: Some(id(1, "ns")),
            },
            CppEvent::Declaration {
                ty: Some(TypeSpec::builtin("int")),
                declarators: vec![id(2, "x")],
            },
            CppEvent::NamespaceExit,
            CppEvent::NamespaceEnter {
                name: Some(id(3, "ns")),
            },
            CppEvent::PrimaryExit {
                primary: deftrace_core::Primary::Ident(id(4, "x")),
                callee: false,
            },
            CppEvent::ExpressionEnd,
            CppEvent::NamespaceExit,
        ];
        let (defs, _) = walk(&events, Pass::Definitions);
        assert_eq!(def_paths(&defs), vec!["ns", "ns.x"]);

        let (refs, _) = walk(&events, Pass::References);
        let paths: Vec<_> = refs.refs().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["ns.x"]);
    }

    #[test]
    fn test_configured_path_separator() {
        let separators = Separators {
            path: ':',
            ..Separators::default()
        };
        let events = vec![
            CppEvent::NamespaceEnter {
                name: Some(id(1, "ns")),
            },
            CppEvent::Declaration {
                ty: Some(TypeSpec::builtin("int")),
                declarators: vec![id(2, "x")],
            },
            CppEvent::NamespaceExit,
        ];
        let (defs, _) = walk_with(&events, Pass::Definitions, separators);
        assert_eq!(def_paths(&defs), vec!["ns", "ns:x"]);
    }

    #[test]
    fn test_unnamed_namespaces_are_distinct() {
        let events = vec![
            CppEvent::NamespaceEnter { name: None },
            CppEvent::Declaration {
                ty: None,
                declarators: vec![id(1, "x")],
            },
            CppEvent::NamespaceExit,
            CppEvent::NamespaceEnter { name: None },
            CppEvent::Declaration {
                ty: None,
                declarators: vec![id(2, "x")],
            },
            CppEvent::NamespaceExit,
        ];
        let (sink, _) = walk(&events, Pass::Definitions);
        assert_eq!(def_paths(&sink), vec!["0.x", "1.x"]);
    }

    #[test]
    fn test_unbalanced_stream_unwinds() {
        let events = vec![
            CppEvent::NamespaceEnter {
                name: Some(id(1, "ns")),
            },
            CppEvent::BlockEnter,
        ];
        let (_, depth) = walk(&events, Pass::Definitions);
        assert_eq!(depth, 1);
    }

    #[test]
    fn test_stray_exit_is_ignored() {
        let events = vec![CppEvent::ClassExit, CppEvent::FunctionExit];
        let (sink, depth) = walk(&events, Pass::Definitions);
        assert!(sink.is_empty());
        assert_eq!(depth, 1);
    }

    #[test]
    fn test_enum_members() {
        let events = vec![CppEvent::EnumDecl {
            name: id(1, "Color"),
            enumerators: vec![id(2, "Red"), id(3, "Green")],
        }];
        let (sink, _) = walk(&events, Pass::Definitions);
        assert_eq!(def_paths(&sink), vec!["Color", "Color.Red", "Color.Green"]);
        assert_eq!(sink.defs().next().unwrap().kind, DefKind::Enum);
    }
}
