//! Expression resolution on twin stacks
//!
//! Expressions are resolved bottom-up from exit events. Two stacks carry
//! the state between events:
//!
//! - the **type stack** holds the inferred type of each finished
//!   sub-expression, either a registered type path or
//!   [`InferredType::Unknown`];
//! - the **call stack** holds, for each pending call, the callee identifier
//!   whose reference is emitted only once the argument count (and so the
//!   call-key) is known.
//!
//! # Design
//!
//! Every miss degrades to `Unknown` and the walk carries on. Nothing here
//! returns an error; a malformed event sequence only produces fewer
//! references. Popping an empty stack yields `Unknown`.
//!
//! A pending call remembers the type-stack depth at the time its callee
//! was seen, so argument types are discarded exactly even when the
//! arguments left more than one entry behind.
//!
//! # Examples
//!
//! ```
//! # use deftrace_core::*;
//! let mut context: Context<Variable> = Context::new('.');
//! context.current_mut().put("x", Variable::of("int"));
//! let infos: TypeInfos<Variable> = TypeInfos::new('.');
//!
//! let mut sink = Collector::new();
//! let mut emitter = Emitter::new(Pass::References, None, &mut sink);
//! let mut resolver = ExprResolver::new();
//! let mut env = ExprEnv::new(&context, &infos, None, &mut emitter);
//! let x = Ident::new(NodeId(1), "x", Span::default());
//! resolver.exit_primary(&mut env, &Primary::Ident(x), false);
//! assert_eq!(resolver.finish_expression(), 1);
//! assert_eq!(sink.refs().next().unwrap().path(), "x");
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::Context;
use crate::emit::Emitter;
use crate::foundation::Ident;
use crate::path;
use crate::record::DefKind;
use crate::type_info::{TypeInfo, TypeInfos};

/// Inferred type of a sub-expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InferredType {
    /// A type path (registered or builtin spelling)
    Known(String),
    Unknown,
}

impl InferredType {
    pub fn known(path: impl Into<String>) -> Self {
        InferredType::Known(path.into())
    }

    /// `Known` for `Some`, `Unknown` for `None`.
    pub fn from_option(ty: Option<&str>) -> Self {
        match ty {
            Some(ty) => InferredType::known(ty),
            None => InferredType::Unknown,
        }
    }

    pub fn as_path(&self) -> Option<&str> {
        match self {
            InferredType::Known(path) => Some(path),
            InferredType::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, InferredType::Unknown)
    }
}

/// Binding value of the C-family front-end: the declared type, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub ty: Option<String>,
}

impl Variable {
    pub fn of(ty: impl Into<String>) -> Self {
        Self {
            ty: Some(ty.into()),
        }
    }

    pub fn untyped() -> Self {
        Self { ty: None }
    }
}

/// Operand of a primary expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primary {
    /// The self-reference keyword (`this`)
    SelfRef,
    Ident(Ident),
    /// Literal, parenthesised expression or anything without a name
    Other,
}

/// Syntactic shape of a call's callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalleeShape {
    /// `f(..)` or `Type(..)`
    Primary,
    /// `a.f(..)` or `a->f(..)`
    MemberAccess,
    /// Anything else, e.g. `(*fp)(..)`
    Other,
}

/// Read-only resolution state plus the emitter, borrowed per event.
pub struct ExprEnv<'a, 's> {
    pub context: &'a Context<Variable>,
    pub infos: &'a TypeInfos<Variable>,
    /// Path of the innermost enclosing class, if any
    pub current_class: Option<&'a str>,
    pub emitter: &'a mut Emitter<'s>,
}

impl<'a, 's> ExprEnv<'a, 's> {
    pub fn new(
        context: &'a Context<Variable>,
        infos: &'a TypeInfos<Variable>,
        current_class: Option<&'a str>,
        emitter: &'a mut Emitter<'s>,
    ) -> Self {
        Self {
            context,
            infos,
            current_class,
            emitter,
        }
    }

    fn reference(&mut self, ident: &Ident, path: String) {
        self.emitter.reference(ident.node, ident.span, path);
    }
}

#[derive(Debug, Clone)]
struct PendingCall {
    callee: Option<Ident>,
    /// Type-stack depth once the callee was seen
    depth: usize,
}

/// The type stack and the call-target stack.
#[derive(Debug, Clone, Default)]
pub struct ExprResolver {
    type_stack: Vec<InferredType>,
    call_stack: Vec<PendingCall>,
}

impl ExprResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit of a primary expression.
    ///
    /// A callee is parked on the call stack unresolved; everything else is
    /// resolved now and its type pushed.
    pub fn exit_primary(&mut self, env: &mut ExprEnv<'_, '_>, primary: &Primary, is_callee: bool) {
        if is_callee {
            let callee = match primary {
                Primary::Ident(ident) => Some(ident.clone()),
                Primary::SelfRef | Primary::Other => None,
            };
            self.push_call(callee);
            return;
        }

        let ty = match primary {
            Primary::SelfRef => InferredType::from_option(env.current_class),
            Primary::Other => InferredType::Unknown,
            Primary::Ident(ident) => resolve_identifier(env, ident),
        };
        self.type_stack.push(ty);
    }

    /// Exit of `receiver.member` / `receiver->member`.
    pub fn exit_member_access(&mut self, env: &mut ExprEnv<'_, '_>, member: &Ident, is_callee: bool) {
        let receiver = self.pop_type();
        if is_callee {
            // Resolved on call exit, once the arity is known.
            self.type_stack.push(receiver);
            self.push_call(Some(member.clone()));
            return;
        }

        let Some(info) = receiver_info(env.infos, &receiver) else {
            trace!(member = %member.text, "member access on unresolved receiver");
            self.type_stack.push(InferredType::Unknown);
            return;
        };
        let ty = match info.property(DefKind::Variable, &member.text) {
            Some(prop) => {
                let path = info.path_to(&member.text);
                let ty = InferredType::from_option(prop.ty.as_deref());
                env.reference(member, path);
                ty
            }
            None => InferredType::Unknown,
        };
        self.type_stack.push(ty);
    }

    /// Exit of a cast: the operand's type is replaced by `target`.
    pub fn exit_cast(&mut self, target: InferredType) {
        self.pop_type();
        self.type_stack.push(target);
    }

    /// Exit of an explicit type conversion `T(args..)`.
    pub fn exit_conversion(&mut self, target: InferredType, arg_count: usize) {
        self.pop_types(arg_count);
        self.type_stack.push(target);
    }

    /// Exit of an operator applied to `operands` sub-expressions.
    ///
    /// Operator result types are not inferred.
    pub fn exit_operator(&mut self, operands: usize) {
        self.pop_types(operands);
        self.type_stack.push(InferredType::Unknown);
    }

    /// Push a type computed by the front-end (e.g. a literal's type).
    pub fn push_type(&mut self, ty: InferredType) {
        self.type_stack.push(ty);
    }

    /// Exit of a call with `arg_count` arguments.
    pub fn exit_call(&mut self, env: &mut ExprEnv<'_, '_>, arg_count: usize, callee: CalleeShape) {
        let ty = match callee {
            CalleeShape::Other => {
                self.pop_types(arg_count);
                self.pop_type();
                InferredType::Unknown
            }
            CalleeShape::MemberAccess => {
                let pending = self.pop_call();
                self.type_stack.truncate(pending.depth);
                let receiver = self.pop_type();
                match pending.callee {
                    Some(name) => resolve_method_call(env, &receiver, &name, arg_count),
                    None => InferredType::Unknown,
                }
            }
            CalleeShape::Primary => {
                let pending = self.pop_call();
                self.type_stack.truncate(pending.depth);
                match pending.callee {
                    Some(name) => resolve_plain_call(env, &name, arg_count),
                    None => InferredType::Unknown,
                }
            }
        };
        self.type_stack.push(ty);
    }

    /// End of a top-level expression: drain both stacks.
    ///
    /// Returns how many entries were left behind.
    pub fn finish_expression(&mut self) -> usize {
        let leftover = self.type_stack.len() + self.call_stack.len();
        if !self.call_stack.is_empty() {
            trace!(pending = self.call_stack.len(), "calls left pending at expression end");
        }
        self.type_stack.clear();
        self.call_stack.clear();
        leftover
    }

    /// Type of the most recent sub-expression.
    pub fn peek_type(&self) -> Option<&InferredType> {
        self.type_stack.last()
    }

    pub fn type_depth(&self) -> usize {
        self.type_stack.len()
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.type_stack.is_empty() && self.call_stack.is_empty()
    }

    fn push_call(&mut self, callee: Option<Ident>) {
        self.call_stack.push(PendingCall {
            callee,
            depth: self.type_stack.len(),
        });
    }

    fn pop_call(&mut self) -> PendingCall {
        self.call_stack.pop().unwrap_or_else(|| {
            trace!("call exit without pending callee");
            PendingCall {
                callee: None,
                depth: self.type_stack.len(),
            }
        })
    }

    fn pop_type(&mut self) -> InferredType {
        self.type_stack.pop().unwrap_or(InferredType::Unknown)
    }

    fn pop_types(&mut self, count: usize) {
        let keep = self.type_stack.len().saturating_sub(count);
        self.type_stack.truncate(keep);
    }
}

fn receiver_info<'i>(
    infos: &'i TypeInfos<Variable>,
    receiver: &InferredType,
) -> Option<&'i TypeInfo<Variable>> {
    receiver.as_path().and_then(|path| infos.get_type(path))
}

/// A bare identifier in expression position.
fn resolve_identifier(env: &mut ExprEnv<'_, '_>, ident: &Ident) -> InferredType {
    let name = ident.text.as_str();

    if let Some(hit) = env.context.lookup(name) {
        let path = hit.scope.path_to(name);
        let ty = InferredType::from_option(hit.value.ty.as_deref());
        env.reference(ident, path);
        return ty;
    }

    // Type name used as a receiver, e.g. `Foo` in `Foo.instance`.
    if let Some(type_path) = env.infos.resolve_type_name(env.context, name) {
        env.reference(ident, type_path.clone());
        return InferredType::Known(type_path);
    }

    // Member shorthand inside a class body.
    if let Some(info) = env.current_class.and_then(|class| env.infos.get_type(class)) {
        if let Some(prop) = info.property(DefKind::Variable, name) {
            let path = info.path_to(name);
            let ty = InferredType::from_option(prop.ty.as_deref());
            env.reference(ident, path);
            return ty;
        }
    }

    trace!(name, "unresolved identifier");
    InferredType::Unknown
}

/// `receiver.name(args..)`.
fn resolve_method_call(
    env: &mut ExprEnv<'_, '_>,
    receiver: &InferredType,
    name: &Ident,
    arity: usize,
) -> InferredType {
    let Some(info) = receiver_info(env.infos, receiver) else {
        trace!(method = %name.text, "method call on unresolved receiver");
        return InferredType::Unknown;
    };
    let key = path::call_key(&name.text, arity);
    match info.property(DefKind::Function, &key) {
        Some(prop) => {
            let path = info.path_to(&key);
            let ty = InferredType::from_option(prop.ty.as_deref());
            env.reference(name, path);
            ty
        }
        None => InferredType::Unknown,
    }
}

/// `name(args..)`: a constructor when `name` is a type, else a function.
fn resolve_plain_call(env: &mut ExprEnv<'_, '_>, name: &Ident, arity: usize) -> InferredType {
    if let Some(type_path) = env.infos.resolve_type_name(env.context, &name.text) {
        return resolve_constructor_call(env, name, type_path, arity);
    }

    let key = path::call_key(&name.text, arity);
    let hit = {
        let mut owners: Vec<&str> = Vec::new();
        owners.extend(env.current_class);
        owners.extend(
            env.context
                .scopes()
                .map(|scope| scope.path())
                .filter(|path| !path.is_empty()),
        );
        owners.push("");
        owners
            .into_iter()
            .filter_map(|owner| env.infos.owner(owner))
            .find_map(|info| {
                info.property(DefKind::Function, &key)
                    .map(|prop| (info.path_to(&key), prop.ty.clone()))
            })
    };

    match hit {
        Some((path, ty)) => {
            env.reference(name, path);
            InferredType::from_option(ty.as_deref())
        }
        None => {
            trace!(call = %key, "unresolved call");
            InferredType::Unknown
        }
    }
}

fn resolve_constructor_call(
    env: &mut ExprEnv<'_, '_>,
    name: &Ident,
    type_path: String,
    arity: usize,
) -> InferredType {
    let sep = env.infos.separator();
    let (class_path, target) = match env.infos.get_type(&type_path) {
        Some(info) => {
            let class_path = info.path().to_string();
            let ctor = path::call_key(path::last_segment(&class_path, sep), arity);
            let target = match info.property(DefKind::Function, &ctor) {
                Some(_) => info.path_to(&ctor),
                // No declared constructor of this arity: reference the type.
                None => class_path.clone(),
            };
            (class_path, target)
        }
        None => (type_path.clone(), type_path),
    };
    env.reference(name, target);
    InferredType::Known(class_path)
}
