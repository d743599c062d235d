//! End-to-end indexing of C-family event streams.

use std::collections::HashSet;

use deftrace_core::{
    CalleeShape, Collector, DefKind, Ident, IndexStats, Indexer, IndexerConfig, NodeId, Primary,
    Record, Span,
};
use deftrace_cpp::{
    ClassKey, ClassSpec, CppEvent, CppFrontEnd, CppUnit, FunctionSpec, MemberDecl, ParamDecl,
    TypeSpec,
};

fn id(node: u32, text: &str) -> Ident {
    Ident::new(NodeId(node), text, Span::default())
}

fn int() -> Option<TypeSpec> {
    Some(TypeSpec::builtin("int"))
}

fn named(node: u32, text: &str) -> Option<TypeSpec> {
    Some(TypeSpec::named(id(node, text)))
}

fn param(name: Option<Ident>, ty: Option<TypeSpec>) -> ParamDecl {
    ParamDecl { name, ty }
}

fn func(node: u32, name: &str, return_type: Option<TypeSpec>, params: Vec<ParamDecl>) -> CppEvent {
    CppEvent::FunctionEnter(FunctionSpec {
        name: id(node, name),
        return_type,
        params,
    })
}

fn class(node: u32, name: &str, members: Vec<MemberDecl>) -> CppEvent {
    CppEvent::ClassEnter(ClassSpec {
        key: ClassKey::Class,
        name: id(node, name),
        bases: Vec::new(),
        members,
    })
}

fn field(node: u32, name: &str, ty: Option<TypeSpec>) -> MemberDecl {
    MemberDecl::Field {
        name: id(node, name),
        ty,
    }
}

fn decl(ty: Option<TypeSpec>, names: &[(u32, &str)]) -> CppEvent {
    CppEvent::Declaration {
        ty,
        declarators: names.iter().map(|(n, t)| id(*n, t)).collect(),
    }
}

fn var(node: u32, name: &str) -> CppEvent {
    CppEvent::PrimaryExit {
        primary: Primary::Ident(id(node, name)),
        callee: false,
    }
}

fn callee(node: u32, name: &str) -> CppEvent {
    CppEvent::PrimaryExit {
        primary: Primary::Ident(id(node, name)),
        callee: true,
    }
}

fn literal() -> CppEvent {
    CppEvent::PrimaryExit {
        primary: Primary::Other,
        callee: false,
    }
}

fn member(node: u32, name: &str, is_callee: bool) -> CppEvent {
    CppEvent::MemberAccessExit {
        member: id(node, name),
        callee: is_callee,
    }
}

fn call(args: usize, callee: CalleeShape) -> CppEvent {
    CppEvent::CallExit { args, callee }
}

fn index_units(units: Vec<CppUnit>, parallel: bool) -> (IndexStats, Collector) {
    let config = IndexerConfig {
        parallel,
        ..IndexerConfig::default()
    };
    let frontend = CppFrontEnd::from_config(&config);
    let mut sink = Collector::new();
    let stats = Indexer::new(config).run(&frontend, &units, &mut sink).unwrap();
    check_invariants(&sink);
    (stats, sink)
}

fn index(events: Vec<CppEvent>) -> Collector {
    index_units(vec![CppUnit::new("test.cpp", events)], false).1
}

/// Every Ref binds to an emitted Def, and no Def path repeats.
fn check_invariants(sink: &Collector) {
    let mut defs = HashSet::new();
    for def in sink.defs() {
        assert!(defs.insert(def.path()), "duplicate def path {}", def.path());
    }
    for reference in sink.refs() {
        assert!(
            defs.contains(reference.path()),
            "ref to {} has no def",
            reference.path()
        );
    }
}

fn def_paths(sink: &Collector) -> Vec<&str> {
    sink.defs().map(|d| d.path()).collect()
}

fn ref_paths(sink: &Collector) -> Vec<(u32, &str)> {
    sink.refs().map(|r| (r.node.0, r.path())).collect()
}

#[test]
fn test_local_shadows_global() {
    // int x; void f() { float x; x + 1; }
    let sink = index(vec![
        decl(int(), &[(1, "x")]),
        func(2, "f", Some(TypeSpec::builtin("void")), vec![]),
        decl(Some(TypeSpec::builtin("float")), &[(3, "x")]),
        var(4, "x"),
        literal(),
        CppEvent::OperatorExit { operands: 2 },
        CppEvent::ExpressionEnd,
        CppEvent::FunctionExit,
    ]);

    assert_eq!(def_paths(&sink), vec!["x", "f()", "f().x"]);
    assert_eq!(ref_paths(&sink), vec![(4, "f().x")]);

    let f = sink.defs().nth(1).unwrap();
    assert_eq!(f.kind, DefKind::Function);
    assert_eq!(f.format.repr, "() void");
}

#[test]
fn test_constructor_and_free_function_calls() {
    let sink = index(vec![
        // class Foo { Foo(int); };
        class(
            1,
            "Foo",
            vec![MemberDecl::Method {
                name: id(2, "Foo"),
                return_type: None,
                params: vec![param(None, int())],
                has_body: false,
            }],
        ),
        CppEvent::ClassExit,
        // void bar(int a) {}
        func(3, "bar", Some(TypeSpec::builtin("void")), vec![param(Some(id(4, "a")), int())]),
        CppEvent::FunctionExit,
        // int main() { Foo(3); bar(3); }
        func(5, "main", int(), vec![]),
        callee(6, "Foo"),
        literal(),
        call(1, CalleeShape::Primary),
        CppEvent::ExpressionEnd,
        callee(7, "bar"),
        literal(),
        call(1, CalleeShape::Primary),
        CppEvent::ExpressionEnd,
        CppEvent::FunctionExit,
    ]);

    assert_eq!(
        def_paths(&sink),
        vec!["Foo", "Foo.Foo(_)", "bar(_)", "bar(_).a", "main()"]
    );
    assert_eq!(ref_paths(&sink), vec![(6, "Foo.Foo(_)"), (7, "bar(_)")]);

    let ctor = sink.defs().nth(1).unwrap();
    assert_eq!(ctor.format.repr, "(int)");
}

#[test]
fn test_member_access_through_variable() {
    // class A { int n; }; A a; a.n;
    let sink = index(vec![
        class(1, "A", vec![field(2, "n", int())]),
        CppEvent::ClassExit,
        decl(named(3, "A"), &[(4, "a")]),
        var(5, "a"),
        member(6, "n", false),
        CppEvent::ExpressionEnd,
    ]);

    assert_eq!(def_paths(&sink), vec!["A", "A.n", "a"]);
    assert_eq!(ref_paths(&sink), vec![(3, "A"), (5, "a"), (6, "A.n")]);

    let n = sink.defs().nth(1).unwrap();
    assert_eq!(n.kind, DefKind::Member);
    assert_eq!(n.format.to_string(), "int");
}

#[test]
fn test_method_body_sees_later_field() {
    // class B { int get() { return m; } int m; };
    let sink = index(vec![
        class(
            1,
            "B",
            vec![
                MemberDecl::Method {
                    name: id(2, "get"),
                    return_type: int(),
                    params: vec![],
                    has_body: true,
                },
                field(3, "m", int()),
            ],
        ),
        func(2, "get", int(), vec![]),
        var(4, "m"),
        CppEvent::ExpressionEnd,
        CppEvent::FunctionExit,
        CppEvent::ClassExit,
    ]);

    assert_eq!(def_paths(&sink), vec!["B", "B.m", "B.get()"]);
    assert_eq!(ref_paths(&sink), vec![(4, "B.m")]);
}

#[test]
fn test_method_call_on_self() {
    // class C { int size(); int twice() { return this->size(); } };
    let sink = index(vec![
        class(
            1,
            "C",
            vec![
                MemberDecl::Method {
                    name: id(2, "size"),
                    return_type: int(),
                    params: vec![],
                    has_body: false,
                },
                MemberDecl::Method {
                    name: id(3, "twice"),
                    return_type: int(),
                    params: vec![],
                    has_body: true,
                },
            ],
        ),
        func(3, "twice", int(), vec![]),
        CppEvent::PrimaryExit {
            primary: Primary::SelfRef,
            callee: false,
        },
        member(4, "size", true),
        call(0, CalleeShape::MemberAccess),
        CppEvent::ExpressionEnd,
        // plain call resolves against the current class too
        callee(5, "size"),
        call(0, CalleeShape::Primary),
        CppEvent::ExpressionEnd,
        CppEvent::FunctionExit,
        CppEvent::ClassExit,
    ]);

    assert_eq!(def_paths(&sink), vec!["C", "C.size()", "C.twice()"]);
    assert_eq!(ref_paths(&sink), vec![(4, "C.size()"), (5, "C.size()")]);
}

#[test]
fn test_sibling_blocks_get_fresh_scopes() {
    let sink = index(vec![
        func(1, "f", Some(TypeSpec::builtin("void")), vec![]),
        CppEvent::BlockEnter,
        decl(int(), &[(2, "y")]),
        CppEvent::BlockExit,
        CppEvent::BlockEnter,
        decl(int(), &[(3, "y")]),
        var(4, "y"),
        CppEvent::ExpressionEnd,
        CppEvent::BlockExit,
        CppEvent::FunctionExit,
    ]);

    assert_eq!(def_paths(&sink), vec!["f()", "f().0.y", "f().1.y"]);
    assert_eq!(ref_paths(&sink), vec![(4, "f().1.y")]);
}

#[test]
fn test_nested_class_restores_outer() {
    let sink = index(vec![
        class(1, "Outer", vec![field(2, "k", int())]),
        class(3, "Inner", vec![field(4, "k", int())]),
        CppEvent::ClassExit,
        func(5, "g", int(), vec![]),
        CppEvent::PrimaryExit {
            primary: Primary::SelfRef,
            callee: false,
        },
        member(6, "k", false),
        CppEvent::ExpressionEnd,
        CppEvent::FunctionExit,
        CppEvent::ClassExit,
        // Inner is only visible inside Outer
        decl(named(7, "Inner"), &[(8, "i")]),
    ]);

    assert_eq!(
        def_paths(&sink),
        vec!["Outer", "Outer.k", "Outer.Inner", "Outer.Inner.k", "Outer.g()", "i"]
    );
    assert_eq!(ref_paths(&sink), vec![(6, "Outer.k")]);
}

#[test]
fn test_base_class_and_typedef_refs() {
    let sink = index(vec![
        class(1, "A", vec![field(2, "n", int())]),
        CppEvent::ClassExit,
        CppEvent::ClassEnter(ClassSpec {
            key: ClassKey::Struct,
            name: id(3, "B"),
            bases: vec![id(4, "A"), id(5, "Missing")],
            members: Vec::new(),
        }),
        CppEvent::ClassExit,
        CppEvent::Typedef {
            name: id(6, "Alias"),
            target: TypeSpec::named(id(7, "A")),
        },
        decl(named(8, "Alias"), &[(9, "v")]),
        var(10, "v"),
        member(11, "n", false),
        CppEvent::ExpressionEnd,
    ]);

    let b = sink.defs().find(|d| d.path() == "B").unwrap();
    assert_eq!(b.kind, DefKind::Struct);
    assert_eq!(b.format.to_string(), "struct struct");

    let alias = sink.defs().find(|d| d.path() == "Alias").unwrap();
    assert_eq!(alias.kind, DefKind::Typedef);
    assert_eq!(
        ref_paths(&sink),
        vec![(4, "A"), (7, "A"), (8, "Alias"), (10, "v"), (11, "A.n")]
    );
}

#[test]
fn test_constructor_without_declaration_refs_class() {
    let sink = index(vec![
        class(1, "P", vec![]),
        CppEvent::ClassExit,
        decl(named(2, "P"), &[(3, "p")]),
        callee(4, "P"),
        call(0, CalleeShape::Primary),
        CppEvent::ExpressionEnd,
    ]);
    assert_eq!(ref_paths(&sink), vec![(2, "P"), (4, "P")]);
}

#[test]
fn test_declaration_name_not_referenced() {
    // The declaring node of a Def never shows up as a Ref.
    let sink = index(vec![decl(int(), &[(1, "x")]), var(1, "x"), CppEvent::ExpressionEnd]);
    assert!(sink.refs().next().is_none());
}

fn two_units() -> Vec<CppUnit> {
    vec![
        CppUnit::new(
            "use.cpp",
            vec![
                func(1, "main", int(), vec![]),
                callee(2, "helper"),
                call(0, CalleeShape::Primary),
                CppEvent::ExpressionEnd,
                CppEvent::FunctionExit,
            ],
        ),
        CppUnit::new(
            "lib.cpp",
            vec![
                func(1, "helper", int(), vec![]),
                CppEvent::FunctionExit,
            ],
        ),
    ]
}

#[test]
fn test_forward_reference_across_units() {
    let (stats, sink) = index_units(two_units(), false);
    assert_eq!(stats, IndexStats { units: 2, defs: 2, refs: 1 });
    assert_eq!(ref_paths(&sink), vec![(2, "helper()")]);
}

#[test]
fn test_runs_are_deterministic_and_parallel_safe() {
    let (_, first) = index_units(two_units(), false);
    let (_, second) = index_units(two_units(), false);
    let (_, parallel) = index_units(two_units(), true);

    assert_eq!(first, second);
    assert_eq!(first, parallel);
    assert!(first
        .records()
        .iter()
        .position(|r| matches!(r, Record::Ref(_)))
        .is_some_and(|first_ref| first.records()[..first_ref]
            .iter()
            .all(|r| matches!(r, Record::Def(_)))));
}
