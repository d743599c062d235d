//! End-to-end indexing of Clojure sources.

use std::collections::HashSet;

use deftrace_clojure::{ClojureFrontEnd, ClojureUnit, ReadErrorKind};
use deftrace_core::{Collector, DefKind, IndexStats, Indexer, IndexerConfig, Record};

fn index_units(units: &[(&str, &str)], config: IndexerConfig) -> (IndexStats, Collector) {
    let frontend = ClojureFrontEnd::from_config(&config);
    let units: Vec<_> = units
        .iter()
        .map(|(name, source)| ClojureUnit::parse(*name, source))
        .collect();
    let mut sink = Collector::new();
    let stats = Indexer::new(config).run(&frontend, &units, &mut sink).unwrap();
    check_invariants(&sink);
    (stats, sink)
}

fn index(source: &str) -> Collector {
    index_units(&[("test.clj", source)], IndexerConfig::default()).1
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

fn ref_paths(sink: &Collector) -> Vec<&str> {
    sink.refs().map(|r| r.path()).collect()
}

#[test]
fn test_namespace_reentry() {
    let sink = index("(in-ns foo) (defn g [] 1) (in-ns bar) (defn g [] 2) (defn h [] (g))");
    assert_eq!(def_paths(&sink), vec!["foo/g", "bar/g", "bar/h"]);
    assert_eq!(ref_paths(&sink), vec!["bar/g"]);
}

#[test]
fn test_local_shadows_namespace_var() {
    let sink = index("(ns app) (def x 1) (defn f [x] (let [x (inc x)] x)) x");
    assert_eq!(
        def_paths(&sink),
        vec!["app", "app/x", "app/f", "app/f.x", "app/f.0.x"]
    );
    assert_eq!(ref_paths(&sink), vec!["app/f.x", "app/f.0.x", "app/x"]);
}

#[test]
fn test_def_kinds() {
    let sink = index("(ns k) (def v 1) (defn f [p] (let [l p] l))");
    let kinds: Vec<_> = sink.defs().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DefKind::Namespace,
            DefKind::Var,
            DefKind::Func,
            DefKind::Param,
            DefKind::Letvar,
        ]
    );
    assert!(sink.defs().all(|d| d.def_data.kind == d.kind));
}

#[test]
fn test_aliases_and_used_namespaces() {
    let sink = index(
        "(ns util.str) (defn blank? [s] (empty? s))
         (ns app.core
           (:require [util.str :as us])
           (:use util.str))
         (defn run [s] (if (us/blank? s) (blank? s) s))",
    );
    assert_eq!(
        ref_paths(&sink),
        vec![
            "util.str/blank?.s",
            "util.str/blank?",
            "app.core/run.s",
            "util.str/blank?",
            "app.core/run.s",
            "app.core/run.s",
        ]
    );
}

#[test]
fn test_malformed_unit_still_indexed() {
    let (stats, sink) = index_units(
        &[("ok.clj", "(defn f [x] x)"), ("bad.clj", "(def a 1)) (defn g [y] (a y")],
        IndexerConfig::default(),
    );
    assert_eq!(stats.units, 2);
    assert_eq!(
        def_paths(&sink),
        vec!["user/f", "user/f.x", "user/a", "user/g", "user/g.y"]
    );
    assert_eq!(ref_paths(&sink), vec!["user/f.x", "user/a", "user/g.y"]);
}

#[test]
fn test_deeply_nested_unit_does_not_stop_the_run() {
    let levels = 100_000;
    let deep = format!("{}x{} (def after 1)", "(".repeat(levels), ")".repeat(levels));

    let unit = ClojureUnit::parse("deep.clj", &deep);
    assert!(unit
        .errors
        .iter()
        .any(|e| e.kind == ReadErrorKind::TooDeep));

    let config = IndexerConfig {
        parallel: true,
        ..IndexerConfig::default()
    };
    let (stats, sink) = index_units(
        &[
            ("ok.clj", "(defn f [x] x)"),
            ("deep.clj", &deep),
            ("tail.clj", "(defn g [y] y)"),
        ],
        config,
    );
    assert_eq!(stats.units, 3);
    assert_eq!(
        def_paths(&sink),
        vec!["user/f", "user/f.x", "user/after", "user/g", "user/g.y"]
    );
    assert_eq!(ref_paths(&sink), vec!["user/f.x", "user/g.y"]);
}

#[test]
fn test_configured_separators_and_unit_label() {
    let config = IndexerConfig {
        path_separator: ':',
        namespace_separator: '#',
        default_namespace: "scratch".to_string(),
        unit: Some("lib".to_string()),
        ..IndexerConfig::default()
    };
    let (_, sink) = index_units(&[("a.clj", "(defn f [x] x)")], config);
    assert_eq!(def_paths(&sink), vec!["scratch#f", "scratch#f:x"]);
    assert!(sink.defs().all(|d| d.def_key.unit.as_deref() == Some("lib")));
}

fn corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        ("a.clj", "(ns a) (defn f [x] (let [y x] (fn [z] (+ y z))))"),
        ("b.clj", "(ns b (:require [a :as a])) (defn g [& args] (map a/f args))"),
        ("c.clj", "(ns c) (defn h ([] (h 1)) ([n] (for [i (range n)] i)))"),
    ]
}

#[test]
fn test_runs_are_deterministic_and_parallel_safe() {
    let sequential = IndexerConfig::default();
    let parallel = IndexerConfig {
        parallel: true,
        ..IndexerConfig::default()
    };
    let (stats, first) = index_units(&corpus(), sequential.clone());
    let (_, second) = index_units(&corpus(), sequential);
    let (_, par) = index_units(&corpus(), parallel);

    assert_eq!(first, second);
    assert_eq!(first, par);
    assert_eq!(stats.units, 3);

    let first_ref = first
        .records()
        .iter()
        .position(|r| matches!(r, Record::Ref(_)))
        .unwrap();
    assert!(first.records()[..first_ref]
        .iter()
        .all(|r| matches!(r, Record::Def(_))));
}
