//! Form walker: Clojure forms to Defs and Refs
//!
//! Walks the forms of one unit against a [`NamespaceResolver`]. Binding
//! forms emit Defs and bind names in the current scope; every other symbol
//! is resolved and, on a hit, becomes a Ref.
//!
//! # Forms
//!
//! | Form | Effect |
//! |------|--------|
//! | `(ns n ...)` | switch to `n`, `NAMESPACE` Def at `n`, process `:use`/`:require` |
//! | `(in-ns 'n)` | switch to `n` |
//! | `(def n ..)` | `VAR` Def |
//! | `(defn n ..)` | `FUNC` Def, params in a scope named `n` |
//! | `(fn ..)` | anonymous scope; each arity arm of a multi-arity fn gets its own |
//! | `(let [..] ..)` | anonymous scope, `LETVAR` Defs visible to later initialisers |
//! | `'form` | skipped |
//!
//! Namespace switches only take effect at the top level of a namespace.
//!
//! Top-level `def`/`defn` names are recorded as properties of their
//! namespace in the [`TypeInfos`] registry. `declare` binds a name only
//! once the registry knows its definition, so a forward-declared name
//! resolves in the reference pass and never leads to a dangling Ref.

use tracing::{trace, warn};

use deftrace_core::{
    Def, DefKind, Emitter, FormatSeparator, NamespaceResolver, Separators, TypeInfos,
};

use crate::reader::{Form, FormKind, Prefix};

/// Heads that open a scope of sequential `[pattern init ...]` bindings.
const LET_FORMS: &[&str] = &[
    "let",
    "let*",
    "loop",
    "loop*",
    "when-let",
    "if-let",
    "when-some",
    "if-some",
    "when-first",
    "with-open",
    "with-local-vars",
    "dotimes",
];

/// Heads whose binding vector also takes `:let`, `:when` and `:while`.
const COMPREHENSION_FORMS: &[&str] = &["for", "doseq"];

pub struct Walker<'u, 'e, 's> {
    infos: &'u mut TypeInfos<()>,
    emitter: &'e mut Emitter<'s>,
    ns: NamespaceResolver<()>,
}

impl<'u, 'e, 's> Walker<'u, 'e, 's> {
    pub fn new(
        infos: &'u mut TypeInfos<()>,
        emitter: &'e mut Emitter<'s>,
        default_namespace: &str,
        separators: Separators,
    ) -> Self {
        Self {
            infos,
            emitter,
            ns: NamespaceResolver::new(default_namespace, separators),
        }
    }

    /// Namespace state after the forms walked so far.
    pub fn namespaces(&self) -> &NamespaceResolver<()> {
        &self.ns
    }

    /// Walk top-level forms in order.
    pub fn walk(&mut self, forms: &[Form]) {
        self.forms(forms);
    }

    fn forms(&mut self, forms: &[Form]) {
        for form in forms {
            self.form(form);
        }
    }

    fn form(&mut self, form: &Form) {
        match &form.kind {
            FormKind::List(items) => self.list(items),
            FormKind::Vector(items)
            | FormKind::Map(items)
            | FormKind::Set(items)
            | FormKind::AnonFn(items)
            | FormKind::ReaderCond(items) => self.forms(items),
            FormKind::Symbol(name) => self.symbol(form, name),
            FormKind::Prefixed { prefix, form } => match prefix {
                Prefix::Quote => {}
                Prefix::SyntaxQuote => self.unquoted(form),
                _ => self.form(form),
            },
            FormKind::Meta { form, .. } => self.form(form),
            FormKind::Keyword(_) | FormKind::Literal(_) => {}
        }
    }

    /// Inside a syntax quote only `~` and `~@` forms are evaluated.
    fn unquoted(&mut self, form: &Form) {
        match &form.kind {
            FormKind::Prefixed {
                prefix: Prefix::Unquote | Prefix::UnquoteSplice,
                form,
            } => self.form(form),
            FormKind::Prefixed { form, .. } | FormKind::Meta { form, .. } => self.unquoted(form),
            _ => {
                for child in form.children().unwrap_or_default() {
                    self.unquoted(child);
                }
            }
        }
    }

    fn list(&mut self, items: &[Form]) {
        let Some(head) = items.first() else {
            return;
        };
        match head.symbol() {
            Some("ns") => self.ns_form(items),
            Some("in-ns") => self.in_ns(items),
            Some("def" | "defonce") => self.def_form(items),
            Some("defn" | "defn-" | "defmacro") => self.defn_form(items),
            Some("fn" | "fn*") => self.fn_form(&items[1..]),
            Some("letfn") => self.letfn_form(items),
            Some("catch") => self.catch_form(items),
            Some("declare") => self.declare(&items[1..]),
            Some("require") => self.lib_call(&items[1..], false),
            Some("use") => self.lib_call(&items[1..], true),
            Some("quote") => {}
            Some(head) if LET_FORMS.contains(&head) => self.let_form(items, false),
            Some(head) if COMPREHENSION_FORMS.contains(&head) => self.let_form(items, true),
            _ => self.forms(items),
        }
    }

    fn symbol(&mut self, form: &Form, name: &str) {
        let hit = match split_qualified(name) {
            Some((namespace, local)) => self.ns.lookup_in(namespace, local),
            None => self.ns.lookup(name),
        };
        match hit {
            Some(hit) => self.emitter.reference(form.id, form.span, hit.path),
            None => trace!(symbol = %name, "unresolved"),
        }
    }

    // === Definitions ===

    /// Emit a Def for `name` in the current scope and bind it there.
    fn define(&mut self, form: &Form, name: &str, kind: DefKind, keyword: Option<&str>) {
        let path = self.ns.def_path(name);
        let mut def = Def::new(form.id, name, kind, form.span);
        if let Some(keyword) = keyword {
            def = def.with_format(keyword, "", FormatSeparator::Empty);
        }
        self.emitter.def(def, path);
        self.ns.context_mut().current_mut().put(name, ());
    }

    /// Record a namespace-level definition for `declare`.
    fn register(&mut self, name: &str, kind: DefKind) {
        if self.at_top_level() {
            let namespace = self.ns.current_namespace().to_string();
            self.infos.set_property(&namespace, kind, name, None);
        }
    }

    fn at_top_level(&self) -> bool {
        self.ns.context().depth() == 1
    }

    fn def_form(&mut self, items: &[Form]) {
        let Some((name_form, name)) = items.get(1).and_then(named) else {
            warn!(span = %items[0].span, "def without a name");
            self.forms(&items[1..]);
            return;
        };
        self.define(name_form, name, DefKind::Var, Some("def"));
        self.register(name, DefKind::Var);
        self.forms(&items[2..]);
    }

    fn defn_form(&mut self, items: &[Form]) {
        let Some((name_form, name)) = items.get(1).and_then(named) else {
            warn!(span = %items[0].span, "defn without a name");
            self.forms(&items[1..]);
            return;
        };
        self.define(name_form, name, DefKind::Func, Some("defn"));
        self.register(name, DefKind::Func);

        let scope = self.ns.context().child(name);
        self.ns.context_mut().enter(scope);
        self.fn_tail(&items[2..]);
        self.ns.context_mut().exit();
    }

    fn fn_form(&mut self, rest: &[Form]) {
        let scope = self.ns.context_mut().next_child();
        self.ns.context_mut().enter(scope);

        let rest = match rest.first().and_then(named) {
            Some((name_form, name)) => {
                self.define(name_form, name, DefKind::Func, Some("fn"));
                &rest[1..]
            }
            None => rest,
        };
        self.fn_tail(rest);
        self.ns.context_mut().exit();
    }

    /// Everything after a function's name: docstring, attribute map, then
    /// either `[params] body..` or arity arms `([params] body..)..`.
    fn fn_tail(&mut self, mut rest: &[Form]) {
        while let Some(first) = rest.first() {
            match &first.kind {
                FormKind::Literal(_) | FormKind::Map(_) => rest = &rest[1..],
                _ => break,
            }
        }

        if let Some(params) = rest.first().filter(|f| f.without_meta().as_vector().is_some()) {
            self.bind_pattern(params, DefKind::Param);
            self.forms(&rest[1..]);
            return;
        }

        for form in rest {
            match form.as_list() {
                Some([params, body @ ..]) if params.without_meta().as_vector().is_some() => {
                    let scope = self.ns.context_mut().next_child();
                    self.ns.context_mut().enter(scope);
                    self.bind_pattern(params, DefKind::Param);
                    self.forms(body);
                    self.ns.context_mut().exit();
                }
                _ => self.form(form),
            }
        }
    }

    fn let_form(&mut self, items: &[Form], comprehension: bool) {
        let Some(bindings) = items.get(1).and_then(|f| f.without_meta().as_vector()) else {
            self.forms(&items[1..]);
            return;
        };
        let scope = self.ns.context_mut().next_child();
        self.ns.context_mut().enter(scope);
        self.bindings(bindings, comprehension);
        self.forms(&items[2..]);
        self.ns.context_mut().exit();
    }

    /// `[pattern init ...]`, each init seeing the bindings before it.
    fn bindings(&mut self, items: &[Form], comprehension: bool) {
        for pair in items.chunks(2) {
            let target = &pair[0];
            let value = pair.get(1);
            match target.keyword() {
                Some("let") if comprehension => {
                    if let Some(nested) = value.and_then(Form::as_vector) {
                        self.bindings(nested, false);
                    }
                }
                Some(_) if comprehension => {
                    if let Some(value) = value {
                        self.form(value);
                    }
                }
                _ => {
                    if let Some(value) = value {
                        self.form(value);
                    }
                    self.bind_pattern(target, DefKind::Letvar);
                }
            }
        }
    }

    fn letfn_form(&mut self, items: &[Form]) {
        let Some(specs) = items.get(1).and_then(Form::as_vector) else {
            self.forms(&items[1..]);
            return;
        };
        let scope = self.ns.context_mut().next_child();
        self.ns.context_mut().enter(scope);

        // All names first: the functions may call each other.
        for spec in specs {
            if let Some((name_form, name)) = spec.as_list().and_then(|l| l.first()).and_then(named)
            {
                self.define(name_form, name, DefKind::Func, Some("fn"));
            }
        }
        for spec in specs {
            match spec.as_list() {
                Some([_, tail @ ..]) => {
                    let scope = self.ns.context_mut().next_child();
                    self.ns.context_mut().enter(scope);
                    self.fn_tail(tail);
                    self.ns.context_mut().exit();
                }
                _ => self.form(spec),
            }
        }

        self.forms(&items[2..]);
        self.ns.context_mut().exit();
    }

    /// `(catch Class e body..)`
    fn catch_form(&mut self, items: &[Form]) {
        if let Some(class) = items.get(1) {
            self.form(class);
        }
        let scope = self.ns.context_mut().next_child();
        self.ns.context_mut().enter(scope);
        if let Some((name_form, name)) = items.get(2).and_then(named) {
            self.define(name_form, name, DefKind::Letvar, None);
        }
        self.forms(items.get(3..).unwrap_or_default());
        self.ns.context_mut().exit();
    }

    fn declare(&mut self, names: &[Form]) {
        let namespace = self.ns.current_namespace().to_string();
        for name in names.iter().filter_map(|f| f.without_meta().symbol()) {
            let defined = self.infos.owner(&namespace).is_some_and(|info| {
                info.property(DefKind::Func, name).is_some()
                    || info.property(DefKind::Var, name).is_some()
            });
            if defined {
                self.ns.context_mut().current_mut().put(name, ());
            } else {
                trace!(name = %name, "declared name not defined yet");
            }
        }
    }

    /// Bind every name a destructuring pattern introduces.
    fn bind_pattern(&mut self, pattern: &Form, kind: DefKind) {
        let pattern = pattern.without_meta();
        match &pattern.kind {
            FormKind::Symbol(name) if name != "&" && split_qualified(name).is_none() => {
                self.define(pattern, name, kind, None);
            }
            FormKind::Vector(items) => {
                let mut items = items.iter();
                while let Some(item) = items.next() {
                    if item.is_keyword("as") || item.symbol() == Some("&") {
                        if let Some(target) = items.next() {
                            self.bind_pattern(target, kind);
                        }
                    } else {
                        self.bind_pattern(item, kind);
                    }
                }
            }
            FormKind::Map(items) => self.bind_map_pattern(items, kind),
            _ => {}
        }
    }

    fn bind_map_pattern(&mut self, items: &[Form], kind: DefKind) {
        let mut defaults = None;
        for pair in items.chunks(2) {
            let [key, value] = pair else {
                continue;
            };
            match key.keyword() {
                Some("as") => self.bind_pattern(value, kind),
                Some("or") => defaults = Some(value),
                Some(k) if is_keys_directive(k) => {
                    for item in value.as_vector().unwrap_or_default() {
                        let local = item
                            .symbol()
                            .or_else(|| item.keyword())
                            .map(|name| name.rsplit('/').next().unwrap_or(name));
                        if let Some(local) = local {
                            self.define(item, local, kind, None);
                        }
                    }
                }
                Some(_) => {}
                None => self.bind_pattern(key, kind),
            }
        }

        // Defaults are evaluated in the enclosing bindings.
        if let Some(FormKind::Map(entries)) = defaults.map(|d| &d.kind) {
            for value in entries.iter().skip(1).step_by(2) {
                self.form(value);
            }
        }
    }

    // === Namespaces ===

    fn ns_form(&mut self, items: &[Form]) {
        let Some((name_form, name)) = items.get(1).and_then(named) else {
            warn!(span = %items[0].span, "ns without a name");
            return;
        };
        if !self.switch_namespace(name) {
            return;
        }
        let def = Def::new(name_form.id, name, DefKind::Namespace, name_form.span).with_format(
            "ns",
            "",
            FormatSeparator::Empty,
        );
        self.emitter.def(def, name.to_string());

        for clause in &items[2..] {
            let Some([head, specs @ ..]) = clause.as_list() else {
                continue;
            };
            match head.keyword() {
                Some("use") => self.lib_specs(specs, None, true),
                Some("require") => self.lib_specs(specs, None, false),
                _ => {}
            }
        }
    }

    fn in_ns(&mut self, items: &[Form]) {
        match items.get(1).and_then(Form::quoted_symbol) {
            Some(name) => {
                self.switch_namespace(name);
            }
            None => warn!(span = %items[0].span, "in-ns without a namespace name"),
        }
    }

    fn switch_namespace(&mut self, name: &str) -> bool {
        if !self.at_top_level() {
            warn!(namespace = %name, "namespace switch inside a local scope ignored");
            return false;
        }
        self.ns.enter_namespace(name);
        true
    }

    /// `(require '[a :as b])` and `(use 'a)` outside `ns`.
    fn lib_call(&mut self, args: &[Form], use_all: bool) {
        let specs: Vec<&Form> = args
            .iter()
            .map(|arg| match &arg.kind {
                FormKind::Prefixed {
                    prefix: Prefix::Quote,
                    form,
                } => &**form,
                _ => arg,
            })
            .collect();
        for spec in specs {
            self.lib_spec(spec, None, use_all);
        }
    }

    fn lib_specs(&mut self, specs: &[Form], prefix: Option<&str>, use_all: bool) {
        for spec in specs {
            self.lib_spec(spec, prefix, use_all);
        }
    }

    /// One libspec: `a`, `[a :as x :refer ..]`, or a prefix list `(a b [c :as x])`.
    fn lib_spec(&mut self, spec: &Form, prefix: Option<&str>, use_all: bool) {
        match &spec.kind {
            FormKind::Symbol(lib) => {
                if use_all {
                    self.ns.add_used_namespace(lib_name(prefix, lib));
                }
            }
            FormKind::Vector(items) | FormKind::List(items) => {
                let Some((lib, rest)) = items.split_first() else {
                    return;
                };
                let Some(lib) = lib.symbol() else {
                    return;
                };
                let full = lib_name(prefix, lib);
                let is_prefix_list = matches!(spec.kind, FormKind::List(_))
                    || rest.first().is_some_and(|f| f.keyword().is_none());
                if is_prefix_list {
                    self.lib_specs(rest, Some(&full), use_all);
                    return;
                }

                let mut refers = use_all;
                for option in rest.chunks(2) {
                    match (option[0].keyword(), option.get(1)) {
                        (Some("as"), Some(alias)) => {
                            if let Some(alias) = alias.symbol() {
                                self.ns.add_alias(alias, full.clone());
                            }
                        }
                        (Some("refer"), Some(_)) => refers = true,
                        _ => {}
                    }
                }
                if refers {
                    self.ns.add_used_namespace(full);
                }
            }
            _ => {}
        }
    }
}

/// A binding name, looking through metadata.
fn named(form: &Form) -> Option<(&Form, &str)> {
    let form = form.without_meta();
    form.symbol().map(|name| (form, name))
}

/// `ns/name` split at the first `/`; `None` for plain names and `/` itself.
fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.split_once('/')
        .filter(|(ns, local)| !ns.is_empty() && !local.is_empty())
}

fn is_keys_directive(keyword: &str) -> bool {
    let local = keyword.rsplit('/').next().unwrap_or(keyword);
    matches!(local, "keys" | "strs" | "syms")
}

fn lib_name(prefix: Option<&str>, lib: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{lib}"),
        None => lib.to_string(),
    }
}
