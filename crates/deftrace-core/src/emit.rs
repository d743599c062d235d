//! Two-pass emission gate
//!
//! Every translation unit is walked twice with identical state changes:
//!
//! - **Pass 1 (definitions)** forwards [`Def`]s and drops [`Ref`]s.
//! - **Pass 2 (references)** drops Defs and forwards Refs.
//!
//! References wait for pass 2 because a use near the top of a unit may bind
//! to a declaration further down, which is only known once pass 1 has
//! populated the type-info registry.
//!
//! The emitter also enforces two per-unit rules:
//!
//! - a Def whose path was already emitted in this unit is dropped;
//! - a Ref whose node declared a Def is dropped (a declaration's own name
//!   is never a reference to itself). Declaring nodes are recorded in both
//!   passes so the rule holds in pass 2 as well.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::foundation::{NodeId, Span};
use crate::record::{Def, DefKey, Ref};
use crate::sink::Sink;

/// Which records the current walk forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pass {
    Definitions,
    References,
}

/// Gate between a front-end walk and a sink, for one unit and one pass.
pub struct Emitter<'s> {
    pass: Pass,
    unit: Option<String>,
    sink: &'s mut dyn Sink,
    emitted_paths: HashSet<String>,
    declaring_nodes: HashSet<NodeId>,
    defs: usize,
    refs: usize,
}

impl<'s> Emitter<'s> {
    pub fn new(pass: Pass, unit: Option<String>, sink: &'s mut dyn Sink) -> Self {
        Self {
            pass,
            unit,
            sink,
            emitted_paths: HashSet::new(),
            declaring_nodes: HashSet::new(),
            defs: 0,
            refs: 0,
        }
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Emit `def` at `path`.
    pub fn def(&mut self, mut def: Def, path: String) {
        self.declaring_nodes.insert(def.node);
        if self.pass != Pass::Definitions {
            return;
        }
        if !self.emitted_paths.insert(path.clone()) {
            debug!(path = %path, name = %def.name, "duplicate definition path, dropping");
            return;
        }
        def.def_key = DefKey {
            unit: self.unit.clone(),
            path,
        };
        self.defs += 1;
        self.sink.def(def);
    }

    /// Emit a reference from `node` to the definition at `path`.
    pub fn reference(&mut self, node: NodeId, span: Span, path: String) {
        if self.pass != Pass::References {
            return;
        }
        if self.declaring_nodes.contains(&node) {
            trace!(%node, path = %path, "self-reference at declaration site, dropping");
            return;
        }
        self.refs += 1;
        self.sink.reference(Ref {
            node,
            def_key: DefKey {
                unit: self.unit.clone(),
                path,
            },
            span,
        });
    }

    /// Number of Defs forwarded so far.
    pub fn defs(&self) -> usize {
        self.defs
    }

    /// Number of Refs forwarded so far.
    pub fn refs(&self) -> usize {
        self.refs
    }
}
