//! Two-pass indexing driver
//!
//! Runs a [`FrontEnd`] over a set of translation units:
//!
//! 1. **Definitions**: every unit is walked in order against one shared
//!    type-info registry. Defs reach the sink; the registry fills up.
//! 2. **References**: every unit is walked again, each against its own
//!    clone of the registry as it stood at the end of pass 1. Refs reach
//!    the sink.
//!
//! Because each pass-2 walk starts from the same snapshot, units are
//! independent in pass 2 and may run on the rayon pool. Their records are
//! buffered per unit and flushed in unit order, so parallel and sequential
//! runs produce identical output.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::IndexerConfig;
use crate::emit::{Emitter, Pass};
use crate::error::Result;
use crate::sink::{Collector, Sink};
use crate::type_info::TypeInfos;

/// A language front-end: turns one unit into core operations.
///
/// `index_unit` is called once per pass with identical inputs and must
/// make identical state changes each time; only the emitter's pass
/// differs.
pub trait FrontEnd: Sync {
    /// One translation unit of input
    type Unit: Sync;
    /// Value bound in scopes and type bodies
    type Binding: Clone + Send + Sync;

    /// Label for log output.
    fn unit_name<'u>(&self, unit: &'u Self::Unit) -> &'u str;

    /// Walk one unit.
    fn index_unit(
        &self,
        unit: &Self::Unit,
        infos: &mut TypeInfos<Self::Binding>,
        emitter: &mut Emitter<'_>,
    );
}

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub units: usize,
    pub defs: usize,
    pub refs: usize,
}

/// Drives front-ends through both passes.
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run both passes over `units`, writing records to `sink`.
    pub fn run<F: FrontEnd>(
        &self,
        frontend: &F,
        units: &[F::Unit],
        sink: &mut dyn Sink,
    ) -> Result<IndexStats> {
        let (infos, defs) = self.run_definitions(frontend, units, sink);
        let refs = self.run_references(frontend, units, &infos, sink);
        sink.flush()?;

        let stats = IndexStats {
            units: units.len(),
            defs,
            refs,
        };
        info!(units = stats.units, defs = stats.defs, refs = stats.refs, "indexing complete");
        Ok(stats)
    }

    /// Pass 1: emit Defs and return the populated registry with the Def count.
    pub fn run_definitions<F: FrontEnd>(
        &self,
        frontend: &F,
        units: &[F::Unit],
        sink: &mut dyn Sink,
    ) -> (TypeInfos<F::Binding>, usize) {
        let mut infos = TypeInfos::new(self.config.path_separator);
        let mut defs = 0;
        for unit in units {
            let mut emitter = Emitter::new(Pass::Definitions, self.config.unit.clone(), sink);
            frontend.index_unit(unit, &mut infos, &mut emitter);
            debug!(unit = frontend.unit_name(unit), defs = emitter.defs(), "definitions pass");
            defs += emitter.defs();
        }
        debug!(types = infos.len(), "type registry populated");
        (infos, defs)
    }

    /// Pass 2: emit Refs against a registry snapshot; returns the Ref count.
    pub fn run_references<F: FrontEnd>(
        &self,
        frontend: &F,
        units: &[F::Unit],
        snapshot: &TypeInfos<F::Binding>,
        sink: &mut dyn Sink,
    ) -> usize {
        if !self.config.parallel {
            return units
                .iter()
                .map(|unit| self.references_for(frontend, unit, snapshot, sink))
                .sum();
        }

        let buffers: Vec<(Collector, usize)> = units
            .par_iter()
            .map(|unit| {
                let mut buffer = Collector::new();
                let refs = self.references_for(frontend, unit, snapshot, &mut buffer);
                (buffer, refs)
            })
            .collect();

        let mut refs = 0;
        for (mut buffer, count) in buffers {
            buffer.drain_into(sink);
            refs += count;
        }
        refs
    }

    fn references_for<F: FrontEnd>(
        &self,
        frontend: &F,
        unit: &F::Unit,
        snapshot: &TypeInfos<F::Binding>,
        sink: &mut dyn Sink,
    ) -> usize {
        let mut infos = snapshot.clone();
        let mut emitter = Emitter::new(Pass::References, self.config.unit.clone(), sink);
        frontend.index_unit(unit, &mut infos, &mut emitter);
        debug!(unit = frontend.unit_name(unit), refs = emitter.refs(), "references pass");
        emitter.refs()
    }
}
