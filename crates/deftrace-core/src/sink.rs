//! Record sinks
//!
//! The emitter hands every forwarded [`Def`] and [`Ref`] to a [`Sink`].
//! Recording a record is infallible from the resolver's point of view; a
//! sink that can fail (e.g. one writing to a file) keeps the first error and
//! reports it from [`Sink::flush`] or its own finishing method.
//!
//! # Implementations
//!
//! - [`Collector`] - keep records in memory, in emission order
//! - [`JsonLinesSink`] - one JSON object per line to any writer
//! - [`NullSink`] - discard everything (for timing runs)

pub mod json;

pub use json::JsonLinesSink;

use crate::record::{Def, Record, Ref};

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors that can occur while writing records out
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receiver of emitted records.
pub trait Sink {
    /// Accept one definition
    fn def(&mut self, def: Def);

    /// Accept one reference
    fn reference(&mut self, reference: Ref);

    /// Push buffered output through and report any deferred failure
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Null sink - discards all records
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn def(&mut self, _def: Def) {}

    fn reference(&mut self, _reference: Ref) {}
}

/// In-memory sink keeping records in emission order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collector {
    records: Vec<Record>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn defs(&self) -> impl Iterator<Item = &Def> {
        self.records.iter().filter_map(|record| match record {
            Record::Def(def) => Some(def),
            Record::Ref(_) => None,
        })
    }

    pub fn refs(&self) -> impl Iterator<Item = &Ref> {
        self.records.iter().filter_map(|record| match record {
            Record::Ref(reference) => Some(reference),
            Record::Def(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replay every record into `sink`, in order.
    pub fn drain_into(&mut self, sink: &mut dyn Sink) {
        for record in self.records.drain(..) {
            match record {
                Record::Def(def) => sink.def(def),
                Record::Ref(reference) => sink.reference(reference),
            }
        }
    }
}

impl Sink for Collector {
    fn def(&mut self, def: Def) {
        self.records.push(Record::Def(def));
    }

    fn reference(&mut self, reference: Ref) {
        self.records.push(Record::Ref(reference));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::{NodeId, Span};
    use crate::record::{DefKey, DefKind};

    fn reference(path: &str) -> Ref {
        Ref {
            node: NodeId(1),
            def_key: DefKey {
                unit: None,
                path: path.to_string(),
            },
            span: Span::default(),
        }
    }

    #[test]
    fn test_collector_keeps_order() {
        let mut sink = Collector::new();
        sink.def(Def::new(NodeId(0), "x", DefKind::Var, Span::default()));
        sink.reference(reference("x"));
        sink.def(Def::new(NodeId(2), "y", DefKind::Var, Span::default()));

        assert_eq!(sink.len(), 3);
        assert!(matches!(sink.records()[1], Record::Ref(_)));
        assert_eq!(sink.defs().count(), 2);
        assert_eq!(sink.refs().count(), 1);
    }

    #[test]
    fn test_drain_into_replays_in_order() {
        let mut buffer = Collector::new();
        buffer.reference(reference("a"));
        buffer.reference(reference("b"));

        let mut target = Collector::new();
        buffer.drain_into(&mut target);
        assert!(buffer.is_empty());
        let paths: Vec<_> = target.refs().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["a", "b"]);
    }

    #[test]
    fn test_null_sink_flushes() {
        let mut sink = NullSink;
        sink.reference(reference("a"));
        assert!(sink.flush().is_ok());
    }
}
