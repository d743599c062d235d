//! JSON-lines sink
//!
//! Writes each record as one JSON object per line, tagged `Def` or `Ref`.

use std::io::Write;

use tracing::warn;

use super::{Result, Sink, SinkError};
use crate::record::{Def, Record, Ref};

/// Sink writing one JSON object per record.
///
/// The first write failure is kept and every later record is dropped; the
/// failure surfaces from [`Sink::flush`] or [`JsonLinesSink::finish`].
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
    error: Option<SinkError>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    fn write_record(&mut self, record: &Record) {
        if self.error.is_some() {
            return;
        }
        let outcome = serde_json::to_writer(&mut self.writer, record)
            .map_err(SinkError::from)
            .and_then(|()| self.writer.write_all(b"\n").map_err(SinkError::from));
        match outcome {
            Ok(()) => self.written += 1,
            Err(err) => {
                warn!(error = %err, path = record.path(), "record write failed, dropping further output");
                self.error = Some(err);
            }
        }
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn def(&mut self, def: Def) {
        self.write_record(&Record::Def(def));
    }

    fn reference(&mut self, reference: Ref) {
        self.write_record(&Record::Ref(reference));
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(())
    }
}
