//! C-family front-end for the indexing driver.

use std::path::Path;

use tracing::debug;

use deftrace_core::{
    Emitter, FrontEnd, IndexError, IndexerConfig, Result, Separators, TypeInfos, Variable,
};

use crate::event::CppEvent;
use crate::listener::CppListener;

/// One translation unit: its label and its event stream.
#[derive(Debug, Clone)]
pub struct CppUnit {
    pub name: String,
    pub events: Vec<CppEvent>,
}

impl CppUnit {
    pub fn new(name: impl Into<String>, events: Vec<CppEvent>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }

    /// Load a JSON array of events, labelled with the file path.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        let events: Vec<CppEvent> =
            serde_json::from_str(&text).map_err(|e| IndexError::json(path, e))?;
        debug!(path = %path.display(), events = events.len(), "loaded event stream");
        Ok(Self::new(path.display().to_string(), events))
    }
}

/// Drives a [`CppListener`] per unit and pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppFrontEnd {
    separators: Separators,
}

impl CppFrontEnd {
    pub fn new(separators: Separators) -> Self {
        Self { separators }
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(config.separators())
    }
}

impl FrontEnd for CppFrontEnd {
    type Unit = CppUnit;
    type Binding = Variable;

    fn unit_name<'u>(&self, unit: &'u CppUnit) -> &'u str {
        &unit.name
    }

    fn index_unit(
        &self,
        unit: &CppUnit,
        infos: &mut TypeInfos<Variable>,
        emitter: &mut Emitter<'_>,
    ) {
        let mut listener = CppListener::new(infos, emitter, self.separators);
        listener.walk(&unit.events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_event_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"event": "declaration", "ty": {{"type": "builtin", "text": "int"}},
                 "declarators": [{{"node": 1, "text": "x"}}]}}]"#
        )
        .unwrap();

        let unit = CppUnit::from_json_file(file.path()).unwrap();
        assert_eq!(unit.events.len(), 1);
        assert_eq!(unit.name, file.path().display().to_string());
    }

    #[test]
    fn test_load_rejects_unknown_event() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"event": "goto"}}]"#).unwrap();
        let err = CppUnit::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, IndexError::Json { .. }));
    }
}
