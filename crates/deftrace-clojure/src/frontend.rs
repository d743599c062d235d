//! Clojure front-end for the indexing driver.

use std::path::Path;

use tracing::{debug, warn};

use deftrace_core::{Emitter, FrontEnd, IndexError, IndexerConfig, Result, Separators, TypeInfos};

use crate::reader::{read_source, Form, ReadError};
use crate::walker::Walker;

/// One source file, read once up front.
///
/// Read errors are logged when the unit is built; the forms that could
/// be read are indexed.
#[derive(Debug, Clone)]
pub struct ClojureUnit {
    pub name: String,
    pub forms: Vec<Form>,
    pub errors: Vec<ReadError>,
}

impl ClojureUnit {
    pub fn parse(name: impl Into<String>, source: &str) -> Self {
        let name = name.into();
        let (forms, errors) = read_source(source);
        for error in &errors {
            warn!(unit = %name, span = %error.span, kind = ?error.kind, "{}", error.message);
        }
        debug!(unit = %name, forms = forms.len(), errors = errors.len(), "read unit");
        Self {
            name,
            forms,
            errors,
        }
    }

    /// Read a source file, labelled with its path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        Ok(Self::parse(path.display().to_string(), &source))
    }
}

/// Runs a [`Walker`] per unit and pass.
#[derive(Debug, Clone)]
pub struct ClojureFrontEnd {
    default_namespace: String,
    separators: Separators,
}

impl Default for ClojureFrontEnd {
    fn default() -> Self {
        Self::from_config(&IndexerConfig::default())
    }
}

impl ClojureFrontEnd {
    pub fn new(default_namespace: impl Into<String>, separators: Separators) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            separators,
        }
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(config.default_namespace.clone(), config.separators())
    }
}

impl FrontEnd for ClojureFrontEnd {
    type Unit = ClojureUnit;
    type Binding = ();

    fn unit_name<'u>(&self, unit: &'u ClojureUnit) -> &'u str {
        &unit.name
    }

    fn index_unit(&self, unit: &ClojureUnit, infos: &mut TypeInfos<()>, emitter: &mut Emitter<'_>) {
        Walker::new(infos, emitter, &self.default_namespace, self.separators).walk(&unit.forms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(ns demo)\n(defn f [x] x)").unwrap();

        let unit = ClojureUnit::from_file(file.path()).unwrap();
        assert_eq!(unit.forms.len(), 2);
        assert!(unit.errors.is_empty());
        assert_eq!(unit.name, file.path().display().to_string());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClojureUnit::from_file(&dir.path().join("absent.clj")).unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }

    #[test]
    fn test_malformed_unit_keeps_readable_forms() {
        let unit = ClojureUnit::parse("broken.clj", "(def a 1) (defn f [x");
        assert_eq!(unit.forms.len(), 2);
        assert_eq!(unit.errors.len(), 2);
    }

    #[test]
    fn test_default_namespace_from_config() {
        let config = IndexerConfig {
            default_namespace: "scratch".to_string(),
            ..IndexerConfig::default()
        };
        let frontend = ClojureFrontEnd::from_config(&config);
        assert_eq!(frontend.default_namespace, "scratch");
    }
}
