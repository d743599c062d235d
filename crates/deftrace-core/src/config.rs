//! Indexer configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file:
//!
//! ```json
//! {
//!   "path_separator": ".",
//!   "namespace_separator": "/",
//!   "default_namespace": "user",
//!   "unit": "src/core.clj",
//!   "parallel": true
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::path::Separators;

/// Settings for one indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Separator between local path segments
    pub path_separator: char,
    /// Separator between a namespace and its local path
    pub namespace_separator: char,
    /// Namespace in effect until a unit switches it
    pub default_namespace: String,
    /// Label stamped into every def-key; `None` leaves keys unit-less
    pub unit: Option<String>,
    /// Resolve references of separate units in parallel
    pub parallel: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        let separators = Separators::default();
        Self {
            path_separator: separators.path,
            namespace_separator: separators.namespace,
            default_namespace: "user".to_string(),
            unit: None,
            parallel: false,
        }
    }
}

impl IndexerConfig {
    pub fn separators(&self) -> Separators {
        Separators {
            path: self.path_separator,
            namespace: self.namespace_separator,
        }
    }

    /// Load a configuration file, validating the separators.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        let config: IndexerConfig =
            serde_json::from_str(&text).map_err(|e| IndexError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject separator choices that would make paths ambiguous.
    pub fn validate(&self) -> Result<()> {
        if self.path_separator == self.namespace_separator {
            return Err(IndexError::Config(format!(
                "path and namespace separators must differ (both '{}')",
                self.path_separator
            )));
        }
        for sep in [self.path_separator, self.namespace_separator] {
            if sep.is_alphanumeric() || matches!(sep, '(' | ')' | ',' | '_') {
                return Err(IndexError::Config(format!(
                    "'{}' cannot be used as a separator",
                    sep
                )));
            }
        }
        Ok(())
    }
}
