//! Indexing errors.
//!
//! Resolution never fails: misses degrade to fewer records. The errors here
//! come from the edges of a run, i.e. reading configuration and inputs and
//! writing records out.

use std::path::PathBuf;

use thiserror::Error;

use crate::sink::SinkError;

/// Indexing result type alias.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors surfaced by an indexing run.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An input or configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration or event file is not valid JSON for its schema.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The record sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        IndexError::Json {
            path: path.into(),
            source,
        }
    }
}
