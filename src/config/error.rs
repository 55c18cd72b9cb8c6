//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::value::{CoercionError, ValueTag};

/// Errors raised while loading, projecting or reconfiguring.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be read.
    #[error("cannot open configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not a valid tree.
    #[error("configuration file parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A numeric override did not fit its key's width.
    #[error("bad configuration value for {key} from {source_name}: {error}")]
    OutOfRange {
        key: String,
        source_name: &'static str,
        error: CoercionError,
    },

    /// A key the projection depends on is absent.
    #[error("configuration key {0} is missing")]
    MissingKey(String),

    /// A key holds a different kind than the projection expects.
    #[error("configuration key {key} holds a {found}, expected {expected}")]
    WrongType {
        key: String,
        expected: ValueTag,
        found: ValueTag,
    },

    /// A value has the right kind but unusable content.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The file watcher could not be started.
    #[error("configuration watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    /// Structural errors mean no usable configuration tree was produced.
    pub fn is_structural(&self) -> bool {
        matches!(self, ConfigError::Io { .. } | ConfigError::Parse(_))
    }
}
