//! Error types for testsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while assembling [`crate::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An environment override carried a value of the wrong shape.
    #[error("invalid value '{value}' for {key}; expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A credential required by the requested operation is not configured.
    #[error("{key} is not set")]
    Missing { key: &'static str },
}
