//! Error types for testsync-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from prompt rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("prompt template error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A template under the override directory could not be read.
    #[error("failed to read prompt template {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
