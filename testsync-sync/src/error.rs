//! Error types for testsync-sync.

use thiserror::Error;

/// Failures reported by a [`crate::HostingService`] implementation.
#[derive(Debug, Error)]
pub enum HostingError {
    /// The presented revision marker is stale, or a create raced another write.
    #[error("revision conflict writing {path}")]
    Conflict { path: String },

    #[error("hosting service rate limit exceeded (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Transport failure or server-side error after retries.
    #[error("hosting service unavailable: {0}")]
    Unavailable(String),

    /// Any other non-success status.
    #[error("hosting service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to decode hosting response: {0}")]
    Decode(String),
}

/// Failures reported by a [`crate::TestAuthor`] implementation.
#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("test authoring service unavailable: {0}")]
    Unavailable(String),

    #[error("test authoring service rate limit exceeded")]
    RateLimited,

    #[error("test authoring service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response did not match the structured output schema.
    #[error("invalid test authoring response: {0}")]
    InvalidResponse(String),

    #[error("test authoring service returned no tests")]
    EmptyResponse,

    #[error("failed to render prompt: {0}")]
    Render(String),
}

/// All errors that can arise while processing one file or one event.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("hosting error: {0}")]
    Hosting(#[from] HostingError),

    #[error("authoring error: {0}")]
    Authoring(#[from] AuthoringError),

    /// The current source content could not be obtained.
    #[error("no current content for {path}")]
    MissingContent { path: String },

    /// The revision conflict persisted after one re-read and retry.
    #[error("write conflict on {path} persisted after retry")]
    WriteConflict { path: String },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}
