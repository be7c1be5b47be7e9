//! Webhook service: HTTP surface (webhook, direct generation API, health),
//! signature checks, and the GitHub / OpenAI collaborators behind the sync
//! orchestrator.

pub mod api;
mod error;
pub mod github;
pub mod openai;
pub mod payload;
pub mod protocol;
mod runtime;
pub mod signature;

pub use api::API_KEY_HEADER;
pub use error::{ApiError, DaemonError, WebhookError};
pub use github::GithubClient;
pub use openai::OpenAiAuthor;
pub use payload::{parse_event, Inbound};
pub use protocol::{
    FileSummary, GenerateTestsRequest, GenerateTestsResponse, HealthResponse, WebhookResponse,
};
pub use runtime::{
    init_tracing, router, serve, start_blocking, AppState, EVENT_HEADER, SIGNATURE_HEADER,
};
pub use signature::{sign, SignatureVerifier};
