use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use testsync_sync::AuthoringError;

/// Startup and runtime failures of the webhook service.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] testsync_core::ConfigError),

    #[error("prompt renderer error: {0}")]
    Render(#[from] testsync_renderer::RenderError),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("invalid bind address {addr}: {reason}")]
    BindAddr { addr: String, reason: String },
}

pub(crate) fn io_err(context: impl Into<String>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        context: context.into(),
        source,
    }
}

/// Request-level failures of `POST /github-webhook`.
///
/// Response bodies are generic; details go to the log only.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// - invalid signature: 401
    /// - anything else: 500
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::InvalidSignature => "Invalid signature",
            Self::InvalidPayload(_) | Self::Internal(_) => "Internal server error",
        };
        (self.status_code(), Json(json!({ "error": body }))).into_response()
    }
}

/// Failures of the direct generation API under `/api`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request validation; the message is returned as is.
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("API key is required")]
    MissingApiKey,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("API key secret not configured")]
    ApiKeyNotConfigured,

    /// The authoring service rejected our credentials.
    #[error("authoring service rejected the API key")]
    AuthorUnauthorized,

    #[error("authoring service rate limit exceeded")]
    RateLimited,

    #[error("test generation failed: {0}")]
    Generation(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingApiKey | Self::InvalidApiKey | Self::AuthorUnauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ApiKeyNotConfigured | Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthoringError> for ApiError {
    fn from(e: AuthoringError) -> Self {
        match e {
            AuthoringError::RateLimited | AuthoringError::Status { status: 429, .. } => {
                Self::RateLimited
            }
            AuthoringError::Status {
                status: 401 | 403, ..
            } => Self::AuthorUnauthorized,
            other => Self::Generation(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::BadRequest(message) => json!({ "error": message }),
            Self::MissingApiKey => json!({ "error": "Unauthorized", "message": "API key is required" }),
            Self::InvalidApiKey => json!({ "error": "Unauthorized", "message": "Invalid API key" }),
            Self::ApiKeyNotConfigured => json!({ "error": "API key secret not configured" }),
            Self::AuthorUnauthorized => json!({ "error": "Invalid OpenAI API key" }),
            Self::RateLimited => {
                json!({ "error": "OpenAI API rate limit exceeded. Please try again later." })
            }
            Self::Generation(_) => json!({ "error": "Failed to generate tests. Please try again." }),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
