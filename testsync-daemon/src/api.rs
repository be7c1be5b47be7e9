//! Direct test generation: `POST /api/generate-tests`.
//!
//! Every route here sits behind [`require_api_key`]. The handler calls the
//! authoring collaborator once and never touches the repository.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use testsync_core::GenerationKind;
use testsync_sync::TestAuthoringRequest;

use crate::error::ApiError;
use crate::protocol::{GenerateTestsRequest, GenerateTestsResponse};
use crate::runtime::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `x-api-key` does not equal the configured key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key().filter(|k| !k.is_empty()) else {
        error!("AUTO_TEST_WEBHOOK_SECRET is not set; rejecting API request");
        return Err(ApiError::ApiKeyNotConfigured);
    };
    let Some(provided) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!(header = API_KEY_HEADER, "missing API key header");
        return Err(ApiError::MissingApiKey);
    };
    if !bool::from(provided.as_bytes().ct_eq(expected.expose().as_bytes())) {
        warn!("invalid API key");
        return Err(ApiError::InvalidApiKey);
    }
    Ok(next.run(request).await)
}

pub async fn generate_tests(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<GenerateTestsResponse>, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Request body must be a JSON object."))?;
    let input = GenerateTestsRequest::from_json(&value)?;

    let request = TestAuthoringRequest {
        current_code: input.code,
        previous_code: None,
        existing_tests: None,
        diff_patch: None,
        source_path: input.file_path,
        test_path: input.test_file_path,
        framework: input.framework,
        change_type: Some(GenerationKind::New),
    };
    let generated = tokio::time::timeout(state.call_timeout(), state.author().generate(&request))
        .await
        .map_err(|_| ApiError::Generation("timed out".into()))?
        .map_err(|e| {
            error!(error = %e, path = %request.source_path, "direct generation failed");
            ApiError::from(e)
        })?;
    if generated.tests.trim().is_empty() {
        return Err(ApiError::Generation("empty tests".into()));
    }

    info!(
        path = %request.source_path,
        total_tests = generated.metadata.coverage.total_tests,
        "generated tests on request"
    );
    Ok(Json(GenerateTestsResponse::from(generated)))
}
