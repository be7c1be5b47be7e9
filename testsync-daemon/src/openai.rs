//! Chat-completions implementation of [`TestAuthor`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use testsync_core::{GeneratedTestResult, GenerationKind, Secret, TestMetadata};
use testsync_renderer::{PromptContext, Renderer};
use testsync_sync::{AuthoringError, TestAuthor, TestAuthoringRequest};

use crate::error::DaemonError;

const MAX_TOKENS: u32 = 3000;
const TEMPERATURE: f64 = 0.3;
const SCHEMA_NAME: &str = "test_generation";

pub struct OpenAiAuthor {
    http: Client,
    endpoint: Url,
    model: String,
    renderer: Arc<Renderer>,
}

impl OpenAiAuthor {
    pub fn new(
        base_url: &str,
        api_key: &Secret,
        model: impl Into<String>,
        renderer: Arc<Renderer>,
        call_timeout: Duration,
    ) -> Result<Self, DaemonError> {
        let endpoint = Url::parse(&format!("{}/chat/completions", base_url.trim_end_matches('/')))
            .map_err(|e| DaemonError::Client(format!("invalid OpenAI base URL {base_url}: {e}")))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
            .map_err(|_| DaemonError::Client("OpenAI API key is not a valid header value".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(call_timeout)
            .build()
            .map_err(|e| DaemonError::Client(e.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            model: model.into(),
            renderer,
        })
    }

    fn prompts(&self, request: &TestAuthoringRequest) -> Result<(String, String), AuthoringError> {
        let generation = request.change_type.unwrap_or(if request.existing_tests.is_some() {
            GenerationKind::Update
        } else {
            GenerationKind::New
        });
        let mut ctx = PromptContext::new(
            request.source_path.as_str(),
            request.test_path.as_str(),
            request.framework.as_str(),
            request.current_code.as_str(),
            generation,
        );
        ctx.previous_code = request.previous_code.clone();
        ctx.existing_tests = request.existing_tests.clone();
        ctx.diff = request.diff_patch.clone();
        self.renderer
            .render_pair(&ctx)
            .map_err(|e| AuthoringError::Render(e.to_string()))
    }
}

#[async_trait]
impl TestAuthor for OpenAiAuthor {
    async fn generate(
        &self,
        request: &TestAuthoringRequest,
    ) -> Result<GeneratedTestResult, AuthoringError> {
        let (system, user) = self.prompts(request)?;
        let body = request_body(&self.model, &system, &user);
        debug!(path = %request.source_path, model = %self.model, "requesting tests");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthoringError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AuthoringError::RateLimited);
        }
        if status.is_server_error() {
            return Err(AuthoringError::Unavailable(format!("status {status}")));
        }
        if !status.is_success() {
            let message: String = resp.text().await.unwrap_or_default().chars().take(200).collect();
            return Err(AuthoringError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let completion: Value = resp
            .json()
            .await
            .map_err(|e| AuthoringError::InvalidResponse(e.to_string()))?;
        parse_completion(&completion)
    }
}

/// Chat-completions body with a strict JSON-schema response format.
fn request_body(model: &str, system: &str, user: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": response_schema()
            }
        },
        "max_tokens": MAX_TOKENS,
        "temperature": TEMPERATURE
    })
}

fn response_schema() -> Value {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "tests", "comments", "framework", "coverage", "assumptions",
            "recommendations", "estimatedComplexity", "testQuality",
            "timeToWrite", "dependencies"
        ],
        "properties": {
            "tests": { "type": "string" },
            "comments": { "type": "string" },
            "framework": { "type": "string" },
            "coverage": {
                "type": "object",
                "additionalProperties": false,
                "required": ["normalCases", "edgeCases", "errorCases", "totalTests"],
                "properties": {
                    "normalCases": { "type": "integer" },
                    "edgeCases": { "type": "integer" },
                    "errorCases": { "type": "integer" },
                    "totalTests": { "type": "integer" }
                }
            },
            "assumptions": strings,
            "recommendations": strings,
            "estimatedComplexity": { "type": "string", "enum": ["low", "medium", "high"] },
            "testQuality": { "type": "string", "enum": ["basic", "good", "excellent"] },
            "timeToWrite": { "type": "string" },
            "dependencies": strings
        }
    })
}

/// First choice → tests plus metadata. A refusal or a missing `tests`
/// field is an invalid response.
fn parse_completion(completion: &Value) -> Result<GeneratedTestResult, AuthoringError> {
    let message = completion
        .pointer("/choices/0/message")
        .ok_or(AuthoringError::EmptyResponse)?;
    if let Some(refusal) = message.get("refusal").and_then(Value::as_str) {
        return Err(AuthoringError::InvalidResponse(format!("refused: {refusal}")));
    }
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or(AuthoringError::EmptyResponse)?;

    let parsed: Value = serde_json::from_str(content)
        .map_err(|e| AuthoringError::InvalidResponse(e.to_string()))?;
    let tests = parsed
        .get("tests")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthoringError::InvalidResponse("missing `tests` field".into()))?
        .to_owned();
    let metadata: TestMetadata = serde_json::from_value(parsed)
        .map_err(|e| AuthoringError::InvalidResponse(e.to_string()))?;
    Ok(GeneratedTestResult { tests, metadata })
}
