use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use testsync_core::{ChangeType, FileState, GeneratedTestResult, TestMetadata};
use testsync_sync::{BatchResult, FileOutcome};

use crate::error::ApiError;

pub const PROCESSED_MESSAGE: &str = "Webhook processed successfully";

/// Body of every 200 answer from `POST /github-webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileSummary>,
}

/// Per-file line of a processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: String,
    pub test_path: String,
    pub state: FileState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            processed: None,
            total: None,
            files: Vec::new(),
        }
    }

    pub fn processed(batch: &BatchResult) -> Self {
        Self {
            message: PROCESSED_MESSAGE.to_owned(),
            processed: Some(batch.processed()),
            total: Some(batch.total()),
            files: batch.outcomes.iter().map(FileSummary::from).collect(),
        }
    }
}

impl From<&FileOutcome> for FileSummary {
    fn from(o: &FileOutcome) -> Self {
        Self {
            path: o.path.clone(),
            test_path: o.test_path.clone(),
            state: o.state,
            change_type: o.change_type,
            error: o.error.clone(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_owned(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /api/generate-tests`, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestsRequest {
    pub code: String,
    pub framework: String,
    pub file_path: String,
    pub test_file_path: String,
}

impl GenerateTestsRequest {
    /// Every field must be a non-empty string; the first offender wins.
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        Ok(Self {
            code: required(
                body,
                "code",
                "Missing or invalid code parameter. Code must be a non-empty string.",
            )?,
            framework: required(
                body,
                "framework",
                "Missing or invalid framework parameter. Framework must be a non-empty string.",
            )?,
            file_path: required(
                body,
                "filePath",
                "Missing or invalid filePath parameter. FilePath must be a non-empty string.",
            )?,
            test_file_path: required(
                body,
                "testFilePath",
                "Missing or invalid testFilePath parameter. TestFilePath must be a non-empty string.",
            )?,
        })
    }
}

fn required(body: &Value, key: &str, message: &'static str) -> Result<String, ApiError> {
    match body.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value.to_owned()),
        _ => Err(ApiError::BadRequest(message)),
    }
}

/// Body of a successful `POST /api/generate-tests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateTestsResponse {
    pub tests: String,
    pub comments: String,
    pub metadata: TestMetadata,
}

impl From<GeneratedTestResult> for GenerateTestsResponse {
    fn from(result: GeneratedTestResult) -> Self {
        Self {
            tests: result.tests,
            comments: result.metadata.comments.clone(),
            metadata: result.metadata,
        }
    }
}
