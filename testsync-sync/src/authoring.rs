//! Test-authoring collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use testsync_core::{GeneratedTestResult, GenerationKind};

use crate::error::AuthoringError;

/// Inputs for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAuthoringRequest {
    pub current_code: String,
    pub previous_code: Option<String>,
    /// Existing test text, already pruned of removed functions.
    pub existing_tests: Option<String>,
    /// Raw diff; carried for single-pass regeneration only.
    pub diff_patch: Option<String>,
    pub source_path: String,
    pub test_path: String,
    pub framework: String,
    pub change_type: Option<GenerationKind>,
}

#[async_trait]
pub trait TestAuthor: Send + Sync {
    async fn generate(
        &self,
        request: &TestAuthoringRequest,
    ) -> Result<GeneratedTestResult, AuthoringError>;
}
