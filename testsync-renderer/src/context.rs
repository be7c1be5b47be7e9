//! Prompt context: serializable rendering payload for one authoring request.

use serde::{Deserialize, Serialize};

use testsync_core::GenerationKind;

use crate::error::RenderError;

/// Everything a prompt template may reference.
///
/// Optional inputs render as `null`; templates fall back to placeholder text
/// when one is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    pub framework: String,
    pub source_path: String,
    pub test_path: String,
    pub current_code: String,
    pub previous_code: Option<String>,
    pub existing_tests: Option<String>,
    pub diff: Option<String>,
    pub generation: GenerationKind,
    /// Fence language for code blocks (`typescript` or `javascript`).
    pub language: String,
}

impl PromptContext {
    /// Context with only the required inputs; optional fields start empty.
    pub fn new(
        source_path: impl Into<String>,
        test_path: impl Into<String>,
        framework: impl Into<String>,
        current_code: impl Into<String>,
        generation: GenerationKind,
    ) -> Self {
        let source_path = source_path.into();
        let language = language_for(&source_path).to_owned();
        Self {
            framework: framework.into(),
            source_path,
            test_path: test_path.into(),
            current_code: current_code.into(),
            previous_code: None,
            existing_tests: None,
            diff: None,
            generation,
            language,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// Code-fence language for a source path.
pub fn language_for(path: &str) -> &'static str {
    if path.ends_with(".ts") || path.ends_with(".tsx") {
        "typescript"
    } else {
        "javascript"
    }
}
