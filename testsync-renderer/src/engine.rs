//! Tera rendering engine: [`PromptKind`] enum and [`Renderer`].
//!
//! | Kind        | Template            | Used for                               |
//! |-------------|---------------------|----------------------------------------|
//! | System      | `system.tera`       | system message of every request        |
//! | Incremental | `incremental.tera`  | `new` / `update` generation            |
//! | Complete    | `complete.tera`     | `regenerate` (single-pass) generation  |
//!
//! A `.tera` file with the same name in the override directory replaces the
//! embedded default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use testsync_core::GenerationKind;

use crate::context::PromptContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("system.tera", include_str!("templates/system.tera")),
    ("incremental.tera", include_str!("templates/incremental.tera")),
    ("complete.tera", include_str!("templates/complete.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

/// Top-level `.tera` files of `dir`. A missing directory yields nothing.
fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// PromptKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    System,
    Incremental,
    Complete,
}

impl PromptKind {
    pub fn all() -> &'static [PromptKind] {
        &[PromptKind::System, PromptKind::Incremental, PromptKind::Complete]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            PromptKind::System => "system.tera",
            PromptKind::Incremental => "incremental.tera",
            PromptKind::Complete => "complete.tera",
        }
    }

    /// User prompt used for a generation kind.
    pub fn for_generation(kind: GenerationKind) -> Self {
        match kind {
            GenerationKind::Regenerate => PromptKind::Complete,
            GenerationKind::New | GenerationKind::Update => PromptKind::Incremental,
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera engine holding the embedded templates plus any overrides.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(TemplateEngine { tera: build_tera(user_template_dir)? })
    }

    pub fn render(&self, kind: PromptKind, ctx: &PromptContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(kind.template_name(), &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Prompt renderer. Create once with [`Renderer::new`] and share.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(user_template_dir)? })
    }

    pub fn render(&self, kind: PromptKind, ctx: &PromptContext) -> Result<String, RenderError> {
        self.engine.render(kind, ctx)
    }

    /// `(system, user)` prompt pair for one authoring request.
    pub fn render_pair(&self, ctx: &PromptContext) -> Result<(String, String), RenderError> {
        let system = self.render(PromptKind::System, ctx)?;
        let user = self.render(PromptKind::for_generation(ctx.generation), ctx)?;
        Ok((system, user))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(generation: GenerationKind) -> PromptContext {
        PromptContext::new(
            "src/math.ts",
            "src/__tests__/math.test.ts",
            "jest",
            "export function add(a: number, b: number) { return a + b; }",
            generation,
        )
    }

    #[test]
    fn every_kind_renders_with_embedded_templates() {
        let renderer = Renderer::new(None).expect("renderer");
        for kind in PromptKind::all() {
            let out = renderer
                .render(*kind, &ctx(GenerationKind::New))
                .unwrap_or_else(|e| panic!("render failed for {kind:?}: {e}"));
            assert!(out.contains("jest"), "{kind:?} should mention the framework");
            assert!(!out.contains('\r'));
        }
    }

    #[test]
    fn generation_selects_prompt() {
        assert_eq!(PromptKind::for_generation(GenerationKind::New), PromptKind::Incremental);
        assert_eq!(PromptKind::for_generation(GenerationKind::Update), PromptKind::Incremental);
        assert_eq!(PromptKind::for_generation(GenerationKind::Regenerate), PromptKind::Complete);
    }

    #[test]
    fn complete_prompt_uses_placeholders_for_missing_inputs() {
        let renderer = Renderer::new(None).expect("renderer");
        let out = renderer
            .render(PromptKind::Complete, &ctx(GenerationKind::Regenerate))
            .expect("render");
        assert!(out.contains("Not available"));
        assert!(out.contains("No existing tests"));
        assert!(out.contains("src/__tests__/math.test.ts"));
        assert!(out.contains("```typescript"));
    }

    #[test]
    fn incremental_update_includes_existing_tests() {
        let renderer = Renderer::new(None).expect("renderer");
        let mut c = ctx(GenerationKind::Update);
        c.existing_tests = Some("describe('add', () => { it('adds', () => {}); });".into());
        c.previous_code = Some("export function add(a, b) { return a + b; }".into());
        let out = renderer.render(PromptKind::Incremental, &c).expect("render");
        assert!(out.contains("Update the existing jest test file"));
        assert!(out.contains("describe('add'"));
        assert!(out.contains("## Previous code"));
        assert!(!out.contains("## Changes"));
    }

    #[test]
    fn source_code_is_not_html_escaped() {
        let renderer = Renderer::new(None).expect("renderer");
        let mut c = ctx(GenerationKind::New);
        c.current_code = "const cmp = (a, b) => a < b && b > 0;".into();
        let out = renderer.render(PromptKind::Incremental, &c).expect("render");
        assert!(out.contains("a < b && b > 0"));
    }
}
