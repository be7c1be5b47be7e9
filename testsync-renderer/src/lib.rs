//! # testsync-renderer
//!
//! Tera-based prompt renderer for the test-authoring collaborator.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use testsync_renderer::{PromptContext, PromptKind, Renderer};
//!
//! fn system_prompt(ctx: &PromptContext) -> Option<String> {
//!     let renderer = Renderer::new(None).ok()?;
//!     renderer.render(PromptKind::System, ctx).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::PromptContext;
pub use engine::{PromptKind, Renderer, TemplateEngine};
pub use error::RenderError;
