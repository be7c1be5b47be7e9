//! Unified diff synthesis for single-pass regeneration and dry-run logging.

use similar::TextDiff;

/// Unified diff of `path` from `base` to `current` with `a/` / `b/` headers.
///
/// A missing base diffs against the empty text. Returns an empty string when
/// the two sides are equal after line-ending normalisation.
pub fn synthesize_patch(path: &str, base: Option<&str>, current: &str) -> String {
    let old = normalize_line_endings(base.unwrap_or(""));
    let new = normalize_line_endings(current);
    if old == new {
        return String::new();
    }
    let old_header = format!("a/{path}");
    let new_header = format!("b/{path}");
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

pub(crate) fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
