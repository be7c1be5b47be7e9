//! Heuristic change classification.
//!
//! Two modes:
//! - **patch mode**: scan the `+`/`-` lines of a unified diff
//! - **content mode**: compare the base and current snapshots
//!
//! Patch mode falls back to content mode on any internal fault, and content
//! mode falls back to [`ChangeAnalysis::unknown`]. Callers always get a result.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use testsync_core::{ChangeAnalysis, ChangeType};
use thiserror::Error;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Named function declarations (generators included), `const`/`let`/`var`
/// bindings to arrow or function expressions, and `name: function` /
/// `name: (…) =>` property methods. `export`, `default` and `async` prefixes
/// are optional.
const SIGNATURE_PATTERN: &str = r"(?:export\s+)?(?:default\s+)?(?:async\s+)?(?:\bfunction(?:\s*\*\s*|\s+)([A-Za-z_$][\w$]*)|(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>|function)|([A-Za-z_$][\w$]*)\s*:\s*(?:async\s+)?(?:\([^)]*\)\s*=>|function))";

static SIGNATURE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(SIGNATURE_PATTERN));
static BLOCK_COMMENT: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/"));
static LINE_COMMENT: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"//[^\n]*"));
static WHITESPACE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\s+"));

#[derive(Debug, Error)]
enum ClassifyError {
    #[error("pattern failed to compile: {0}")]
    Pattern(String),
}

fn pattern(lazy: &'static Lazy<Result<Regex, regex::Error>>) -> Result<&'static Regex, ClassifyError> {
    Lazy::force(lazy)
        .as_ref()
        .map_err(|e| ClassifyError::Pattern(e.to_string()))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Seam for replacing the regex heuristics with a real parser.
pub trait ChangeClassifier: Send + Sync {
    fn classify(&self, patch: Option<&str>, current: &str, base: Option<&str>) -> ChangeAnalysis;
}

/// The regex-based classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl ChangeClassifier for HeuristicClassifier {
    fn classify(&self, patch: Option<&str>, current: &str, base: Option<&str>) -> ChangeAnalysis {
        classify(patch, current, base)
    }
}

/// Classify one file change. An empty patch counts as no patch.
pub fn classify(patch: Option<&str>, current: &str, base: Option<&str>) -> ChangeAnalysis {
    if let Some(patch) = patch.filter(|p| !p.trim().is_empty()) {
        match classify_patch(patch) {
            Ok(analysis) => return analysis,
            Err(e) => warn!(error = %e, "patch classification failed; comparing snapshots"),
        }
    }
    match classify_content(current, base) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "content classification failed; treating change as unknown");
            ChangeAnalysis::unknown()
        }
    }
}

/// Every function name declared in `source`, in first-seen order, deduplicated.
pub fn extract_functions(source: &str) -> Vec<String> {
    match function_set(source) {
        Ok(set) => set.into_iter().collect(),
        Err(e) => {
            warn!(error = %e, "function extraction failed");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Patch mode
// ---------------------------------------------------------------------------

fn classify_patch(patch: &str) -> Result<ChangeAnalysis, ClassifyError> {
    let signature = pattern(&SIGNATURE)?;

    let mut in_hunk = false;
    let mut has_code = false;
    let mut has_comment = false;
    let mut has_whitespace = false;
    let mut added = BTreeSet::new();
    let mut removed = BTreeSet::new();

    for line in patch.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk && (line.starts_with("+++") || line.starts_with("---")) {
            continue;
        }
        let (is_addition, content) = match line.as_bytes().first() {
            Some(b'+') => (true, &line[1..]),
            Some(b'-') => (false, &line[1..]),
            _ => continue,
        };

        let trimmed = content.trim();
        if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
            has_comment = true;
            continue;
        }
        if trimmed.is_empty() {
            has_whitespace = true;
            continue;
        }

        has_code = true;
        if let Some(name) = signature.captures(content).and_then(|c| first_name(&c)) {
            if is_addition {
                added.insert(name);
            } else {
                removed.insert(name);
            }
        }
    }

    if !has_code {
        let ty = if has_comment {
            ChangeType::CommentOnly
        } else if has_whitespace {
            ChangeType::WhitespaceOnly
        } else {
            ChangeType::NoChange
        };
        return Ok(ChangeAnalysis::cosmetic(ty, false));
    }

    let modified: BTreeSet<String> = added.intersection(&removed).cloned().collect();
    let change_type = decide(&added, &removed);
    debug!(%change_type, added = added.len(), removed = removed.len(), "classified patch");
    Ok(ChangeAnalysis::from_sets(change_type, true, added, removed, modified))
}

fn first_name(caps: &regex::Captures<'_>) -> Option<String> {
    (1..=3)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str().to_owned())
        .next()
}

/// Named-set rules shared by both modes. Structural change without any
/// named function lands on [`ChangeType::FunctionModification`].
fn decide(added: &BTreeSet<String>, removed: &BTreeSet<String>) -> ChangeType {
    match (added.is_empty(), removed.is_empty()) {
        (true, false) => ChangeType::FunctionRemoval,
        (false, true) => ChangeType::FunctionAddition,
        (false, false) => ChangeType::Mixed,
        (true, true) => ChangeType::FunctionModification,
    }
}

// ---------------------------------------------------------------------------
// Content mode
// ---------------------------------------------------------------------------

fn classify_content(current: &str, base: Option<&str>) -> Result<ChangeAnalysis, ClassifyError> {
    let Some(base) = base else {
        let added = function_set(current)?.into_iter().collect();
        return Ok(ChangeAnalysis::from_sets(
            ChangeType::NewFile,
            true,
            added,
            BTreeSet::new(),
            BTreeSet::new(),
        ));
    };

    if current == base {
        return Ok(ChangeAnalysis::cosmetic(ChangeType::NoChange, false));
    }
    if normalize(current)? == normalize(base)? {
        return Ok(ChangeAnalysis::cosmetic(ChangeType::CommentOnly, false));
    }

    let now: BTreeSet<String> = function_set(current)?.into_iter().collect();
    let before: BTreeSet<String> = function_set(base)?.into_iter().collect();
    let added: BTreeSet<String> = now.difference(&before).cloned().collect();
    let removed: BTreeSet<String> = before.difference(&now).cloned().collect();
    let modified = BTreeSet::new();

    let change_type = decide(&added, &removed);
    debug!(%change_type, added = added.len(), removed = removed.len(), "classified snapshots");
    Ok(ChangeAnalysis::from_sets(change_type, true, added, removed, modified))
}

/// Strip block and line comments, collapse whitespace.
fn normalize(source: &str) -> Result<String, ClassifyError> {
    let without_blocks = pattern(&BLOCK_COMMENT)?.replace_all(source, "");
    let without_lines = pattern(&LINE_COMMENT)?.replace_all(&without_blocks, "");
    let collapsed = pattern(&WHITESPACE)?.replace_all(&without_lines, " ");
    Ok(collapsed.trim().to_owned())
}

fn function_set(source: &str) -> Result<Vec<String>, ClassifyError> {
    let signature = pattern(&SIGNATURE)?;
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for caps in signature.captures_iter(source) {
        if let Some(name) = first_name(&caps) {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        for lazy in [&SIGNATURE, &BLOCK_COMMENT, &LINE_COMMENT, &WHITESPACE] {
            pattern(lazy).expect("pattern compiles");
        }
    }

    #[test]
    fn signature_variants_are_recognised() {
        let source = r#"
export function alpha() {}
export default async function beta() {}
function* gamma() {}
const delta = (a, b) => a + b;
let epsilon = async x => x;
var zeta = function () {};
const obj = {
  eta: function () {},
  theta: async (x) => x,
};
"#;
        let names = extract_functions(source);
        for expected in ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}: {names:?}");
        }
        assert!(!names.iter().any(|n| n == "obj"));
    }

    #[test]
    fn changed_signature_is_mixed() {
        let patch = "@@ -1,3 +1,3 @@\n-export function total(a) {\n+export function total(a, b) {\n   return a;\n";
        let analysis = classify(Some(patch), "", None);
        assert_eq!(analysis.change_type, ChangeType::Mixed);
        assert!(analysis.added_functions.contains("total"));
        assert!(analysis.removed_functions.contains("total"));
        assert!(analysis.modified_functions.contains("total"));
        assert!(analysis.has_function_modifications);
    }

    #[test]
    fn header_lines_before_first_hunk_are_ignored() {
        let patch = "--- a/src/a.ts\n+++ b/src/a.ts\n@@ -1 +1 @@\n-// old\n+// new\n";
        let analysis = classify(Some(patch), "", None);
        assert_eq!(analysis.change_type, ChangeType::CommentOnly);
        assert!(!analysis.has_code_changes);
    }

    #[test]
    fn context_only_patch_is_no_change() {
        let patch = "@@ -1,2 +1,2 @@\n const a = 1;\n const b = 2;\n";
        let analysis = classify(Some(patch), "", None);
        assert_eq!(analysis.change_type, ChangeType::NoChange);
        assert!(!analysis.has_code_changes);
    }

    #[test]
    fn normalize_strips_comments_and_whitespace() {
        let a = normalize("/* header */\nconst a = 1; // trailing\n\n").expect("normalize");
        let b = normalize("const   a = 1;").expect("normalize");
        assert_eq!(a, b);
    }
}
