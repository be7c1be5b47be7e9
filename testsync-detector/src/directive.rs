//! Trigger-text scanning: the operator skip directive and the bot marker.

use testsync_core::SkipDecision;

/// Default operator directive that suppresses test generation.
pub const DEFAULT_SKIP_DIRECTIVE: &str = "@iterate skip";

/// Scan `text` for [`DEFAULT_SKIP_DIRECTIVE`].
pub fn parse(text: &str) -> SkipDecision {
    parse_with(text, DEFAULT_SKIP_DIRECTIVE)
}

/// Scan `text` for `directive` (case-sensitive substring).
///
/// Cleanup of tests for removed functions is requested either way. An empty
/// directive never matches.
pub fn parse_with(text: &str, directive: &str) -> SkipDecision {
    if !directive.is_empty() && text.contains(directive) {
        SkipDecision {
            should_skip: true,
            cleanup_removed_functions: true,
            reason: format!(
                "skipping test generation due to '{directive}'; tests for removed functions are still cleaned up"
            ),
        }
    } else {
        SkipDecision {
            should_skip: false,
            cleanup_removed_functions: true,
            reason: "no skip directive; proceeding with test operations".to_owned(),
        }
    }
}

/// `true` when `text` carries the bot marker, i.e. the event was produced by
/// one of our own commits. An empty marker never matches.
pub fn is_own_commit(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.contains(marker)
}
