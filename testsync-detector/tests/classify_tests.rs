//! Classification scenarios for `testsync-detector`.

use rstest::rstest;
use testsync_core::ChangeType;
use testsync_detector::{classify, ChangeClassifier, HeuristicClassifier};

// ---------------------------------------------------------------------------
// Patch mode
// ---------------------------------------------------------------------------

#[test]
fn comment_only_patch() {
    let patch = "@@ -1,3 +1,3 @@\n-// old comment\n+// new comment\n const x = 1;\n";
    let a = classify(Some(patch), "const x = 1;", Some("const x = 1;"));
    assert_eq!(a.change_type, ChangeType::CommentOnly);
    assert!(!a.has_code_changes);
    assert!(a.added_functions.is_empty());
    assert!(a.removed_functions.is_empty());
}

#[test]
fn whitespace_only_patch() {
    let patch = "@@ -1,3 +1,4 @@\n const x = 1;\n+\n+   \n const y = 2;\n";
    let a = classify(Some(patch), "", None);
    assert_eq!(a.change_type, ChangeType::WhitespaceOnly);
    assert!(!a.has_code_changes);
}

#[test]
fn comment_wins_over_whitespace() {
    let patch = "@@ -1 +1,2 @@\n+\n+/* block */\n";
    let a = classify(Some(patch), "", None);
    assert_eq!(a.change_type, ChangeType::CommentOnly);
}

#[test]
fn function_removal_patch() {
    let patch = "@@ -1,4 +1,1 @@\n export function keep() {}\n-export function foo() {\n-  return 1;\n-}\n";
    let a = classify(Some(patch), "export function keep() {}", None);
    assert_eq!(a.change_type, ChangeType::FunctionRemoval);
    assert!(a.has_code_changes);
    assert!(a.has_function_removals);
    assert!(a.removed_functions.contains("foo"));
    assert!(!a.has_function_additions);
}

#[test]
fn function_addition_patch() {
    let patch = "@@ -1 +1,3 @@\n+export const bar = (x) => x * 2;\n+\n";
    let a = classify(Some(patch), "", None);
    assert_eq!(a.change_type, ChangeType::FunctionAddition);
    assert!(a.added_functions.contains("bar"));
    assert!(a.has_function_additions);
}

#[test]
fn mixed_patch() {
    let patch = "@@ -1,3 +1,3 @@\n-function oldName() {\n+function newName() {\n   return 1;\n";
    let a = classify(Some(patch), "", None);
    assert_eq!(a.change_type, ChangeType::Mixed);
    assert!(a.removed_functions.contains("oldName"));
    assert!(a.added_functions.contains("newName"));
}

#[test]
fn body_change_is_modification() {
    let patch = "@@ -1,3 +1,3 @@\n function calc() {\n-  return 1;\n+  return 2;\n }\n";
    let a = classify(Some(patch), "", None);
    assert_eq!(a.change_type, ChangeType::FunctionModification);
    assert!(a.has_function_modifications);
    assert!(a.added_functions.is_empty() && a.removed_functions.is_empty());
}

#[test]
fn unrecognised_declaration_degrades_to_modification() {
    let patch = "@@ -1 +1 @@\n-class Widget {}\n+class Gadget {}\n";
    let a = classify(Some(patch), "", None);
    assert_eq!(a.change_type, ChangeType::FunctionModification);
}

// ---------------------------------------------------------------------------
// Content mode
// ---------------------------------------------------------------------------

#[test]
fn missing_base_is_new_file() {
    let a = classify(None, "export function a() {}\nconst b = () => 1;", None);
    assert_eq!(a.change_type, ChangeType::NewFile);
    assert!(a.has_code_changes);
    assert!(a.added_functions.contains("a"));
    assert!(a.added_functions.contains("b"));
}

#[test]
fn identical_content_is_no_change() {
    let src = "export function a() {}";
    let a = classify(None, src, Some(src));
    assert_eq!(a.change_type, ChangeType::NoChange);
    assert!(!a.has_code_changes);
}

#[test]
fn empty_patch_falls_back_to_content() {
    let src = "export function a() {}";
    let a = classify(Some(""), src, Some(src));
    assert_eq!(a.change_type, ChangeType::NoChange);
}

#[test]
fn comment_edits_in_content_mode() {
    let base = "// v1\nexport function a() {\n  return 1;\n}\n";
    let current = "/* v2 */\nexport function a() {\n    return 1;\n}\n";
    let a = classify(None, current, Some(base));
    assert_eq!(a.change_type, ChangeType::CommentOnly);
    assert!(!a.has_code_changes);
}

#[rstest]
#[case(
    "function a() {}\nfunction b() {}",
    "function a() {}",
    ChangeType::FunctionRemoval
)]
#[case(
    "function a() {}",
    "function a() {}\nfunction b() {}",
    ChangeType::FunctionAddition
)]
#[case("function a() {}", "function b() {}", ChangeType::Mixed)]
#[case(
    "function a() { return 1; }",
    "function a() { return 2; }",
    ChangeType::FunctionModification
)]
fn content_mode_compares_function_sets(
    #[case] base: &str,
    #[case] current: &str,
    #[case] expected: ChangeType,
) {
    let a = classify(None, current, Some(base));
    assert_eq!(a.change_type, expected);
    assert!(a.has_code_changes);
}

// ---------------------------------------------------------------------------
// Totality
// ---------------------------------------------------------------------------

#[rstest]
#[case("")]
#[case("@@")]
#[case("+++\n---\n+++")]
#[case("\u{0}\u{1}garbage\n+\u{fffd}")]
#[case("-\n-\n-\n")]
#[case("@@ -1 +1 @@\n+const é = () => 1;\n")]
fn classification_never_panics(#[case] patch: &str) {
    let a = classify(Some(patch), "const x = 1;", Some("const y = 2;"));
    assert!(ChangeType::all().contains(&a.change_type));
    assert_eq!(a.has_function_removals, !a.removed_functions.is_empty());
    assert_eq!(a.has_function_additions, !a.added_functions.is_empty());
}

#[test]
fn classifier_trait_delegates() {
    let classifier: &dyn ChangeClassifier = &HeuristicClassifier;
    let a = classifier.classify(None, "function a() {}", None);
    assert_eq!(a.change_type, ChangeType::NewFile);
}
