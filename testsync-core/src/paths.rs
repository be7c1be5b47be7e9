//! Source path → test path mapping and source-file filtering.
//!
//! Paths are repository-relative and `/`-separated. Every function here is
//! pure.

/// Directory holding the test file next to its source.
pub const TEST_DIR: &str = "__tests__";

/// Source extensions the service generates tests for.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// `dir/name.ext` → `dir/__tests__/name.test.ext`.
///
/// A root-level file maps to `__tests__/name.test.ext`; a file without an
/// extension gets `.test` appended. Dot-files (`.eslintrc`) count as having no
/// extension.
pub fn test_file_path(source: &str) -> String {
    let (dir, file) = match source.rfind('/') {
        Some(idx) => (&source[..idx], &source[idx + 1..]),
        None => ("", source),
    };

    let file_name = match file.rfind('.') {
        Some(idx) if idx > 0 => format!("{}.test{}", &file[..idx], &file[idx..]),
        _ => format!("{file}.test"),
    };

    if dir.is_empty() {
        format!("{TEST_DIR}/{file_name}")
    } else {
        format!("{dir}/{TEST_DIR}/{file_name}")
    }
}

/// `true` for paths that are themselves tests.
pub fn is_test_file(path: &str) -> bool {
    if path.split('/').any(|segment| segment == TEST_DIR) {
        return true;
    }
    let file = path.rsplit('/').next().unwrap_or(path);
    file.contains(".test.") || file.contains(".spec.")
}

/// `true` when the path is a supported source file that is not a test.
pub fn should_process_file(path: &str) -> bool {
    if is_test_file(path) {
        return false;
    }
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(idx) if idx > 0 => SUPPORTED_EXTENSIONS.contains(&&file[idx + 1..]),
        _ => false,
    }
}
