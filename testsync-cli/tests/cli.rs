use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn testsync() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("testsync"));
    cmd.env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("ALLOWED_BRANCHES")
        .env_remove("GITHUB_WEBHOOK_SECRET")
        .env_remove("TESTSYNC_CONFIG");
    cmd
}

#[test]
fn test_path_maps_sources() {
    testsync()
        .args(["test-path", "src/utils/math.ts", "index.js", "README.md"])
        .assert()
        .success()
        .stdout(contains("src/utils/math.ts -> src/utils/__tests__/math.test.ts"))
        .stdout(contains("index.js -> __tests__/index.test.js"))
        .stdout(contains("README.md -> __tests__/README.test.md (not processed)"));
}

#[test]
fn classify_patch_reports_removals_as_json() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("math.ts");
    let patch = dir.path().join("change.diff");
    fs::write(&source, "export function add(a, b) { return a + b; }\n").expect("write source");
    fs::write(
        &patch,
        "@@ -1,2 +1,1 @@\n export function add(a, b) { return a + b; }\n-export function sub(a, b) { return a - b; }\n",
    )
    .expect("write patch");

    let assert = testsync()
        .arg("classify")
        .arg(&source)
        .arg("--patch")
        .arg(&patch)
        .arg("--json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(value["change_type"], "function-removal");
    assert_eq!(value["removed_functions"][0], "sub");
}

#[test]
fn classify_without_base_is_a_new_file() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("new.ts");
    fs::write(&source, "export const make = () => 1;\n").expect("write source");

    testsync()
        .arg("classify")
        .arg(&source)
        .assert()
        .success()
        .stdout(contains("new-file"))
        .stdout(contains("make"));
}

#[test]
fn prune_write_rewrites_the_file() {
    let dir = TempDir::new().expect("tempdir");
    let tests = dir.path().join("math.test.ts");
    fs::write(
        &tests,
        "describe('add', () => {\n  it('adds', () => {});\n});\n\ndescribe('sub', () => {\n  it('subs', () => {});\n});\n",
    )
    .expect("write tests");

    testsync()
        .arg("prune")
        .arg(&tests)
        .arg("sub")
        .arg("--write")
        .assert()
        .success()
        .stderr(contains("pruned:"));

    let after = fs::read_to_string(&tests).expect("read back");
    assert!(after.contains("describe('add'"));
    assert!(!after.contains("describe('sub'"));
    assert!(after.ends_with("});\n"));
}

#[test]
fn prune_without_match_leaves_content() {
    let dir = TempDir::new().expect("tempdir");
    let tests = dir.path().join("a.test.ts");
    fs::write(&tests, "describe('add', () => {});\n").expect("write tests");

    testsync()
        .arg("prune")
        .arg(&tests)
        .arg("mul")
        .assert()
        .success()
        .stdout(contains("describe('add'"))
        .stderr(contains("unchanged"));
}

#[test]
fn check_branch_allows_and_denies() {
    testsync()
        .args(["check-branch", "feature/x", "--patterns", "main, feature/*"])
        .assert()
        .success()
        .stdout(contains("allowed"));

    testsync()
        .args(["check-branch", "hotfix/y", "--patterns", "main, feature/*"])
        .assert()
        .failure()
        .stderr(contains("not allowed"));
}

#[test]
fn verify_accepts_matching_signature_only() {
    let dir = TempDir::new().expect("tempdir");
    let payload = dir.path().join("payload.json");
    fs::write(&payload, "Hello, World!").expect("write payload");
    let good = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

    testsync()
        .arg("verify")
        .arg(&payload)
        .arg(good)
        .args(["--secret", "It's a Secret to Everybody"])
        .assert()
        .success()
        .stdout(contains("signature valid"));

    testsync()
        .arg("verify")
        .arg(&payload)
        .arg(good)
        .args(["--secret", "wrong"])
        .assert()
        .failure()
        .stderr(contains("does not match"));
}

#[test]
fn verify_requires_a_secret() {
    let dir = TempDir::new().expect("tempdir");
    let payload = dir.path().join("payload.json");
    fs::write(&payload, "{}").expect("write payload");

    testsync()
        .arg("verify")
        .arg(&payload)
        .arg("sha256=00")
        .assert()
        .failure()
        .stderr(contains("no webhook secret").and(contains("GITHUB_WEBHOOK_SECRET")));
}
