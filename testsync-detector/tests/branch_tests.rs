use rstest::rstest;
use testsync_detector::{is_allowed, BranchFilter, BranchPattern};

#[rstest]
#[case("main", "*", true)]
#[case("anything/at/all", "*", true)]
#[case("main", "", true)]
#[case("main", " , ", true)]
#[case("feature/x", "feature/*", true)]
#[case("feature", "feature/*", false)]
#[case("main", "main,develop", true)]
#[case("develop", " main , develop ", true)]
#[case("release", "main,develop", false)]
#[case("main-2", "main", false)]
#[case("hotfix/1", "main, hotfix*", true)]
fn branch_patterns(#[case] branch: &str, #[case] patterns: &str, #[case] expected: bool) {
    assert_eq!(is_allowed(branch, patterns), expected, "{branch} vs {patterns}");
}

#[test]
fn wildcard_entry_allows_everything() {
    let filter = BranchFilter::parse("main, *");
    for branch in ["main", "x", "feature/y", ""] {
        assert!(filter.allows(branch));
    }
}

#[test]
fn parse_trims_and_classifies_entries() {
    let filter = BranchFilter::parse(" main ,release/* ,*");
    assert_eq!(
        filter.patterns(),
        &[
            BranchPattern::Exact("main".into()),
            BranchPattern::Prefix("release/".into()),
            BranchPattern::Any,
        ]
    );
    assert_eq!(filter.patterns()[1].to_string(), "release/*");
}

#[test]
fn default_filter_is_wildcard() {
    assert_eq!(BranchFilter::default(), BranchFilter::parse(""));
}
