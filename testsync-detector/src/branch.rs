//! Branch allow-list.
//!
//! Configuration is a comma-separated list. Each trimmed entry is one of:
//!
//! | entry      | meaning                          |
//! |------------|----------------------------------|
//! | `*`        | every branch                     |
//! | `prefix*`  | branches starting with `prefix`  |
//! | `name`     | exactly `name`                   |
//!
//! An empty list allows every branch.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchPattern {
    Any,
    Prefix(String),
    Exact(String),
}

impl BranchPattern {
    fn parse(entry: &str) -> Self {
        if entry == "*" {
            BranchPattern::Any
        } else if let Some(prefix) = entry.strip_suffix('*') {
            BranchPattern::Prefix(prefix.to_owned())
        } else {
            BranchPattern::Exact(entry.to_owned())
        }
    }

    pub fn matches(&self, branch: &str) -> bool {
        match self {
            BranchPattern::Any => true,
            BranchPattern::Prefix(prefix) => branch.starts_with(prefix.as_str()),
            BranchPattern::Exact(name) => branch == name,
        }
    }
}

impl fmt::Display for BranchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchPattern::Any => write!(f, "*"),
            BranchPattern::Prefix(prefix) => write!(f, "{prefix}*"),
            BranchPattern::Exact(name) => f.write_str(name),
        }
    }
}

/// Parsed allow-list; build once from settings and reuse per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFilter {
    patterns: Vec<BranchPattern>,
}

impl BranchFilter {
    pub fn parse(config: &str) -> Self {
        let mut patterns: Vec<BranchPattern> = config
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(BranchPattern::parse)
            .collect();
        if patterns.is_empty() {
            patterns.push(BranchPattern::Any);
        }
        Self { patterns }
    }

    pub fn allows(&self, branch: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(branch))
    }

    pub fn patterns(&self) -> &[BranchPattern] {
        &self.patterns
    }
}

impl Default for BranchFilter {
    fn default() -> Self {
        Self {
            patterns: vec![BranchPattern::Any],
        }
    }
}

/// One-shot form of [`BranchFilter::allows`].
pub fn is_allowed(branch: &str, patterns: &str) -> bool {
    BranchFilter::parse(patterns).allows(branch)
}
