//! `testsync check-branch`: evaluate the branch allow-list.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use testsync_detector::BranchFilter;

/// Arguments for `testsync check-branch`.
#[derive(Args, Debug)]
pub struct CheckBranchArgs {
    /// Branch name, without `refs/heads/`.
    pub branch: String,

    /// Comma-separated patterns (`*`, `prefix*`, exact names).
    #[arg(long, env = "ALLOWED_BRANCHES", default_value = "*")]
    pub patterns: String,
}

impl CheckBranchArgs {
    pub fn run(self) -> Result<()> {
        let filter = BranchFilter::parse(&self.patterns);
        if !filter.allows(&self.branch) {
            bail!("branch '{}' is not allowed by '{}'", self.branch, self.patterns);
        }
        println!("{} {}", "allowed:".green(), self.branch);
        Ok(())
    }
}
