//! `testsync prune`: drop describe blocks for removed functions.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use testsync_sync::prune;

/// Arguments for `testsync prune`.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Test file to prune.
    pub test_file: PathBuf,

    /// Function names whose describe blocks are removed.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Rewrite the file in place instead of printing the result.
    #[arg(long)]
    pub write: bool,
}

impl PruneArgs {
    pub fn run(self) -> Result<()> {
        let path = &self.test_file;
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let result = prune(&content, &self.names);
        if !result.changed {
            eprintln!("{} no matching describe blocks", "unchanged:".dimmed());
            if !self.write {
                print!("{content}");
            }
            return Ok(());
        }

        let removed = result.removed.iter().cloned().collect::<Vec<_>>().join(", ");
        if self.write {
            let mut text = result.content;
            text.push('\n');
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {} ({removed})", "pruned:".green(), path.display());
        } else {
            println!("{}", result.content);
            eprintln!("{} {removed}", "removed:".green());
        }
        Ok(())
    }
}
