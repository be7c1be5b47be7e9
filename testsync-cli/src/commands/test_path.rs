//! `testsync test-path`: show where tests for a source file live.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use testsync_core::paths::{should_process_file, test_file_path};

/// Arguments for `testsync test-path`.
#[derive(Args, Debug)]
pub struct TestPathArgs {
    /// Repository-relative source paths.
    #[arg(required = true)]
    pub sources: Vec<String>,
}

impl TestPathArgs {
    pub fn run(self) -> Result<()> {
        for source in &self.sources {
            let test = test_file_path(source);
            if should_process_file(source) {
                println!("{source} -> {test}");
            } else {
                println!("{source} -> {test} {}", "(not processed)".dimmed());
            }
        }
        Ok(())
    }
}
