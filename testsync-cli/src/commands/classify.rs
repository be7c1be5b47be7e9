//! `testsync classify`: run the change classifier on local files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use testsync_core::ChangeAnalysis;
use testsync_detector::classify;

/// Arguments for `testsync classify`.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Current source file.
    pub source: PathBuf,

    /// Unified diff of the change.
    #[arg(long)]
    pub patch: Option<PathBuf>,

    /// Previous version of the source; omit for a new file.
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ClassifyArgs {
    pub fn run(self) -> Result<()> {
        let current = read(&self.source)?;
        let patch = self.patch.as_deref().map(read).transpose()?;
        let base = self.base.as_deref().map(read).transpose()?;

        let analysis = classify(patch.as_deref(), &current, base.as_deref());
        if self.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(());
        }
        print_analysis(&analysis);
        Ok(())
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_analysis(analysis: &ChangeAnalysis) {
    println!("{} {}", "change type:".bold(), analysis.change_type.to_string().cyan());
    print_set("added", &analysis.added_functions);
    print_set("removed", &analysis.removed_functions);
    print_set("modified", &analysis.modified_functions);
}

fn print_set(label: &str, names: &BTreeSet<String>) {
    if names.is_empty() {
        return;
    }
    let joined = names.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    println!("  {label:<9}{joined}");
}
