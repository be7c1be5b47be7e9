//! testsync: keep unit-test files in step with source changes.
//!
//! # Usage
//!
//! ```text
//! testsync serve [--config FILE] [--log-format text|json]
//! testsync classify <source> [--patch FILE] [--base FILE] [--json]
//! testsync prune <test-file> <names>... [--write]
//! testsync test-path <source>...
//! testsync check-branch <branch> [--patterns P]
//! testsync verify <payload-file> <signature> [--secret S]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    branch::CheckBranchArgs, classify::ClassifyArgs, prune::PruneArgs, serve::ServeArgs,
    test_path::TestPathArgs, verify::VerifyArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "testsync",
    version,
    about = "Generate, update and prune unit tests from repository webhooks",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook service.
    Serve(ServeArgs),

    /// Classify a source change from a patch or two snapshots.
    Classify(ClassifyArgs),

    /// Remove describe blocks for the named functions from a test file.
    Prune(PruneArgs),

    /// Print the test file path for each source path.
    TestPath(TestPathArgs),

    /// Check a branch against allow-list patterns.
    CheckBranch(CheckBranchArgs),

    /// Verify a webhook payload signature.
    Verify(VerifyArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Classify(args) => args.run(),
        Commands::Prune(args) => args.run(),
        Commands::TestPath(args) => args.run(),
        Commands::CheckBranch(args) => args.run(),
        Commands::Verify(args) => args.run(),
    }
}
