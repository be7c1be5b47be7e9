//! `testsync verify`: check a saved payload against its signature header.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use testsync_core::Secret;
use testsync_daemon::SignatureVerifier;

/// Arguments for `testsync verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Raw request body as delivered.
    pub payload: PathBuf,

    /// `X-Hub-Signature-256` header value (`sha256=<hex>`).
    pub signature: String,

    /// Webhook secret.
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

impl VerifyArgs {
    pub fn run(self) -> Result<()> {
        let Some(secret) = self.secret.filter(|s| !s.is_empty()) else {
            bail!("no webhook secret given; pass --secret or set GITHUB_WEBHOOK_SECRET");
        };
        let payload = fs::read(&self.payload)
            .with_context(|| format!("failed to read {}", self.payload.display()))?;

        let verifier = SignatureVerifier::new(Some(Secret::new(secret)));
        if !verifier.verify(&payload, Some(&self.signature)) {
            bail!("signature does not match {}", self.payload.display());
        }
        println!("{}", "signature valid".green());
        Ok(())
    }
}
