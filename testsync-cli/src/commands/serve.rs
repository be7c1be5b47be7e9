//! `testsync serve`: run the webhook service in the foreground.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;

use testsync_core::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'; expected: text, json")),
        }
    }
}

/// Arguments for `testsync serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// YAML settings file; environment variables override it.
    #[arg(long, env = "TESTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref()).context("failed to load settings")?;
        testsync_daemon::start_blocking(settings, self.log_format == LogFormat::Json)
            .context("webhook service failed")
    }
}
