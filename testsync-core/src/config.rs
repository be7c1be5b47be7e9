//! Service configuration.
//!
//! # Layering
//!
//! ```text
//! Settings::default()
//!   ← YAML file   (--config / TESTSYNC_CONFIG, optional)
//!   ← environment (GITHUB_WEBHOOK_SECRET, ALLOWED_BRANCHES, …)
//! ```
//!
//! # API pattern
//!
//! - `Settings::from_sources(file, env)` takes an explicit environment lookup;
//!   used in tests with a `HashMap`
//! - `Settings::load(file)` reads the process environment and delegates
//!
//! Tests must NEVER call `load`; always use `from_sources`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{FileState, GenerationKind};

pub const DEFAULT_BOT_MARKER: &str = "auto-tests-bot";
pub const DEFAULT_SKIP_DIRECTIVE: &str = "@iterate skip";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A credential that never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How generated tests relate to the existing test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestAuthoringStrategy {
    /// Ask for additions/removals against the existing tests.
    #[default]
    Incremental,
    /// Hand over the raw diff and rebuild the whole test file.
    SinglePass,
}

impl TestAuthoringStrategy {
    pub fn generation_kind(&self, had_tests: bool) -> GenerationKind {
        match (self, had_tests) {
            (TestAuthoringStrategy::SinglePass, _) => GenerationKind::Regenerate,
            (TestAuthoringStrategy::Incremental, false) => GenerationKind::New,
            (TestAuthoringStrategy::Incremental, true) => GenerationKind::Update,
        }
    }

    /// State a file ends in after a successful generation.
    pub fn completed_state(&self, had_tests: bool) -> FileState {
        match self.generation_kind(had_tests) {
            GenerationKind::New => FileState::GeneratedNew,
            GenerationKind::Update => FileState::Updated,
            GenerationKind::Regenerate => FileState::RegeneratedComplete,
        }
    }
}

impl FromStr for TestAuthoringStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(TestAuthoringStrategy::Incremental),
            "single-pass" | "single_pass" | "singlepass" => Ok(TestAuthoringStrategy::SinglePass),
            other => Err(ConfigError::InvalidValue {
                key: "TEST_STRATEGY",
                value: other.to_owned(),
                expected: "incremental | single-pass",
            }),
        }
    }
}

impl fmt::Display for TestAuthoringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestAuthoringStrategy::Incremental => write!(f, "incremental"),
            TestAuthoringStrategy::SinglePass => write!(f, "single-pass"),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Every tunable of the service. Constructed once at startup and passed by
/// value to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Absent ⇒ signatures are not checked.
    pub webhook_secret: Option<Secret>,
    /// `x-api-key` value required by the direct generation API; absent ⇒ that
    /// API answers 500.
    pub api_key: Option<Secret>,
    /// Comma-separated branch patterns (`*`, `prefix*`, exact).
    pub allowed_branches: String,
    pub bot_marker: String,
    pub skip_directive: String,
    pub cleanup_enabled: bool,
    pub strategy: TestAuthoringStrategy,
    pub framework: String,
    pub github_token: Option<Secret>,
    pub github_api_base: String,
    pub openai_api_key: Option<Secret>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub bind_addr: String,
    pub call_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub prompt_template_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            api_key: None,
            allowed_branches: "*".to_owned(),
            bot_marker: DEFAULT_BOT_MARKER.to_owned(),
            skip_directive: DEFAULT_SKIP_DIRECTIVE.to_owned(),
            cleanup_enabled: true,
            strategy: TestAuthoringStrategy::Incremental,
            framework: "jest".to_owned(),
            github_token: None,
            github_api_base: "https://api.github.com".to_owned(),
            openai_api_key: None,
            openai_model: "gpt-4o".to_owned(),
            openai_base_url: "https://api.openai.com/v1".to_owned(),
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            call_timeout_secs: 60,
            batch_timeout_secs: 300,
            prompt_template_dir: None,
            dry_run: false,
        }
    }
}

impl Settings {
    /// Defaults, then the YAML file (if any), then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Same as [`Settings::load`] with an explicit environment lookup.
    pub fn from_sources<F>(file: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(env)?;
        Ok(settings)
    }

    /// Parse a YAML settings file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values are treated as unset.
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GITHUB_WEBHOOK_SECRET") {
            self.webhook_secret = Some(Secret::new(v));
        }
        if let Some(v) = get("AUTO_TEST_WEBHOOK_SECRET") {
            self.api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("ALLOWED_BRANCHES") {
            self.allowed_branches = v;
        }
        if let Some(v) = get("BOT_SIGNATURE") {
            self.bot_marker = v;
        }
        if let Some(v) = get("SKIP_DIRECTIVE") {
            self.skip_directive = v;
        }
        if let Some(v) = get("CLEANUP_REMOVED_TESTS") {
            self.cleanup_enabled = parse_bool("CLEANUP_REMOVED_TESTS", &v)?;
        }
        if let Some(v) = get("TEST_STRATEGY") {
            self.strategy = v.parse()?;
        }
        if let Some(v) = get("TEST_FRAMEWORK") {
            self.framework = v;
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.github_token = Some(Secret::new(v));
        }
        if let Some(v) = get("GITHUB_API_URL") {
            self.github_api_base = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai_model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai_base_url = v;
        }
        if let Some(v) = get("PORT") {
            let port: u16 = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: v.clone(),
                expected: "a TCP port number",
            })?;
            self.bind_addr = format!("0.0.0.0:{port}");
        }
        // BIND_ADDR wins over PORT when both are set.
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("CALL_TIMEOUT_SECS") {
            self.call_timeout_secs = parse_secs("CALL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("BATCH_TIMEOUT_SECS") {
            self.batch_timeout_secs = parse_secs("BATCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PROMPT_TEMPLATE_DIR") {
            self.prompt_template_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("DRY_RUN") {
            self.dry_run = parse_bool("DRY_RUN", &v)?;
        }
        Ok(())
    }

    /// Fails when a credential needed to talk to the collaborators is absent.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.github_token.as_ref().map_or(true, Secret::is_empty) {
            return Err(ConfigError::Missing { key: "GITHUB_TOKEN" });
        }
        if self.openai_api_key.as_ref().map_or(true, Secret::is_empty) {
            return Err(ConfigError::Missing {
                key: "OPENAI_API_KEY",
            });
        }
        Ok(())
    }

    /// `true` when no webhook secret is configured and every payload is accepted.
    pub fn permissive_signatures(&self) -> bool {
        self.webhook_secret.as_ref().map_or(true, Secret::is_empty)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
            expected: "true | false",
        }),
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
            expected: "a positive number of seconds",
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let settings = Settings::from_sources(None, env_of(&[])).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.allowed_branches, "*");
        assert_eq!(settings.bot_marker, "auto-tests-bot");
        assert_eq!(settings.skip_directive, "@iterate skip");
        assert!(settings.cleanup_enabled);
        assert_eq!(settings.strategy, TestAuthoringStrategy::Incremental);
        assert!(settings.permissive_signatures());
    }

    #[test]
    fn env_overrides_defaults() {
        let settings = Settings::from_sources(
            None,
            env_of(&[
                ("GITHUB_WEBHOOK_SECRET", "s3cret"),
                ("AUTO_TEST_WEBHOOK_SECRET", "api-key"),
                ("ALLOWED_BRANCHES", "main, release/*"),
                ("CLEANUP_REMOVED_TESTS", "false"),
                ("TEST_STRATEGY", "single-pass"),
                ("PORT", "8080"),
                ("DRY_RUN", "1"),
            ]),
        )
        .expect("load");
        assert!(!settings.permissive_signatures());
        assert_eq!(settings.api_key, Some(Secret::new("api-key")));
        assert_eq!(settings.allowed_branches, "main, release/*");
        assert!(!settings.cleanup_enabled);
        assert_eq!(settings.strategy, TestAuthoringStrategy::SinglePass);
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert!(settings.dry_run);
    }

    #[test]
    fn yaml_file_then_env() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("testsync.yaml");
        std::fs::write(
            &path,
            "framework: vitest\nbot_marker: file-bot\ncall_timeout_secs: 5\n",
        )
        .expect("write");

        let settings = Settings::from_sources(Some(&path), env_of(&[("BOT_SIGNATURE", "env-bot")]))
            .expect("load");
        assert_eq!(settings.framework, "vitest");
        assert_eq!(settings.bot_marker, "env-bot");
        assert_eq!(settings.call_timeout(), Duration::from_secs(5));
        assert_eq!(settings.batch_timeout_secs, 300);
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "cleanup_enabled: [not, a, bool]\n").expect("write");

        let err = Settings::from_sources(Some(&path), env_of(&[])).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = Settings::from_file(&dir.path().join("absent.yaml")).expect_err("should fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let err = Settings::from_sources(None, env_of(&[("TEST_STRATEGY", "yolo")]))
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidValue { key: "TEST_STRATEGY", .. }));

        let err = Settings::from_sources(None, env_of(&[("CALL_TIMEOUT_SECS", "0")]))
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidValue { key: "CALL_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn require_credentials_names_missing_key() {
        let mut settings = Settings::default();
        let err = settings.require_credentials().expect_err("no token");
        assert!(matches!(err, ConfigError::Missing { key: "GITHUB_TOKEN" }));

        settings.github_token = Some(Secret::new("ghp"));
        let err = settings.require_credentials().expect_err("no key");
        assert!(matches!(err, ConfigError::Missing { key: "OPENAI_API_KEY" }));

        settings.openai_api_key = Some(Secret::new("sk"));
        settings.require_credentials().expect("complete");
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let settings = Settings {
            github_token: Some(Secret::new("ghp_very_secret")),
            ..Settings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("ghp_very_secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn strategy_maps_to_generation_kind_and_state() {
        let inc = TestAuthoringStrategy::Incremental;
        assert_eq!(inc.generation_kind(false), GenerationKind::New);
        assert_eq!(inc.generation_kind(true), GenerationKind::Update);
        assert_eq!(inc.completed_state(false), FileState::GeneratedNew);
        assert_eq!(inc.completed_state(true), FileState::Updated);

        let single = TestAuthoringStrategy::SinglePass;
        assert_eq!(single.generation_kind(false), GenerationKind::Regenerate);
        assert_eq!(single.completed_state(true), FileState::RegeneratedComplete);
    }
}
