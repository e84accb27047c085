//! Configuration
//!
//! Layered configuration with:
//! - Runtime defaults
//! - An optional TOML file (`claude-dash.toml`, `.claude-dash.toml`, or
//!   `<config_dir>/claude-dash/config.toml`, first found wins)
//! - Environment variable overrides
//! - Validation
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it changes.

use crate::file_discovery::FileDiscovery;
use crate::pricing::PricingConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;

const MAX_STABILITY_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub watcher: WatcherConfig,
    pub skills: SkillsConfig,
    pub processing: ProcessingConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// `console`, `file` or `both`
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub claude_home: PathBuf,
    /// Overrides `<claude_home>/projects`
    pub projects_dir: Option<PathBuf>,
    pub log_directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// How long a file must stay quiet before a change is reported
    pub stability_ms: u64,
    /// Report transcripts already present at start as added
    pub emit_initial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub read_concurrency: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            claude_home: FileDiscovery::default_claude_home(),
            projects_dir: None,
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            stability_ms: 500,
            emit_initial: true,
        }
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 60 }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { read_concurrency: 8 }
    }
}

impl WatcherConfig {
    pub fn stability(&self) -> Duration {
        Duration::from_millis(self.stability_ms)
    }
}

impl SkillsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Config {
    /// Load configuration from defaults, the first config file found, and the environment
    pub fn load() -> Result<Self> {
        let config_paths = [
            Some(PathBuf::from("claude-dash.toml")),
            Some(PathBuf::from(".claude-dash.toml")),
            dirs::config_dir().map(|d| d.join("claude-dash").join("config.toml")),
        ];

        let mut config = Config::default();
        for path in config_paths.iter().flatten() {
            if path.is_file() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key/value source shaped like the environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Logging overrides
        if let Some(val) = lookup("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Some(val) = lookup("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Path overrides
        if let Some(val) = lookup("CLAUDE_HOME") {
            self.paths.claude_home = PathBuf::from(val);
        }
        if let Some(val) = lookup("CLAUDE_DASH_PROJECTS_DIR") {
            self.paths.projects_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("CLAUDE_DASH_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        if let Some(val) = lookup("CLAUDE_DASH_STABILITY_MS") {
            self.watcher.stability_ms = parse_var("CLAUDE_DASH_STABILITY_MS", &val)?;
        }
        if let Some(val) = lookup("CLAUDE_DASH_SKILL_TTL_SECS") {
            self.skills.cache_ttl_secs = parse_var("CLAUDE_DASH_SKILL_TTL_SECS", &val)?;
        }
        if let Some(val) = lookup("CLAUDE_DASH_READ_CONCURRENCY") {
            self.processing.read_concurrency = parse_var("CLAUDE_DASH_READ_CONCURRENCY", &val)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "Log format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            );
        }
        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            anyhow::bail!(
                "Log output must be 'console', 'file' or 'both', got '{}'",
                self.logging.output
            );
        }

        if self.watcher.stability_ms == 0 || self.watcher.stability_ms > MAX_STABILITY_MS {
            anyhow::bail!(
                "Watcher stability window must be between 1ms and {}ms, got {}ms",
                MAX_STABILITY_MS,
                self.watcher.stability_ms
            );
        }

        if self.processing.read_concurrency == 0 {
            anyhow::bail!("Read concurrency must be greater than 0");
        }

        self.pricing.validate().context("Invalid pricing configuration")?;

        Ok(())
    }

    /// Directory holding the per-project transcript folders
    pub fn projects_dir(&self) -> PathBuf {
        self.paths
            .projects_dir
            .clone()
            .unwrap_or_else(|| FileDiscovery::projects_dir(&self.paths.claude_home))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {}: '{}'", name, value))
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide configuration. A configuration that fails to load is reported on stderr
/// and replaced by the defaults.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: {:#}. Using default configuration.", e);
            Config::default()
        })
    })
}
