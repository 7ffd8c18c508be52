// Configuration management for funcsweep

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SweepError;

/// Run configuration, built once at startup and passed down by value/reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the per-function extractor executable
    pub funccopy: PathBuf,
    /// Project name stamped into every `fs` row
    pub project: String,
    /// Root directory to enumerate source files from
    pub dir: PathBuf,
    /// Location where the store is (re)created
    pub database: PathBuf,
    /// File suffixes (without the dot) that count as source files
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    /// Optional per-invocation timeout for the extractor
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_suffixes() -> Vec<String> {
    vec!["c".to_string()]
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    /// The built-in sample configuration used when no document is given
    fn default() -> Self {
        Self {
            funccopy: PathBuf::from("./funccopy"),
            project: "sample".to_string(),
            dir: PathBuf::from("tests"),
            database: PathBuf::from("funcs.db"),
            suffixes: default_suffixes(),
            timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SweepError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| SweepError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the configuration for the given command-line argument
    ///
    /// Runs before logging is installed, so it does not log; callers report
    /// the source with [`Config::describe_source`] once the subscriber is up.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Human-readable origin of the configuration picked by [`Config::load`]
    pub fn describe_source(path: Option<&Path>) -> String {
        match path {
            Some(path) => format!("Loaded configuration from {}", path.display()),
            None => "No configuration given, using built-in sample".to_string(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.project.trim().is_empty() {
            return Err(SweepError::Config("project name cannot be empty".into()));
        }
        if self.funccopy.as_os_str().is_empty() {
            return Err(SweepError::Config("funccopy path cannot be empty".into()));
        }
        if self.dir.as_os_str().is_empty() {
            return Err(SweepError::Config("dir cannot be empty".into()));
        }
        if self.database.as_os_str().is_empty() {
            return Err(SweepError::Config("database path cannot be empty".into()));
        }
        if self.suffixes.is_empty() {
            return Err(SweepError::Config("at least one suffix is required".into()));
        }
        if let Some(bad) = self
            .suffixes
            .iter()
            .find(|s| s.is_empty() || s.starts_with('.'))
        {
            return Err(SweepError::Config(format!(
                "suffix {:?} must be non-empty and given without a dot",
                bad
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(SweepError::Config("timeout_secs must be greater than 0".into()));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(SweepError::Config(format!("invalid log level: {}", self.log_level)));
        }

        Ok(())
    }

    /// Check that the extractor can actually be launched
    pub fn check_extractor(&self) -> Result<(), SweepError> {
        if !self.funccopy.is_file() {
            return Err(SweepError::Config(format!(
                "extractor not found at {}",
                self.funccopy.display()
            )));
        }
        Ok(())
    }
}
