//! Signwatch configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::git::GitCliConfig;
use crate::identity::IdentitySource;
use crate::monitor::MonitorConfig;

/// Main Signwatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Commit monitor settings
    pub monitor: MonitorConfig,

    /// Git executable settings
    pub git: GitConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_ms == 0 {
            return Err(eyre::eyre!("monitor.poll-interval-ms must be greater than 0"));
        }
        if self.git.program.trim().is_empty() {
            return Err(eyre::eyre!("git.program must not be empty"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .signwatch.yml
        let local_config = PathBuf::from(".signwatch.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/signwatch/signwatch.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("signwatch").join("signwatch.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Where the watched identity comes from
    ///
    /// An explicit `monitor.identity` wins over reading git config.
    pub fn identity_source(&self) -> IdentitySource {
        match &self.monitor.identity {
            Some(name) => IdentitySource::Explicit(name.clone()),
            None => IdentitySource::GitConfig {
                program: self.git.program.clone(),
                file: self.monitor.gitconfig.clone(),
            },
        }
    }

    /// Git settings for the repository at `repo_path`
    pub fn git_cli_config(&self, repo_path: PathBuf) -> GitCliConfig {
        GitCliConfig {
            repo_path,
            program: self.git.program.clone(),
            fetch_before_check: self.monitor.fetch_before_check,
            signing_key: self.monitor.signing_key.clone(),
        }
    }
}

/// Git executable configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Program used for every git invocation
    pub program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}
