//! Resolution of the author identity whose commits get signed

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors resolving the watched identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Watched identity is empty")]
    Empty,

    #[error("user.name not found in {0}")]
    NotConfigured(String),

    #[error("Failed to read git config: {0}")]
    Io(#[from] std::io::Error),
}

/// Author name the monitor watches for; never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedIdentity(String);

impl WatchedIdentity {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against a commit's author name
    pub fn matches(&self, author: &str) -> bool {
        self.0 == author
    }
}

impl fmt::Display for WatchedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the watched identity comes from
#[derive(Debug, Clone)]
pub enum IdentitySource {
    /// Name given directly on the command line or in the config file
    Explicit(String),

    /// `user.name` from a git config file; the global one when `file` is unset
    GitConfig { program: String, file: Option<PathBuf> },
}

impl Default for IdentitySource {
    fn default() -> Self {
        Self::GitConfig {
            program: "git".to_string(),
            file: None,
        }
    }
}

impl IdentitySource {
    /// Resolve the identity, failing if it cannot be determined
    pub async fn resolve(&self) -> Result<WatchedIdentity, IdentityError> {
        debug!(source = ?self, "IdentitySource::resolve: called");
        match self {
            IdentitySource::Explicit(name) => WatchedIdentity::new(name.clone()),
            IdentitySource::GitConfig { program, file } => {
                let mut cmd = Command::new(program);
                cmd.arg("config");
                let location = match file {
                    Some(path) => {
                        cmd.arg("--file").arg(path);
                        path.display().to_string()
                    }
                    None => {
                        cmd.arg("--global");
                        "global git config".to_string()
                    }
                };

                let output = cmd
                    .args(["--get", "user.name"])
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await?;

                // git config exits non-zero when the key is missing
                if !output.status.success() {
                    return Err(IdentityError::NotConfigured(location));
                }

                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if name.is_empty() {
                    return Err(IdentityError::NotConfigured(location));
                }

                info!(identity = %name, %location, "Resolved watched identity");
                WatchedIdentity::new(name)
            }
        }
    }
}
