//! Monitor configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the CommitMonitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Polling interval in milliseconds
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Author name to watch; read from git config when unset
    #[serde(default)]
    pub identity: Option<String>,

    /// Git config file to read `user.name` from instead of the global one
    #[serde(default)]
    pub gitconfig: Option<PathBuf>,

    /// Whether to fetch from all remotes before the containment check
    #[serde(rename = "fetch-before-check", default)]
    pub fetch_before_check: bool,

    /// Key id to sign with; git's `user.signingkey` when unset
    #[serde(rename = "signing-key", default)]
    pub signing_key: Option<String>,
}

/// Shortest interval the loop will sleep between ticks
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            identity: None,
            gitconfig: None,
            fetch_before_check: false,
            signing_key: None,
        }
    }
}

impl MonitorConfig {
    /// Get the poll interval as a Duration, never below [`MIN_POLL_INTERVAL_MS`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}
