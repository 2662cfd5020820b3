//! Git query error types

use thiserror::Error;

/// Errors raised by repository queries and the sign action
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("git {command} returned no output")]
    EmptyOutput { command: String },

    #[error("Signing failed: {0}")]
    SignRejected(String),
}

impl GitError {
    /// The git subcommand that produced this error
    pub fn command(&self) -> Option<&str> {
        match self {
            GitError::Spawn { command, .. } => Some(command),
            GitError::CommandFailed { command, .. } => Some(command),
            GitError::EmptyOutput { command } => Some(command),
            GitError::SignRejected(_) => None,
        }
    }
}
