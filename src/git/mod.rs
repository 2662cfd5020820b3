//! Source-control access
//!
//! The [`Repository`] trait is everything the commit monitor needs from git.
//! [`GitCli`] implements it by running the `git` binary in the watched
//! working directory; tests substitute an in-memory implementation.

mod cli;
mod error;
mod types;

use async_trait::async_trait;

pub use cli::{GitCli, GitCliConfig};
pub use error::GitError;
pub use types::{CommitHash, SignatureStatus};

/// Queries and actions against a single repository
#[async_trait]
pub trait Repository: Send + Sync {
    /// Hash of the commit currently at HEAD
    async fn head_hash(&self) -> Result<CommitHash, GitError>;

    /// Author name of the most recent commit
    async fn last_commit_author(&self) -> Result<String, GitError>;

    /// Signature verification status of the most recent commit
    async fn last_commit_signature(&self) -> Result<SignatureStatus, GitError>;

    /// Whether `hash` is reachable from any remote-tracking branch
    async fn is_on_remote_branch(&self, hash: &CommitHash) -> Result<bool, GitError>;

    /// Amend the most recent commit with a signature, keeping its message
    async fn sign_amend_last_commit(&self) -> Result<(), GitError>;
}
