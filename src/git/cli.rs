//! Repository implementation backed by the `git` command line

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::GitError;
use super::types::{CommitHash, SignatureStatus};
use super::Repository;

/// Settings for [`GitCli`]
#[derive(Debug, Clone)]
pub struct GitCliConfig {
    /// Working directory of the watched repository
    pub repo_path: PathBuf,

    /// Executable to run (normally `git`)
    pub program: String,

    /// Run `git fetch --all` before checking remote containment
    pub fetch_before_check: bool,

    /// Key id passed to `--gpg-sign`; git's configured default when unset
    pub signing_key: Option<String>,
}

impl GitCliConfig {
    /// Config for the given repository with default settings
    pub fn with_repo(repo_path: impl Into<PathBuf>) -> Self {
        let repo_path = repo_path.into();
        debug!(?repo_path, "GitCliConfig::with_repo: called");
        Self {
            repo_path,
            program: "git".to_string(),
            fetch_before_check: false,
            signing_key: None,
        }
    }
}

/// Runs `git` subprocesses against one working directory
#[derive(Debug, Clone)]
pub struct GitCli {
    config: GitCliConfig,
}

impl GitCli {
    pub fn new(config: GitCliConfig) -> Self {
        debug!(?config, "GitCli::new: called");
        Self { config }
    }

    /// Run git with `args` and return trimmed stdout
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command = args.join(" ");
        debug!(%command, "GitCli::run: called");

        let output = Command::new(&self.config.program)
            .args(args)
            .current_dir(&self.config.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(%command, %stderr, "GitCli::run: command failed");
            return Err(GitError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn fetch_remotes(&self) {
        debug!("GitCli::fetch_remotes: called");
        // A failed fetch still leaves the local remote-tracking refs to check against
        if let Err(e) = self.run(&["fetch", "--all", "--quiet"]).await {
            warn!(error = %e, "git fetch failed, checking against local remote-tracking refs");
        }
    }
}

#[async_trait]
impl Repository for GitCli {
    async fn head_hash(&self) -> Result<CommitHash, GitError> {
        let sha = self.run(&["rev-parse", "HEAD"]).await?;
        if sha.is_empty() {
            return Err(GitError::EmptyOutput {
                command: "rev-parse HEAD".to_string(),
            });
        }
        Ok(CommitHash::new(sha))
    }

    async fn last_commit_author(&self) -> Result<String, GitError> {
        self.run(&["log", "-1", "--pretty=format:%an"]).await
    }

    async fn last_commit_signature(&self) -> Result<SignatureStatus, GitError> {
        let code = self.run(&["log", "-1", "--pretty=format:%G?"]).await?;
        debug!(%code, "GitCli::last_commit_signature: raw status");
        let status = SignatureStatus::from_placeholder(&code);
        if status != SignatureStatus::None {
            return Ok(status);
        }

        // git also answers `N` for signatures it cannot verify, e.g. SSH
        // signatures without gpg.ssh.allowedSignersFile
        let raw = self.run(&["cat-file", "commit", "HEAD"]).await?;
        if has_signature_header(&raw) {
            debug!("GitCli::last_commit_signature: unverifiable signature present");
            return Ok(SignatureStatus::Unknown);
        }
        Ok(SignatureStatus::None)
    }

    async fn is_on_remote_branch(&self, hash: &CommitHash) -> Result<bool, GitError> {
        if self.config.fetch_before_check {
            self.fetch_remotes().await;
        }

        let branches = self.run(&["branch", "--remote", "--contains", hash.as_str()]).await?;
        debug!(%hash, %branches, "GitCli::is_on_remote_branch: containing branches");
        Ok(!branches.is_empty())
    }

    async fn sign_amend_last_commit(&self) -> Result<(), GitError> {
        let sign_flag = match &self.config.signing_key {
            Some(key) => format!("--gpg-sign={}", key),
            None => "-S".to_string(),
        };

        match self.run(&["commit", &sign_flag, "--amend", "--no-edit", "--allow-empty"]).await {
            Ok(_) => {
                info!(repo = ?self.config.repo_path, "Amended HEAD with signature");
                Ok(())
            }
            Err(GitError::CommandFailed { stderr, .. }) => Err(GitError::SignRejected(stderr)),
            Err(e) => Err(e),
        }
    }
}

/// Whether a raw commit object (`git cat-file commit`) carries a signature
fn has_signature_header(raw: &str) -> bool {
    raw.lines()
        .take_while(|line| !line.is_empty())
        .any(|line| line.starts_with("gpgsig ") || line.starts_with("gpgsig-sha256 "))
}
