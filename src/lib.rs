//! Signwatch - background signer for your own unpublished commits
//!
//! Signwatch polls a single git repository and, whenever HEAD moves to a new
//! commit authored by the watched identity that is unsigned and not yet on
//! any remote-tracking branch, amends it with a signature.
//!
//! # Modules
//!
//! - [`git`] - Repository trait and the `git` command line implementation
//! - [`identity`] - Resolving the watched author identity
//! - [`monitor`] - Poll loop, signing decision pipeline, and supervisor
//! - [`config`] - Configuration types and loading
//! - [`daemon`] - Background process control
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod daemon;
pub mod git;
pub mod identity;
pub mod monitor;

// Re-export commonly used types
pub use config::Config;
pub use daemon::{DaemonArgs, DaemonManager, DaemonStatus};
pub use git::{CommitHash, GitCli, GitCliConfig, GitError, Repository, SignatureStatus};
pub use identity::{IdentityError, IdentitySource, WatchedIdentity};
pub use monitor::{
    CommitMonitor, CommitOutcome, MonitorConfig, MonitorContext, MonitorError, MonitorSupervisor, Step, StepFailure,
    TickResult, Verdict,
};
