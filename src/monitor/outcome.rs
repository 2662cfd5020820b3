//! Results of a poll tick and of the signing decision pipeline

use std::fmt;

use thiserror::Error;

use crate::git::{CommitHash, GitError, SignatureStatus};
use crate::identity::IdentityError;

/// A single repository operation performed by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    HeadHash,
    Author,
    Signature,
    RemoteContainment,
    Sign,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::HeadHash => write!(f, "head hash query"),
            Step::Author => write!(f, "author query"),
            Step::Signature => write!(f, "signature status query"),
            Step::RemoteContainment => write!(f, "remote containment query"),
            Step::Sign => write!(f, "sign action"),
        }
    }
}

/// A failed step; ends the current cycle but never the loop
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct StepFailure {
    pub step: Step,
    #[source]
    pub source: GitError,
}

impl StepFailure {
    pub fn new(step: Step, source: GitError) -> Self {
        Self { step, source }
    }
}

/// Errors that prevent the monitor from starting
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Cannot determine watched identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("Cannot resolve initial HEAD: {0}")]
    InitialHead(#[source] GitError),
}

/// What the predicate chain decided for a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Authored by someone other than the watched identity
    AuthorMismatch { author: String },
    /// Already carries a signature (or one that could not be checked)
    AlreadySigned(SignatureStatus),
    /// Reachable from a remote-tracking branch, so already published
    AlreadyRemote,
    /// Unsigned, unpublished and ours
    Eligible,
}

/// Terminal state reached for one observed commit
#[derive(Debug)]
pub enum CommitOutcome {
    AuthorMismatch { author: String },
    AlreadySigned(SignatureStatus),
    AlreadyRemote,
    Signed,
    /// A query or the sign action failed; `step` says which
    Failed(StepFailure),
}

impl CommitOutcome {
    /// Short state name used in logs and CLI output
    pub fn state(&self) -> &'static str {
        match self {
            CommitOutcome::AuthorMismatch { .. } => "author-mismatch",
            CommitOutcome::AlreadySigned(_) => "already-signed",
            CommitOutcome::AlreadyRemote => "already-remote",
            CommitOutcome::Signed => "sign-ok",
            CommitOutcome::Failed(failure) if failure.step == Step::Sign => "sign-failed",
            CommitOutcome::Failed(_) => "aborted",
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, CommitOutcome::Signed)
    }
}

/// Result of one poll tick
#[derive(Debug)]
pub enum TickResult {
    /// HEAD still points at the previously observed commit
    Unchanged,
    /// HEAD could not be read this tick
    HeadUnavailable(StepFailure),
    /// A new commit was observed and run through the pipeline
    Processed { hash: CommitHash, outcome: CommitOutcome },
}
