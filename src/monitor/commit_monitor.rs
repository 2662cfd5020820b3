//! Commit monitor implementation

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::MonitorConfig;
use super::outcome::{CommitOutcome, MonitorError, Step, StepFailure, TickResult, Verdict};
use crate::git::{CommitHash, Repository};
use crate::identity::{IdentitySource, WatchedIdentity};

/// Everything the loop carries between ticks
///
/// Identity and interval are fixed at construction; `last_observed` is the
/// only mutable field and is written solely by [`CommitMonitor::tick`].
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub identity: WatchedIdentity,
    pub last_observed: CommitHash,
    pub poll_interval: Duration,
}

/// The CommitMonitor polls HEAD and signs new unsigned commits by the watched identity
pub struct CommitMonitor {
    repo: Arc<dyn Repository>,
    ctx: MonitorContext,
}

impl CommitMonitor {
    /// Create a monitor from an already-resolved context
    pub fn new(repo: Arc<dyn Repository>, ctx: MonitorContext) -> Self {
        debug!(?ctx, "CommitMonitor::new: called");
        Self { repo, ctx }
    }

    /// Resolve the identity and the initial HEAD, failing fast on either
    pub async fn initialize(
        repo: Arc<dyn Repository>,
        identity: &IdentitySource,
        config: &MonitorConfig,
    ) -> Result<Self, MonitorError> {
        debug!(?identity, "CommitMonitor::initialize: called");
        let identity = identity.resolve().await?;
        let head = repo.head_hash().await.map_err(MonitorError::InitialHead)?;

        info!(identity = %identity, head = %head.short(), "Commit monitor initialized");
        Ok(Self::new(
            repo,
            MonitorContext {
                identity,
                last_observed: head,
                poll_interval: config.poll_interval(),
            },
        ))
    }

    pub fn identity(&self) -> &WatchedIdentity {
        &self.ctx.identity
    }

    /// The most recently observed HEAD
    pub fn last_observed(&self) -> &CommitHash {
        &self.ctx.last_observed
    }

    pub fn poll_interval(&self) -> Duration {
        self.ctx.poll_interval
    }

    /// Run the predicate chain for `hash` without acting on it
    ///
    /// Checks run cheapest first and stop at the first rejection, so a commit
    /// by someone else never costs a remote lookup.
    pub async fn evaluate(&self, hash: &CommitHash) -> Result<Verdict, StepFailure> {
        let author = self
            .repo
            .last_commit_author()
            .await
            .map_err(|e| StepFailure::new(Step::Author, e))?;
        if !self.ctx.identity.matches(&author) {
            return Ok(Verdict::AuthorMismatch { author });
        }

        let status = self
            .repo
            .last_commit_signature()
            .await
            .map_err(|e| StepFailure::new(Step::Signature, e))?;
        debug!(%hash, %status, "Signature status");
        if status.is_signed() {
            return Ok(Verdict::AlreadySigned(status));
        }

        let on_remote = self
            .repo
            .is_on_remote_branch(hash)
            .await
            .map_err(|e| StepFailure::new(Step::RemoteContainment, e))?;
        if on_remote {
            return Ok(Verdict::AlreadyRemote);
        }

        Ok(Verdict::Eligible)
    }

    /// Evaluate `hash` and sign it when eligible; logs the outcome
    pub async fn process(&self, hash: &CommitHash) -> CommitOutcome {
        let identity = &self.ctx.identity;
        let outcome = match self.evaluate(hash).await {
            Ok(Verdict::AuthorMismatch { author }) => {
                info!(commit = %hash.short(), %author, watched = %identity, "Not by watched identity, ignoring");
                CommitOutcome::AuthorMismatch { author }
            }
            Ok(Verdict::AlreadySigned(status)) => {
                info!(commit = %hash.short(), %status, "Already signed, ignoring");
                CommitOutcome::AlreadySigned(status)
            }
            Ok(Verdict::AlreadyRemote) => {
                info!(
                    commit = %hash.short(),
                    "Already on remote, skipped to avoid rewriting published history"
                );
                CommitOutcome::AlreadyRemote
            }
            Ok(Verdict::Eligible) => {
                info!(commit = %hash.short(), watched = %identity, "Signing commit");
                match self.repo.sign_amend_last_commit().await {
                    Ok(()) => {
                        info!(commit = %hash.short(), "Commit signed");
                        CommitOutcome::Signed
                    }
                    Err(e) => {
                        let failure = StepFailure::new(Step::Sign, e);
                        error!(commit = %hash.short(), error = %failure, "Signing failed, not retrying");
                        CommitOutcome::Failed(failure)
                    }
                }
            }
            Err(failure) => {
                warn!(
                    commit = %hash.short(),
                    step = %failure.step,
                    command = failure.source.command().unwrap_or("-"),
                    error = %failure.source,
                    "Decision pipeline aborted"
                );
                CommitOutcome::Failed(failure)
            }
        };

        debug!(commit = %hash.short(), state = outcome.state(), "CommitMonitor::process: done");
        outcome
    }

    /// Poll HEAD once and process it if it moved
    pub async fn tick(&mut self) -> TickResult {
        let current = match self.repo.head_hash().await {
            Ok(hash) => hash,
            Err(e) => {
                let failure = StepFailure::new(Step::HeadHash, e);
                warn!(
                    command = failure.source.command().unwrap_or("-"),
                    error = %failure,
                    "Could not read HEAD this tick"
                );
                return TickResult::HeadUnavailable(failure);
            }
        };

        if current == self.ctx.last_observed {
            return TickResult::Unchanged;
        }

        info!(old = %self.ctx.last_observed.short(), new = %current.short(), "New commit detected");
        // Record before processing so a failing commit is never picked up again
        self.ctx.last_observed = current.clone();

        let outcome = self.process(&current).await;
        TickResult::Processed { hash: current, outcome }
    }

    /// Run the poll loop until `shutdown` turns true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            identity = %self.ctx.identity,
            interval_ms = self.ctx.poll_interval.as_millis() as u64,
            head = %self.ctx.last_observed.short(),
            "Commit monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(panic) = AssertUnwindSafe(self.tick()).catch_unwind().await {
                error!(panic = %panic_message(panic.as_ref()), "Monitor tick panicked, continuing");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.ctx.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Commit monitor stopped");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
