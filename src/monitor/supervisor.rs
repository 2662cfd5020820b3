//! Start/stop control for the background monitor task

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::commit_monitor::CommitMonitor;

struct RunningMonitor {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns at most one running [`CommitMonitor`] task
pub struct MonitorSupervisor {
    running: Option<RunningMonitor>,
    stop_timeout: Duration,
}

impl Default for MonitorSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorSupervisor {
    pub fn new() -> Self {
        debug!("MonitorSupervisor::new: called");
        Self {
            running: None,
            stop_timeout: Duration::from_secs(10),
        }
    }

    /// How long `stop` waits for an in-flight tick before aborting the task
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Whether a monitor task is alive
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawn `monitor` on a background task
    ///
    /// Returns false and drops `monitor` when one is already running.
    pub fn start(&mut self, monitor: CommitMonitor) -> bool {
        debug!("MonitorSupervisor::start: called");
        if self.is_running() {
            debug!("MonitorSupervisor::start: already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(shutdown_rx));
        self.running = Some(RunningMonitor { shutdown_tx, handle });
        info!("Monitor task spawned");
        true
    }

    /// Signal the monitor to stop and wait for it; no-op when not running
    pub async fn stop(&mut self) {
        debug!("MonitorSupervisor::stop: called");
        let Some(running) = self.running.take() else {
            debug!("MonitorSupervisor::stop: nothing to stop");
            return;
        };

        let _ = running.shutdown_tx.send(true);
        let abort = running.handle.abort_handle();
        match tokio::time::timeout(self.stop_timeout, running.handle).await {
            Ok(Ok(())) => info!("Monitor task stopped"),
            Ok(Err(e)) => warn!(error = %e, "Monitor task ended abnormally"),
            Err(_) => {
                warn!(timeout = ?self.stop_timeout, "Monitor did not stop in time, aborting");
                abort.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::git::CommitHash;
    use crate::identity::WatchedIdentity;
    use crate::monitor::MonitorContext;
    use crate::monitor::fake::ScriptedRepo;

    fn monitor(repo: &ScriptedRepo) -> CommitMonitor {
        CommitMonitor::new(
            Arc::new(repo.clone()),
            MonitorContext {
                identity: WatchedIdentity::new("Alice").unwrap(),
                last_observed: CommitHash::from("h1"),
                poll_interval: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let repo = ScriptedRepo::new("h1");
        let mut supervisor = MonitorSupervisor::new();

        assert!(!supervisor.is_running());
        assert!(supervisor.start(monitor(&repo)));
        assert!(supervisor.is_running());
        assert!(!supervisor.start(monitor(&repo)));

        supervisor.stop().await;
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut supervisor = MonitorSupervisor::new();
        supervisor.stop().await;
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let repo = ScriptedRepo::new("h1");
        let mut supervisor = MonitorSupervisor::new().with_stop_timeout(Duration::from_secs(5));

        assert!(supervisor.start(monitor(&repo)));
        supervisor.stop().await;
        assert!(supervisor.start(monitor(&repo)));
        assert!(supervisor.is_running());
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_running_monitor_signs_new_commit() {
        let repo = ScriptedRepo::new("h1");
        let mut supervisor = MonitorSupervisor::new();
        supervisor.start(monitor(&repo));

        repo.set_head("h2");
        for _ in 0..500 {
            if repo.sign_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        supervisor.stop().await;

        assert_eq!(repo.sign_count(), 1);
    }
}
