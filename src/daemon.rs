//! Background process management
//!
//! Handles spawning the watcher process, its PID file, and stopping it.
//! Next to the PID file the daemon records which repository it watches.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Default PID file location
fn default_pid_path() -> PathBuf {
    let path = dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("signwatch")
        .join("signwatch.pid");
    debug!(?path, "default_pid_path: returning path");
    path
}

/// Arguments forwarded to the spawned `run-daemon` process
#[derive(Debug, Clone, Default)]
pub struct DaemonArgs {
    pub repo: PathBuf,
    pub config: Option<PathBuf>,
    pub identity: Option<String>,
    pub verbose: bool,
}

impl DaemonArgs {
    fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--repo".to_string(), self.repo.display().to_string()];
        if let Some(config) = &self.config {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        if let Some(identity) = &self.identity {
            args.push("--identity".to_string());
            args.push(identity.clone());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args.push("run-daemon".to_string());
        args
    }
}

/// Watcher process manager
#[derive(Debug)]
pub struct DaemonManager {
    /// Path to the PID file
    pid_file: PathBuf,
    /// Path to the file naming the watched repository
    repo_file: PathBuf,
}

impl Default for DaemonManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonManager {
    /// Create a daemon manager with the default PID file location
    pub fn new() -> Self {
        Self::with_pid_file(default_pid_path())
    }

    /// Create a daemon manager with a custom PID file path
    pub fn with_pid_file(pid_file: PathBuf) -> Self {
        debug!(?pid_file, "DaemonManager::with_pid_file: called");
        let repo_file = pid_file.with_extension("repo");
        Self { pid_file, repo_file }
    }

    /// Check if the watcher is running
    pub fn is_running(&self) -> bool {
        self.running_pid().is_some()
    }

    /// Get the running watcher's PID
    pub fn running_pid(&self) -> Option<u32> {
        let result = self.read_pid().filter(|&pid| is_process_running(pid));
        debug!(?result, "DaemonManager::running_pid: returning");
        result
    }

    fn read_pid(&self) -> Option<u32> {
        let contents = fs::read_to_string(&self.pid_file).ok()?;
        contents.trim().parse().ok()
    }

    fn write_pid(&self, pid: u32) -> Result<()> {
        debug!(pid, ?self.pid_file, "DaemonManager::write_pid: called");
        write_file(&self.pid_file, &pid.to_string()).context("Failed to write PID file")
    }

    fn write_repo(&self, repo: &Path) -> Result<()> {
        write_file(&self.repo_file, &repo.display().to_string()).context("Failed to write repo file")
    }

    /// Repository the running (or last) watcher was started for
    pub fn watched_repo(&self) -> Option<PathBuf> {
        let contents = fs::read_to_string(&self.repo_file).ok()?;
        let trimmed = contents.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    fn remove_state_files(&self) -> Result<()> {
        for path in [&self.pid_file, &self.repo_file] {
            if path.exists() {
                fs::remove_file(path).context(format!("Failed to remove {}", path.display()))?;
                debug!(?path, "Removed state file");
            }
        }
        Ok(())
    }

    /// Spawn the watcher process and return its PID
    pub fn start(&self, args: &DaemonArgs) -> Result<u32> {
        debug!(?args, "DaemonManager::start: called");
        if let Some(pid) = self.running_pid() {
            return Err(eyre::eyre!("Watcher already running with PID {}", pid));
        }

        info!(repo = ?args.repo, "Starting watcher...");
        let exe = std::env::current_exe().context("Failed to get current executable")?;

        let child = Command::new(&exe)
            .args(args.to_args())
            .current_dir(&args.repo)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn watcher process")?;

        let pid = child.id();
        self.write_pid(pid)?;
        self.write_repo(&args.repo)?;

        info!(pid, "Watcher started");
        Ok(pid)
    }

    /// Stop the watcher: SIGTERM, then SIGKILL if it lingers
    pub fn stop(&self) -> Result<()> {
        debug!("DaemonManager::stop: called");
        let pid = self
            .running_pid()
            .ok_or_else(|| eyre::eyre!("Watcher is not running"))?;

        info!(pid, "Stopping watcher...");

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).context("Failed to send SIGTERM")?;
        }

        let mut attempts = 0;
        while is_process_running(pid) && attempts < 50 {
            std::thread::sleep(std::time::Duration::from_millis(100));
            attempts += 1;
        }
        debug!(attempts, "DaemonManager::stop: waited for process");

        if is_process_running(pid) {
            warn!(pid, "Watcher did not stop gracefully, sending SIGKILL");
            #[cfg(unix)]
            {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
        }

        self.remove_state_files()?;
        info!(pid, "Watcher stopped");
        Ok(())
    }

    /// Register the current process as the watcher
    ///
    /// Called by the spawned process so a foreground run is visible to `status`.
    pub fn register_self(&self, repo: &Path) -> Result<()> {
        let pid = std::process::id();
        self.write_pid(pid)?;
        self.write_repo(repo)?;
        info!(pid, ?repo, "Watcher registered");
        Ok(())
    }

    /// Remove our own registration on clean shutdown
    pub fn unregister_self(&self) -> Result<()> {
        if self.read_pid() == Some(std::process::id()) {
            self.remove_state_files()?;
        }
        Ok(())
    }

    /// Get the PID file path
    pub fn pid_file(&self) -> &PathBuf {
        &self.pid_file
    }

    /// Get the watcher status
    pub fn status(&self) -> DaemonStatus {
        let pid = self.running_pid();
        let status = DaemonStatus {
            running: pid.is_some(),
            pid,
            repo: if pid.is_some() { self.watched_repo() } else { None },
            pid_file: self.pid_file.clone(),
        };
        debug!(?status, "DaemonManager::status: returning");
        status
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = fs::File::create(path)?;
    write!(file, "{}", contents)?;
    Ok(())
}

/// Check if a process with the given PID is running
fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        // Signal 0 only checks that the process exists
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Watcher status information
#[derive(Debug)]
pub struct DaemonStatus {
    /// Whether the watcher is running
    pub running: bool,
    /// Process ID (if running)
    pub pid: Option<u32>,
    /// Repository being watched (if running)
    pub repo: Option<PathBuf>,
    /// PID file path
    pub pid_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_daemon_manager_with_custom_pid() {
        let temp_dir = TempDir::new().unwrap();
        let pid_file = temp_dir.path().join("test.pid");

        let manager = DaemonManager::with_pid_file(pid_file.clone());
        assert_eq!(manager.pid_file(), &pid_file);
        assert_eq!(manager.repo_file, temp_dir.path().join("test.repo"));
    }

    #[test]
    fn test_is_not_running_when_no_pid_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DaemonManager::with_pid_file(temp_dir.path().join("nonexistent.pid"));
        assert!(!manager.is_running());
        assert!(manager.stop().is_err());
    }

    #[test]
    fn test_write_and_read_pid() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DaemonManager::with_pid_file(temp_dir.path().join("state").join("test.pid"));

        manager.write_pid(12345).unwrap();
        assert_eq!(manager.read_pid(), Some(12345));

        manager.remove_state_files().unwrap();
        assert_eq!(manager.read_pid(), None);
    }

    #[test]
    fn test_register_self_is_running() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DaemonManager::with_pid_file(temp_dir.path().join("test.pid"));
        let repo = temp_dir.path().join("repo");

        manager.register_self(&repo).unwrap();
        let status = manager.status();
        assert!(status.running);
        assert_eq!(status.pid, Some(std::process::id()));
        assert_eq!(status.repo, Some(repo));

        manager.unregister_self().unwrap();
        assert!(!manager.pid_file().exists());
        assert!(manager.watched_repo().is_none());
    }

    #[test]
    fn test_unregister_leaves_foreign_pid() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DaemonManager::with_pid_file(temp_dir.path().join("test.pid"));

        manager.write_pid(std::process::id() + 1).unwrap();
        manager.unregister_self().unwrap();
        assert!(manager.pid_file().exists());
    }

    #[test]
    fn test_status_when_stopped() {
        let temp_dir = TempDir::new().unwrap();
        let pid_file = temp_dir.path().join("test.pid");

        let manager = DaemonManager::with_pid_file(pid_file.clone());
        let status = manager.status();

        assert!(!status.running);
        assert!(status.pid.is_none());
        assert!(status.repo.is_none());
        assert_eq!(status.pid_file, pid_file);
    }

    #[test]
    fn test_daemon_args_forwarding() {
        let args = DaemonArgs {
            repo: PathBuf::from("/src/project"),
            config: Some(PathBuf::from("/etc/signwatch.yml")),
            identity: Some("Alice".to_string()),
            verbose: true,
        };
        assert_eq!(
            args.to_args(),
            vec![
                "--repo",
                "/src/project",
                "--config",
                "/etc/signwatch.yml",
                "--identity",
                "Alice",
                "--verbose",
                "run-daemon"
            ]
        );
    }
}
