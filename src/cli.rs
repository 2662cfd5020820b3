//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::daemon::DaemonManager;

/// Signwatch - signs your unpublished git commits in the background
#[derive(Parser)]
#[command(
    name = "signwatch",
    about = "Watch a git repository and sign new unpublished commits by you",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Repository to watch (defaults to the current directory)
    #[arg(short, long, global = true, help = "Repository to watch")]
    pub repo: Option<PathBuf>,

    /// Author name to watch, overriding git config
    #[arg(short, long, global = true, help = "Author name to watch")]
    pub identity: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start watching in the background
    Start {
        /// Don't fork to background (run in foreground)
        #[arg(long)]
        foreground: bool,
    },

    /// Stop the running watcher
    Stop,

    /// Show whether the watcher is running
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show watcher logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },

    /// Evaluate the current HEAD once and report what would happen
    Check {
        /// Sign the commit if it qualifies
        #[arg(long)]
        sign: bool,
    },

    /// Internal: Run as daemon process (used by `start`)
    #[command(hide = true)]
    RunDaemon,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signwatch")
        .join("logs")
        .join("signwatch.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Whether `<program> --version` runs, and what it reports
fn git_version(program: &str) -> Option<String> {
    let output = std::process::Command::new(program).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Generate the after_help text with the git check and daemon status
///
/// `git_program` is the executable the monitor will run, from `git.program`.
pub fn generate_after_help(git_program: &str) -> String {
    debug!(%git_program, "generate_after_help: called");
    let daemon_running = DaemonManager::new().is_running();
    let log_path = get_log_path();

    let mut help = String::new();

    help.push_str("Required Tools:\n");
    match git_version(git_program) {
        Some(version) => help.push_str(&format!("  \u{2705} {:<10} {}\n", git_program, version)),
        None => help.push_str(&format!("  \u{274C} {:<10} {}\n", git_program, "not found")),
    }

    help.push('\n');
    help.push_str("Watcher:\n");
    let icon = if daemon_running { "\u{2705}" } else { "\u{274C}" };
    let status = if daemon_running { "running" } else { "stopped" };
    help.push_str(&format!("  {} {}\n", icon, status));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", log_path.display()));

    debug!("generate_after_help: returning help text");
    help
}

/// Output format for the status command
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
