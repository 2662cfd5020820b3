//! Signwatch - background commit signer
//!
//! CLI entry point for starting, stopping, and inspecting the watcher.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{info, warn};

use signwatch::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use signwatch::config::Config;
use signwatch::daemon::{DaemonArgs, DaemonManager};
use signwatch::git::{GitCli, Repository};
use signwatch::monitor::{CommitMonitor, CommitOutcome, MonitorSupervisor, Verdict};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to the log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let help_config = Config::load(early_config_path().as_ref()).unwrap_or_default();
    let cmd = Cli::command().after_help(generate_after_help(&help_config.git.program));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    // The daemon runs inside the repository, so it must get an absolute config path
    let config_path = cli
        .config
        .as_ref()
        .map(|path| {
            path.canonicalize()
                .context(format!("Config file does not exist: {}", path.display()))
        })
        .transpose()?;

    let mut config = Config::load(config_path.as_ref()).context("Failed to load configuration")?;
    if let Some(identity) = &cli.identity {
        config.monitor.identity = Some(identity.clone());
    }

    // The watched repository is fixed here for the lifetime of the process
    let repo = match &cli.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let repo = repo
        .canonicalize()
        .context(format!("Repository path does not exist: {}", repo.display()))?;

    let args = DaemonArgs {
        repo: repo.clone(),
        config: config_path,
        identity: cli.identity.clone(),
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Command::Start { foreground }) => cmd_start(&config, &args, foreground).await,
        Some(Command::Stop) => cmd_stop(),
        Some(Command::Status { format }) => cmd_status(format),
        Some(Command::Logs { follow, lines }) => cmd_logs(follow, lines),
        Some(Command::Check { sign }) => cmd_check(&config, repo, sign).await,
        Some(Command::RunDaemon) => run_daemon(&config, repo).await,
        None => print_help_with_status(&config),
    }
}

/// Config path from the command line, read ahead of the full parse so the
/// help text can check the configured git program
fn early_config_path() -> Option<PathBuf> {
    Cli::command()
        .disable_help_flag(true)
        .disable_version_flag(true)
        .ignore_errors(true)
        .try_get_matches()
        .ok()?
        .get_one::<PathBuf>("config")
        .cloned()
}

/// Print help with the git check and watcher status
fn print_help_with_status(config: &Config) -> Result<()> {
    let mut cmd = Cli::command();
    cmd.print_help()?;
    println!();
    println!();
    print!("{}", generate_after_help(&config.git.program));
    Ok(())
}

/// Start the watcher
async fn cmd_start(config: &Config, args: &DaemonArgs, foreground: bool) -> Result<()> {
    let daemon = DaemonManager::new();

    if let Some(pid) = daemon.running_pid() {
        println!("Signwatch is already running (PID: {})", pid);
        return Ok(());
    }

    if foreground {
        println!("Watching {} in foreground mode (Ctrl+C to stop)...", args.repo.display());
        run_daemon(config, args.repo.clone()).await
    } else {
        let pid = daemon.start(args)?;
        println!("Signwatch started (PID: {}) watching {}", pid, args.repo.display());
        Ok(())
    }
}

/// Stop the watcher
fn cmd_stop() -> Result<()> {
    let daemon = DaemonManager::new();

    let Some(pid) = daemon.running_pid() else {
        println!("Signwatch is not running");
        return Ok(());
    };

    daemon.stop()?;
    println!("Signwatch stopped (was PID: {})", pid);
    Ok(())
}

/// Show watcher status
fn cmd_status(format: OutputFormat) -> Result<()> {
    let status = DaemonManager::new().status();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "running": status.running,
                "pid": status.pid,
                "repo": status.repo.as_ref().map(|p| p.to_string_lossy()),
                "pid_file": status.pid_file.to_string_lossy()
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Signwatch Status");
            println!("----------------");
            match status.pid {
                Some(pid) => {
                    println!("Status: {}", "running".green());
                    println!("PID: {}", pid);
                }
                None => println!("Status: {}", "stopped".red()),
            }
            if let Some(repo) = &status.repo {
                println!("Repository: {}", repo.display());
            }
            println!("PID file: {}", status.pid_file.display());
        }
    }

    Ok(())
}

/// Show logs
fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}

async fn build_monitor(config: &Config, repo: PathBuf) -> Result<CommitMonitor> {
    let git: Arc<dyn Repository> = Arc::new(GitCli::new(config.git_cli_config(repo)));
    let monitor = CommitMonitor::initialize(git, &config.identity_source(), &config.monitor)
        .await
        .context("Failed to start commit monitor")?;
    Ok(monitor)
}

/// Run the decision pipeline once against HEAD
async fn cmd_check(config: &Config, repo: PathBuf, sign: bool) -> Result<()> {
    let monitor = build_monitor(config, repo).await?;
    let head = monitor.last_observed().clone();

    println!("HEAD:     {}", head);
    println!("Watching: {}", monitor.identity());

    if sign {
        let outcome = monitor.process(&head).await;
        let label = match &outcome {
            CommitOutcome::Signed => outcome.state().green(),
            CommitOutcome::Failed(_) => outcome.state().red(),
            _ => outcome.state().yellow(),
        };
        println!("Outcome:  {}", label);
        if let CommitOutcome::Failed(failure) = outcome {
            return Err(failure.into());
        }
        return Ok(());
    }

    let verdict = monitor.evaluate(&head).await?;
    let message = match verdict {
        Verdict::AuthorMismatch { author } => format!("not by watched identity (author: {})", author).yellow(),
        Verdict::AlreadySigned(status) => format!("already signed ({})", status).yellow(),
        Verdict::AlreadyRemote => "already on remote, would not rewrite".yellow(),
        Verdict::Eligible => "would sign (pass --sign to do it)".green(),
    };
    println!("Verdict:  {}", message);
    Ok(())
}

/// Run the watcher until SIGINT or SIGTERM
async fn run_daemon(config: &Config, repo: PathBuf) -> Result<()> {
    info!(?repo, "Watcher starting...");

    // Fail fast: no identity or no HEAD means no polling
    let monitor = build_monitor(config, repo.clone()).await?;

    let daemon = DaemonManager::new();
    daemon.register_self(&repo)?;

    let mut supervisor = MonitorSupervisor::new();
    supervisor.start(monitor);

    info!("Watcher running. Send SIGINT or SIGTERM to stop.");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("Watcher shutting down...");
    supervisor.stop().await;
    daemon.unregister_self()?;

    Ok(())
}
