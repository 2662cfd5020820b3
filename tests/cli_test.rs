//! Command-line tests for the signwatch binary

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

/// signwatch with HOME and XDG dirs pointed into `home`
fn signwatch(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("signwatch").unwrap();
    cmd.env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_RUNTIME_DIR", home.join("run"))
        .env_remove("RUST_LOG");
    cmd
}

fn repo_with_commit(root: &Path) -> std::path::PathBuf {
    let repo = root.join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "--quiet"]);
    git(&repo, &["config", "user.name", "Alice"]);
    git(&repo, &["config", "user.email", "alice@example.com"]);
    git(&repo, &["config", "commit.gpgsign", "false"]);
    std::fs::write(repo.join("README"), "hello\n").unwrap();
    git(&repo, &["add", "README"]);
    git(&repo, &["commit", "--quiet", "-m", "initial"]);
    repo
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    signwatch(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_status_when_not_running() {
    let home = TempDir::new().unwrap();
    signwatch(home.path())
        .current_dir(home.path())
        .args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\": false"));
}

#[test]
fn test_stop_when_not_running() {
    let home = TempDir::new().unwrap();
    signwatch(home.path())
        .current_dir(home.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn test_check_reports_eligible_commit() {
    let home = TempDir::new().unwrap();
    let repo = repo_with_commit(home.path());

    signwatch(home.path())
        .current_dir(&repo)
        .args(["--identity", "Alice", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would sign"));
}

#[test]
fn test_check_reports_other_author() {
    let home = TempDir::new().unwrap();
    let repo = repo_with_commit(home.path());

    signwatch(home.path())
        .current_dir(&repo)
        .args(["--identity", "Bob", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not by watched identity"));
}

#[test]
fn test_check_reads_identity_from_gitconfig() {
    let home = TempDir::new().unwrap();
    let repo = repo_with_commit(home.path());
    std::fs::write(home.path().join(".gitconfig"), "[user]\n\tname = Alice\n").unwrap();

    signwatch(home.path())
        .current_dir(&repo)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching: Alice"));
}

#[test]
fn test_check_fails_without_identity() {
    let home = TempDir::new().unwrap();
    let repo = repo_with_commit(home.path());

    signwatch(home.path())
        .current_dir(&repo)
        .env("GIT_CONFIG_GLOBAL", home.path().join("empty-gitconfig"))
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("watched identity"));
}

/// JSON `status` output for the watcher registered under `home`
fn status_json(home: &Path) -> String {
    let output = signwatch(home)
        .current_dir(home)
        .args(["status", "--format", "json"])
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_start_with_relative_config_from_other_directory() {
    let home = TempDir::new().unwrap();
    repo_with_commit(home.path());
    let cfgdir = home.path().join("cfgdir");
    std::fs::create_dir_all(&cfgdir).unwrap();
    std::fs::write(cfgdir.join("sw.yml"), "monitor:\n  identity: Alice\n").unwrap();

    signwatch(home.path())
        .current_dir(&cfgdir)
        .args(["--config", "sw.yml", "--repo", "../repo", "start"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signwatch started"));

    // A watcher that could not read its config exits right after startup
    std::thread::sleep(std::time::Duration::from_millis(1500));
    let status = status_json(home.path());

    signwatch(home.path()).current_dir(home.path()).arg("stop").assert().success();

    assert!(status.contains("\"running\": true"), "watcher died after start: {}", status);
}
