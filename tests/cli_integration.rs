use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("blobman").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("BLOBMAN_LOG");
    cmd
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A git work tree with a hand-written blobman config, so no restic is needed.
fn initialized_repo() -> tempfile::TempDir {
    let tmp = tempdir().unwrap();
    let status = Command::new("git")
        .arg("init")
        .arg("-q")
        .current_dir(tmp.path())
        .status()
        .unwrap();
    assert!(status.success());

    let dir = tmp.path().join(".blobman");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("config.json"),
        r#"{"repository_url":"/srv/restic","include_patterns":{}}"#,
    )
    .unwrap();
    fs::write(dir.join("lock.json"), r#"{"snapshot_tag":null,"tracked_files":[]}"#).unwrap();
    fs::write(dir.join("password.txt"), "hunter2").unwrap();
    tmp
}

#[test]
fn help_lists_commands() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("checkout"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn commands_outside_a_repository_fail() {
    let tmp = tempdir().unwrap();
    bin()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn uninitialized_repository_points_at_init() {
    let tmp = tempdir().unwrap();
    fs::create_dir(tmp.path().join(".git")).unwrap();
    bin()
        .arg("-C")
        .arg(tmp.path())
        .arg("snapshot")
        .arg("--dry")
        .assert()
        .failure()
        .stderr(predicate::str::contains("blobman init"));
}

#[test]
fn add_and_remove_patterns() {
    if !git_available() {
        return;
    }
    let repo = initialized_repo();

    let output = bin()
        .current_dir(repo.path())
        .args(["add", "data/**/*.bin"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("data/**/*.bin"));

    let config = fs::read_to_string(repo.path().join(".blobman/config.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&config).unwrap();
    let patterns = parsed["include_patterns"].as_object().unwrap();
    assert_eq!(patterns.len(), 1);
    let id = patterns.keys().next().unwrap().clone();

    bin()
        .current_dir(repo.path())
        .args(["add", "data/**/*.bin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already tracked"));

    bin()
        .current_dir(repo.path())
        .args(["remove", &id])
        .assert()
        .success();
    let config = fs::read_to_string(repo.path().join(".blobman/config.json")).unwrap();
    assert!(!config.contains("data/**/*.bin"));

    bin()
        .current_dir(repo.path())
        .args(["remove", &id])
        .assert()
        .failure();
}

#[test]
fn add_rejects_patterns_that_escape_the_repository() {
    if !git_available() {
        return;
    }
    let repo = initialized_repo();
    bin()
        .current_dir(repo.path())
        .args(["add", "../outside/*.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("../outside/*.bin"));
}

#[test]
fn add_refuses_files_tracked_by_git() {
    if !git_available() {
        return;
    }
    let repo = initialized_repo();
    fs::write(repo.path().join("model.bin"), "weights").unwrap();
    let status = Command::new("git")
        .args(["add", "model.bin"])
        .current_dir(repo.path())
        .status()
        .unwrap();
    assert!(status.success());

    bin()
        .current_dir(repo.path())
        .args(["add", "*.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("model.bin"));

    let config = fs::read_to_string(repo.path().join(".blobman/config.json")).unwrap();
    assert!(!config.contains("*.bin"));
}
