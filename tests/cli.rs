use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a config that points at an isolated cache dir and a yt-dlp binary that does not exist
fn write_config(dir: &Path) -> PathBuf {
    let cache_dir = dir.join("cache");
    let config_path = dir.join("ytscribe.yaml");
    let content = format!(
        "ytdlp:\n  binary: ytscribe-test-missing-yt-dlp\ncache:\n  dir: {}\nretry:\n  max_attempts: 1\n  base_delay_ms: 1\n",
        cache_dir.display()
    );
    std::fs::write(&config_path, content).unwrap();
    config_path
}

fn ytscribe(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ytscribe").unwrap();
    cmd.arg("--quiet").arg("--config").arg(config);
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("ytscribe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("subtitles"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_invalid_url_is_reported_as_invalid_input() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    ytscribe(&config)
        .args(["info", "not-a-url"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Error (InvalidInput)"));
}

#[test]
fn test_missing_binary_is_reported_as_tool_not_found() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    ytscribe(&config)
        .args(["info", "https://example.com/watch?v=abc"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Error (ToolNotFound)"));
}

#[test]
fn test_json_output_carries_failure_flag() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    ytscribe(&config)
        .args(["--format", "json", "subtitles", "list", "https://example.com/watch?v=abc"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("\"error_kind\": \"ToolNotFound\""));
}

#[test]
fn test_bad_time_range_fails_before_running_yt_dlp() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    ytscribe(&config)
        .args(["video", "https://example.com/watch?v=abc", "--start", "90", "--end", "30"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Error (InvalidInput)"));
}

#[test]
fn test_cache_cleanup_and_clear() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let cache_dir = dir.path().join("cache");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(cache_dir.join("broken.json"), "not json").unwrap();

    ytscribe(&config)
        .args(["cache", "cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 expired cache entries"));

    ytscribe(&config)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 cache entries"));
}

#[test]
fn test_output_file_receives_result() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let out = dir.path().join("result.txt");

    ytscribe(&config)
        .args(["info", "not-a-url", "-o"])
        .arg(&out)
        .assert()
        .failure();

    let saved = std::fs::read_to_string(&out).unwrap();
    assert!(saved.starts_with("Error (InvalidInput)"));
}
