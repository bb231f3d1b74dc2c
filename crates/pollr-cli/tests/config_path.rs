mod fixtures;

use std::fs;

use fixtures::offline;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    offline(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    offline(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("[backend]"));
    assert!(contents.contains("refresh_margin_secs = 90"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    offline(dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_generate_prints_defaults() {
    let dir = tempdir().unwrap();

    offline(dir.path())
        .args(["config", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auto_refresh = true"))
        .stdout(predicate::str::contains("[log]"));
}

#[test]
fn test_set_backend_writes_config() {
    let dir = tempdir().unwrap();

    offline(dir.path())
        .args(["config", "set-backend", "https://demo.supabase.co/", "anon-123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend set to https://demo.supabase.co"));

    let contents = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(contents.contains("https://demo.supabase.co"));
    assert!(contents.contains("anon-123"));
}

#[test]
fn test_commands_need_a_backend() {
    let dir = tempdir().unwrap();

    offline(dir.path())
        .args(["polls", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backend URL configured"));
}
