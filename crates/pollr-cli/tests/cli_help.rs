use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("pollr")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("signup"))
        .stdout(predicate::str::contains("reset-password"))
        .stdout(predicate::str::contains("polls"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_polls_help_shows_subcommands() {
    cargo_bin_cmd!("pollr")
        .args(["polls", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("vote"));
}

#[test]
fn test_vote_requires_option() {
    cargo_bin_cmd!("pollr")
        .args(["polls", "vote", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--option"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("pollr")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
