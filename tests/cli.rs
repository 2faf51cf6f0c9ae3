use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("capfetch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("strategies"));
}

#[test]
fn test_fetch_help_shows_tier_flag() {
    Command::cargo_bin("capfetch")
        .unwrap()
        .args(["fetch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tier"))
        .stdout(predicate::str::contains("--stt"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("capfetch")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("capfetch"));
}
