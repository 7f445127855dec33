//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `singpath-migrate` binary and check exit
//! codes and output. No test reaches a real store: the store root points
//! at a closed local port where a connection is needed.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: the binary with store settings cleared from the environment.
fn singpath() -> Command {
    let mut cmd = cargo_bin_cmd!("singpath-migrate");
    cmd.env_remove("SINGPATH_ROOT")
        .env_remove("SINGPATH_AUTH_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    singpath()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Apply or revert SingPath schema migrations",
        ));
}

#[test]
fn help_lists_subcommands() {
    singpath()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("next"))
        .stdout(predicate::str::contains("revert"));
}

#[test]
fn version_flag_exits_0() {
    singpath()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("singpath-migrate"));
}

#[test]
fn missing_subcommand_is_usage_error() {
    singpath().assert().failure().code(2);
}

#[test]
fn unknown_subcommand_is_usage_error() {
    singpath()
        .arg("migrate-everything")
        .assert()
        .failure()
        .code(2);
}

// ──────────────────────────────────────────────
// 2. Configuration
// ──────────────────────────────────────────────

#[test]
fn missing_root_exits_1() {
    singpath()
        .args(["--token", "secret", "version"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SINGPATH_ROOT"));
}

#[test]
fn missing_token_exits_1() {
    singpath()
        .args(["--root", "http://127.0.0.1:9", "next"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SINGPATH_AUTH_TOKEN"));
}

#[test]
fn missing_root_reported_as_json() {
    singpath()
        .args(["--output", "json", "--token", "secret", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn quiet_suppresses_error_message() {
    singpath()
        .args(["--quiet", "revert"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SINGPATH_ROOT").not());
}

#[test]
fn environment_supplies_root_and_token() {
    // Configuration is accepted; the call then fails on the closed port.
    singpath()
        .env("SINGPATH_ROOT", "http://127.0.0.1:9")
        .env("SINGPATH_AUTH_TOKEN", "secret")
        .arg("version")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("migration error"))
        .stderr(predicate::str::contains("meta/version"));
}

// ──────────────────────────────────────────────
// 3. Transport failures
// ──────────────────────────────────────────────

#[test]
fn unreachable_store_fails_next_without_panicking() {
    singpath()
        .args([
            "--root",
            "http://127.0.0.1:9",
            "--token",
            "secret",
            "--output",
            "json",
            "next",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("panicked").not());
}
