//! Integration tests for the CredVault CLI.
//!
//! These run the binary end-to-end with `assert_cmd`. Commands that reach
//! the platform vault are only checked where their outcome does not depend
//! on the state of the machine's credential store.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn credvault() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("credvault").expect("binary should exist")
}

#[test]
fn help_flag_lists_commands() {
    credvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("platform credential vault"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn version_flag_shows_version() {
    credvault()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("credvault"));
}

#[test]
fn no_args_shows_usage() {
    credvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn show_help_lists_kind_and_reveal() {
    credvault()
        .args(["show", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--kind"))
        .stdout(predicate::str::contains("--reveal"))
        .stdout(predicate::str::contains("--best"));
}

#[test]
fn unknown_kind_is_rejected() {
    credvault()
        .args(["show", "alice", "--kind", "smartcard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown credential kind"));
}

#[test]
fn completions_generate_script() {
    credvault()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("credvault"));
}

#[test]
fn completions_unknown_shell_fails() {
    credvault()
        .args(["completions", "csh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shell"));
}

#[test]
fn qualified_namespace_in_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".credvault.toml")
        .write_str("namespace = \"a:b\"\n")
        .unwrap();

    credvault()
        .args(["completions", "bash"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file error"));
}

#[test]
fn qualified_namespace_flag_is_rejected() {
    let tmp = TempDir::new().unwrap();
    credvault()
        .args(["--namespace", "a:b", "completions", "bash"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not contain ':'"));
}

#[cfg(feature = "audit-log")]
#[test]
fn audit_on_fresh_directory_is_empty() {
    let tmp = TempDir::new().unwrap();
    credvault()
        .arg("audit")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit entries found"));

    tmp.child(".credvault").assert(predicate::path::missing());
}

#[test]
fn audit_rejects_bad_duration() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".credvault").create_dir_all().unwrap();
    tmp.child(".credvault/audit.db").touch().unwrap();

    credvault()
        .args(["audit", "--since", "7x"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid duration"));
}

#[cfg(not(windows))]
#[test]
fn vault_commands_are_unsupported_off_windows() {
    let tmp = TempDir::new().unwrap();
    for args in [
        vec!["list"],
        vec!["show", "alice"],
        vec!["test", "alice"],
        vec!["remove", "alice", "--force"],
    ] {
        credvault()
            .args(&args)
            .current_dir(tmp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("not available"));
    }
}
