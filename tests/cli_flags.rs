use std::process::Command;

use predicates::prelude::*;

#[test]
fn prints_version() {
    let exe = env!("CARGO_BIN_EXE_rview");
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .expect("run rview --version");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "stdout was: {}",
        stdout.trim()
    );
}

#[test]
fn prints_help() {
    let exe = env!("CARGO_BIN_EXE_rview");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("run rview --help");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(stdout.contains("RView"));
    assert!(stdout.contains("--offline"));
    assert!(stdout.contains("--source"));
    assert!(stdout.contains("--config"));
}

#[test]
fn rejects_unknown_flags() {
    assert_cmd::Command::cargo_bin("rview")
        .expect("binary built")
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized argument '--bogus'"));
}

#[test]
fn source_flag_requires_value() {
    assert_cmd::Command::cargo_bin("rview")
        .expect("binary built")
        .arg("--source")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires a subreddit name"));
}

#[test]
fn config_flag_requires_value() {
    assert_cmd::Command::cargo_bin("rview")
        .expect("binary built")
        .arg("--config")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires a file path"));
}
