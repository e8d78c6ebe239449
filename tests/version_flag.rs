use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn prints_version() {
    Command::new(env!("CARGO_BIN_EXE_skysearch"))
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::new(env!("CARGO_BIN_EXE_skysearch"))
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("skysearch"))
        .stdout(contains("--version"));
}
