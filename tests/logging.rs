mod common;

use common::bitrot_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn tree_with_file() -> TempDir {
    let tree = TempDir::new().unwrap();
    fs::write(tree.path().join("file.txt"), "hello").unwrap();
    tree
}

#[test]
fn generate_without_flags_respects_rust_log_info() {
    let store = TempDir::new().unwrap();
    let tree = tree_with_file();

    bitrot_cmd(store.path())
        .env("RUST_LOG", "info")
        .arg("generate")
        .arg(tree.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote manifest to"));
}

#[test]
fn generate_without_flags_respects_rust_log_warn() {
    let store = TempDir::new().unwrap();
    let tree = tree_with_file();

    bitrot_cmd(store.path())
        .env("RUST_LOG", "warn")
        .arg("generate")
        .arg(tree.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn verbose_overrides_rust_log_warn() {
    let store = TempDir::new().unwrap();
    let tree = tree_with_file();

    bitrot_cmd(store.path())
        .env("RUST_LOG", "warn")
        .arg("-v")
        .arg("generate")
        .arg(tree.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO: Wrote manifest to"));
}

#[test]
fn verbose_debug_shows_per_file_checksums() {
    let store = TempDir::new().unwrap();
    let tree = tree_with_file();

    bitrot_cmd(store.path())
        .env("RUST_LOG", "warn")
        .arg("-vv")
        .arg("generate")
        .arg(tree.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Checksum of"));
}

#[test]
fn logs_go_to_stderr_not_stdout() {
    let store = TempDir::new().unwrap();
    let tree = tree_with_file();

    bitrot_cmd(store.path())
        .arg("-vv")
        .arg("generate")
        .arg(tree.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn error_output_uses_plain_ascii_prefixes() {
    let store = TempDir::new().unwrap();
    let tree = tree_with_file();

    let output = bitrot_cmd(store.path())
        .arg("validate")
        .arg(tree.path())
        .assert()
        .code(1)
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    for ch in stderr.chars() {
        assert!(
            ch.is_ascii(),
            "stderr unexpectedly contains non-ASCII character: {ch:?}"
        );
    }
    assert!(
        stderr.contains("ERROR: No previous manifest to validate for"),
        "stderr should carry the prefixed error message"
    );
}

#[test]
fn help_shows_global_options() {
    let store = TempDir::new().unwrap();

    bitrot_cmd(store.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--store <DIR>"))
        .stdout(predicate::str::contains("--exclude <NAME>"))
        .stdout(predicate::str::contains("-v, --verbose"));
}
