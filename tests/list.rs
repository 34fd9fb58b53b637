mod common;

use common::bitrot_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn list_of_empty_store_prints_nothing() {
    let store = TempDir::new().unwrap();

    bitrot_cmd(store.path())
        .arg("-v")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No manifests stored in"));
}

#[test]
fn list_shows_monitored_paths_with_manifest_counts() {
    let store = TempDir::new().unwrap();
    let first_tree = TempDir::new().unwrap();
    let second_tree = TempDir::new().unwrap();
    fs::write(first_tree.path().join("a.txt"), "contents a").unwrap();
    fs::write(second_tree.path().join("b.txt"), "contents b").unwrap();

    bitrot_cmd(store.path())
        .arg("generate")
        .arg(first_tree.path())
        .assert()
        .success();
    bitrot_cmd(store.path())
        .arg("generate")
        .arg(first_tree.path())
        .assert()
        .success();
    bitrot_cmd(store.path())
        .arg("generate")
        .arg(second_tree.path())
        .assert()
        .success();

    let first_path = first_tree.path().canonicalize().unwrap();
    let second_path = second_tree.path().canonicalize().unwrap();

    bitrot_cmd(store.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(first_path.to_str().unwrap()))
        .stdout(predicate::str::contains(second_path.to_str().unwrap()))
        .stdout(predicate::str::contains("manifests: 2"))
        .stdout(predicate::str::contains("manifests: 1"))
        .stdout(predicate::str::contains("    id: "));
}

#[test]
fn list_ignores_the_store_config_file() {
    let store = TempDir::new().unwrap();
    fs::write(store.path().join("config.toml"), "[scan]\nexclude = []\n").unwrap();

    bitrot_cmd(store.path())
        .arg("-v")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No manifests stored in"));
}
