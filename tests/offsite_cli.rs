// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn strongbox() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("strongbox"))
}

fn data_dir_env(dir: &std::path::Path) -> (&'static str, std::ffi::OsString) {
    ("XDG_DATA_HOME", dir.as_os_str().to_os_string())
}

#[test]
fn offsite_dedups_identical_content_into_one_blob() {
    let source = TempDir::new().expect("tempdir");
    let output = TempDir::new().expect("tempdir");
    let data_home = TempDir::new().expect("tempdir");

    fs::write(source.path().join("a.txt"), b"same content").unwrap();
    fs::write(source.path().join("b.txt"), b"same content").unwrap();

    let (key, value) = data_dir_env(data_home.path());
    strongbox()
        .env(key, value)
        .args(["offsite", "--backup-name", "myhost", "--output-dir"])
        .arg(output.path())
        .arg(source.path())
        .assert()
        .success();

    let data_json: serde_json::Value = serde_json::from_slice(
        &fs::read(output.path().join("data.json")).expect("read data.json"),
    )
    .expect("parse data.json");
    assert_eq!(data_json.as_array().unwrap().len(), 2);

    let blob_count = fs::read_dir(output.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name() != "data.json")
        .count();
    assert_eq!(blob_count, 1);
}

#[test]
fn commit_offsite_without_a_prior_snapshot_fails() {
    let data_home = TempDir::new().expect("tempdir");
    let (key, value) = data_dir_env(data_home.path());

    strongbox()
        .env(key, value)
        .args(["commit-offsite", "--backup-name", "neverseen"])
        .assert()
        .failure();
}

#[test]
fn second_offsite_run_with_no_changes_produces_empty_manifest() {
    let source = TempDir::new().expect("tempdir");
    let data_home = TempDir::new().expect("tempdir");
    fs::write(source.path().join("a.txt"), b"content").unwrap();

    let (key, value) = data_dir_env(data_home.path());

    let output1 = TempDir::new().expect("tempdir");
    strongbox()
        .env(key.clone(), value.clone())
        .args(["offsite", "--backup-name", "myhost", "--output-dir"])
        .arg(output1.path())
        .arg(source.path())
        .assert()
        .success();

    strongbox()
        .env(key.clone(), value.clone())
        .args(["commit-offsite", "--backup-name", "myhost"])
        .assert()
        .success();

    let output2 = TempDir::new().expect("tempdir");
    strongbox()
        .env(key, value)
        .args(["offsite", "--backup-name", "myhost", "--output-dir"])
        .arg(output2.path())
        .arg(source.path())
        .assert()
        .code(1);
}
