use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const INPUT_VARS: [&str; 6] = [
    "INPUT_SERVER",
    "INPUT_USERNAME",
    "INPUT_PASSWORD",
    "INPUT_PORT",
    "INPUT_LOCAL_DIR",
    "INPUT_SERVER_DIR",
];

fn treesync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("treesync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1");
    for var in INPUT_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn site() -> TempDir {
    let local = TempDir::new().expect("local");
    fs::write(local.path().join("index.html"), "<p>hi</p>").expect("index");
    fs::create_dir_all(local.path().join("assets")).expect("assets");
    fs::write(local.path().join("assets/app.js"), "run()").expect("js");
    local
}

fn dir_args<'a>(local: &'a TempDir, mirror: &'a TempDir) -> [&'a str; 4] {
    [
        "--local-dir",
        local.path().to_str().expect("utf-8 path"),
        "--mirror-dir",
        mirror.path().to_str().expect("utf-8 path"),
    ]
}

#[test]
fn plan_lists_additions_and_writes_nothing() {
    let home = TempDir::new().expect("home");
    let local = site();
    let mirror = TempDir::new().expect("mirror");

    treesync_cmd(home.path())
        .arg("plan")
        .args(dir_args(&local, &mirror))
        .assert()
        .success()
        .stdout(contains("index.html"))
        .stdout(contains("assets/"))
        .stdout(contains("0 to remove, 3 to add"));

    assert!(fs::read_dir(mirror.path()).expect("read").next().is_none());
}

#[test]
fn plan_json_is_machine_readable() {
    let home = TempDir::new().expect("home");
    let local = site();
    let mirror = TempDir::new().expect("mirror");
    fs::write(mirror.path().join("stale.txt"), "old").expect("stale");

    let output = treesync_cmd(home.path())
        .arg("plan")
        .args(dir_args(&local, &mirror))
        .arg("--json")
        .output()
        .expect("run treesync plan --json");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["remove"][0]["path"], "stale.txt");
    assert_eq!(json["remove"][0]["code"], "remove");
    let added: Vec<&str> = json["add"]
        .as_array()
        .expect("add array")
        .iter()
        .filter_map(|item| item["path"].as_str())
        .collect();
    assert_eq!(added, vec!["assets", "assets/app.js", "index.html"]);
}

#[test]
fn sync_then_plan_reports_up_to_date() {
    let home = TempDir::new().expect("home");
    let local = site();
    let mirror = TempDir::new().expect("mirror");

    treesync_cmd(home.path())
        .arg("sync")
        .args(dir_args(&local, &mirror))
        .assert()
        .success()
        .stdout(contains("✓ synced (0 removed, 3 added)"))
        .stdout(contains("manifest updated"));
    assert_eq!(
        fs::read_to_string(mirror.path().join("assets/app.js")).expect("uploaded"),
        "run()"
    );
    assert!(mirror.path().join(".treesync-manifest.json").is_file());

    treesync_cmd(home.path())
        .arg("plan")
        .args(dir_args(&local, &mirror))
        .assert()
        .success()
        .stdout(contains("remote is up to date"));
}

#[test]
fn dry_run_sync_touches_nothing() {
    let home = TempDir::new().expect("home");
    let local = site();
    let mirror = TempDir::new().expect("mirror");

    treesync_cmd(home.path())
        .arg("sync")
        .args(dir_args(&local, &mirror))
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("would add file index.html"));

    assert!(fs::read_dir(mirror.path()).expect("read").next().is_none());
}

#[test]
fn saved_profile_drives_plan() {
    let home = TempDir::new().expect("home");
    let local = site();
    let mirror = TempDir::new().expect("mirror");

    treesync_cmd(home.path())
        .args(["init", "--name", "site"])
        .args(dir_args(&local, &mirror))
        .args(["--server-dir", "public"])
        .assert()
        .success()
        .stdout(contains("Saved profile 'site'"));
    assert!(home.path().join(".treesync/site.yaml").is_file());

    treesync_cmd(home.path())
        .args(["plan", "--profile", "site"])
        .assert()
        .success()
        .stdout(contains("(public)"))
        .stdout(contains("3 to add"));
}

#[test]
fn missing_target_names_the_environment_variable() {
    let home = TempDir::new().expect("home");
    treesync_cmd(home.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(contains("INPUT_SERVER"));
}

#[test]
fn non_numeric_port_is_rejected() {
    let home = TempDir::new().expect("home");
    treesync_cmd(home.path())
        .args(["plan", "--server", "ftp.example.com", "--port", "twenty-one"])
        .assert()
        .failure()
        .stderr(contains("--port"));
}
