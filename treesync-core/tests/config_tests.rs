//! Profile error-message, atomic-write-safety and listing integration tests.
//! Layout: ~/.treesync/<profile>.yaml

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use std::fs;
use std::path::PathBuf;
use treesync_core::{
    config::{self, ProfileName, SyncConfig, Target},
    CoreError,
};

fn site() -> ProfileName {
    ProfileName::from("site")
}

fn ftp_config() -> SyncConfig {
    let mut config = SyncConfig::new(Target::Ftp {
        server: "ftp.example.org".into(),
        port: 21,
        username: "deploy".into(),
        password: Some("hunter2".into()),
    });
    config.local_dir = PathBuf::from("public");
    config.server_dir = "www/site".into();
    config.exclude = vec!["drafts".into()];
    config
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_profile_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path(), &site()).unwrap_err();
    assert!(matches!(err, CoreError::ProfileNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("profile not found"));
    assert!(err.to_string().contains("site.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".treesync/site.yaml")
        .write_binary(b": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path(), &site()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("site.yaml"), "must contain file path, got: {err}");
}

#[test]
fn load_unknown_target_kind_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".treesync/site.yaml")
        .write_str("target:\n  kind: gopher\n  server: x\n")
        .expect("write");

    let err = config::load_at(home.path(), &site()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_roundtrips() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &site(), &ftp_config()).expect("save");
    let loaded = config::load_at(home.path(), &site()).expect("load");
    assert_eq!(loaded, ftp_config());
}

#[test]
fn save_cleans_up_tmp_file_and_restricts_mode() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &site(), &ftp_config()).expect("save");

    let path = config::profile_path_at(home.path(), &site());
    home.child(".treesync/site.yaml").assert(predicate::path::exists());
    home.child(".treesync/site.yaml.tmp").assert(predicate::path::missing());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("meta")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "expected 0700, got {dir_mode:o}");
    }
}

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &site(), &ftp_config()).expect("save");

    let path = config::profile_path_at(home.path(), &site());
    let original_bytes = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("site.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    let current = config::load_at(home.path(), &site()).expect("load after crash");
    assert_eq!(fs::read(&path).expect("read"), original_bytes);
    assert_eq!(current, ftp_config());
}

// ---------------------------------------------------------------------------
// 3. Listing
// ---------------------------------------------------------------------------

#[test]
fn list_profiles_is_sorted() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let dir_target = SyncConfig::new(Target::Directory {
        root: PathBuf::from("/mnt/share"),
    });
    config::save_at(home.path(), &ProfileName::from("zeta"), &dir_target).expect("zeta");
    config::save_at(home.path(), &ProfileName::from("alpha"), &ftp_config()).expect("alpha");

    let names = config::list_profiles_at(home.path()).expect("list");
    assert_eq!(names, vec![ProfileName::from("alpha"), ProfileName::from("zeta")]);
}

#[test]
fn list_profiles_empty_without_directory() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    assert!(config::list_profiles_at(home.path()).expect("list").is_empty());
}
