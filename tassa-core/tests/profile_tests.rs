//! Profile error-message, atomic-write-safety, and layout tests.

use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;
use tassa_core::{
    profile::{self, Profile},
    ConfigError,
};

fn sample() -> Profile {
    Profile {
        account_sid: "AC0001".into(),
        auth_token: "token-abcd".into(),
        base_url: Some("http://127.0.0.1:9999".into()),
        timeout_secs: None,
    }
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_profile_mentions_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = profile::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ProfileNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("profile.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".tassa/profile.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = profile::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Profile { .. }), "got: {err}");
    assert!(err.to_string().contains("profile.yaml"));
}

#[test]
fn load_profile_missing_token_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".tassa/profile.yaml")
        .write_str("accountSid: AC1\n")
        .expect("write");

    let err = profile::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Profile { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Save layout and atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_writes_camel_case_yaml() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    profile::save_at(home.path(), &sample()).expect("save");

    let file = home.child(".tassa/profile.yaml");
    file.assert(predicate::path::exists());
    file.assert(predicate::str::contains("accountSid: AC0001"));
    file.assert(predicate::str::contains("baseUrl:"));
    file.assert(predicate::str::contains("timeoutSecs").not());
}

#[test]
fn interrupted_save_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = profile::save_at(home.path(), &sample()).expect("save");
    let original = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("profile.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(fs::read(&path).expect("reread"), original);
    assert_eq!(profile::load_at(home.path()).expect("load"), sample());
}

#[test]
fn resave_replaces_previous_profile() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    profile::save_at(home.path(), &sample()).expect("first save");

    let updated = Profile {
        auth_token: "rotated-0000".into(),
        ..sample()
    };
    profile::save_at(home.path(), &updated).expect("second save");

    let loaded = profile::load_at(home.path()).expect("load");
    assert_eq!(loaded.auth_token, "rotated-0000");
    assert_eq!(loaded.base_url(), "http://127.0.0.1:9999");
}
