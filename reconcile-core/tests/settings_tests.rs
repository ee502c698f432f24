//! Settings loading: error messages and file-based round trips.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use reconcile_core::{settings, AccessLevel, SettingsError};

#[test]
fn load_missing_settings_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, SettingsError::SettingsNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("settings not found"));
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child(".reconcile/config.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "must contain path, got: {err}");
}

#[test]
fn unknown_field_is_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child(".reconcile/config.yaml");
    file.write_str("graphql:\n  server: http://gql\n  sever: typo\n")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }), "got: {err}");
}

#[test]
fn unknown_access_level_is_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child(".reconcile/config.yaml");
    file.write_str("permissions:\n  access_level: superuser\n")
        .expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(err.to_string().contains("unknown access level"), "got: {err}");
}

#[test]
fn load_from_explicit_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("custom.yaml");
    file.write_str(
        "graphql:\n  server: http://gql/graphql\npermissions:\n  group: platform\n  access_level: developer\n",
    )
    .expect("write");
    file.assert(predicate::path::exists());

    let loaded = settings::load_from(file.path())
        .expect("load")
        .resolve(|_| None)
        .expect("resolve");
    assert_eq!(loaded.graphql.server, "http://gql/graphql");
    assert_eq!(loaded.permissions.group, "platform");
    assert_eq!(loaded.permissions.access_level, AccessLevel::Developer);
}
