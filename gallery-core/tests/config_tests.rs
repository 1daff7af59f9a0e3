//! Config file loading from a home directory.

use assert_fs::prelude::*;
use gallery_core::{config, ConfigError, StoreConfig};
use predicates::prelude::predicate;

#[test]
fn load_missing_config_returns_not_found_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".gallery/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_unknown_backend_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".gallery/config.yaml")
        .write_str("store:\n  backend: s3\n  bucket: photos\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn load_local_config_from_home() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let site = home.child("site");
    site.create_dir_all().expect("mkdir");
    home.child(".gallery/config.yaml")
        .write_str(&format!(
            "store:\n  backend: local\n  root: {}\nfeed:\n  chat_id: -100123\n",
            site.path().display()
        ))
        .expect("write");

    let cfg = config::load_at(home.path()).expect("load");
    assert_eq!(cfg.feed.chat_id, Some(-100123));
    match cfg.store {
        StoreConfig::Local(local) => assert_eq!(local.root, site.path()),
        other => panic!("expected local store, got {other:?}"),
    }

    assert_eq!(
        config::config_path_at(home.path()),
        home.child(".gallery/config.yaml").path()
    );
    home.child(".gallery/config.yaml")
        .assert(predicate::path::is_file());
}
