//! Config layering as seen by the binary

use config::Map;
use metabase_git_sync::config::{ConfigLoader, ValidationError};
use std::path::PathBuf;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> Map<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_environment_alone_is_enough_to_run() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("empty.toml");
    std::fs::write(&file, "").unwrap();

    let config = ConfigLoader::load_with_env(
        temp.path(),
        Some(file.as_path()),
        &env(&[
            ("METABASE_URL", "https://metabase.example.com"),
            ("METABASE_USER", "analyst@example.com"),
            ("METABASE_PASSWORD", "secret"),
        ]),
    )
    .unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.repo.path, PathBuf::from("repo"));
}

#[test]
fn test_missing_credentials_fail_validation() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("partial.toml");
    std::fs::write(&file, "[metabase]\nurl = \"https://metabase.example.com\"\n").unwrap();

    let config = ConfigLoader::load_with_env(temp.path(), Some(file.as_path()), &env(&[])).unwrap();
    let errors = config.validate().unwrap_err();

    let fields: Vec<String> = errors
        .iter()
        .filter_map(|e| match e {
            ValidationError::Metabase(field, _) => Some(field.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(fields, vec!["user".to_string(), "password".to_string()]);
}

#[test]
fn test_logging_section_is_loaded() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("sync.toml");
    std::fs::write(
        &file,
        "[logging]\nlevel = \"debug\"\nformat = \"json\"\n\n[logging.modules]\n\"metabase_git_sync::client\" = \"trace\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load_with_env(temp.path(), Some(file.as_path()), &env(&[])).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(
        config.logging.modules.get("metabase_git_sync::client"),
        Some(&"trace".to_string())
    );
}
