//! Integration tests for TOML configuration loading and root folder resolution

use pron_common::config::{
    load_or_default, load_toml_config, resolve_root_folder, write_toml_config, TomlConfig,
};
use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_write_then_load_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("config.toml");

    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/srv/pron"));
    config.speech.region = Some("westeurope".to_string());
    config.assessment.mispronunciation_threshold = 72.5;
    config.assessment.history_limit = 5;

    write_toml_config(&config, &toml_path).unwrap();
    let loaded = load_toml_config(&toml_path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_load_rejects_invalid_values() {
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &toml_path,
        "[assessment]\nmispronunciation_threshold = -5.0\n",
    )
    .unwrap();

    let result = load_toml_config(&toml_path);
    assert!(result.is_err(), "Negative threshold must be rejected");
}

#[test]
fn test_load_rejects_malformed_toml() {
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("config.toml");
    std::fs::write(&toml_path, "[speech\nregion = ").unwrap();

    assert!(load_toml_config(&toml_path).is_err());
}

#[test]
fn test_explicit_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");
    assert!(load_or_default(Some(&missing)).is_err());
}

#[test]
#[serial]
fn test_env_var_beats_toml_root_folder() {
    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/from/toml"));

    std::env::set_var("PRON_TEST_ROOT_FOLDER", "/from/env");
    let resolved = resolve_root_folder(None, "PRON_TEST_ROOT_FOLDER", &config);
    std::env::remove_var("PRON_TEST_ROOT_FOLDER");

    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/from/toml"));

    std::env::set_var("PRON_TEST_ROOT_FOLDER", "   ");
    let resolved = resolve_root_folder(None, "PRON_TEST_ROOT_FOLDER", &config);
    std::env::remove_var("PRON_TEST_ROOT_FOLDER");

    assert_eq!(resolved, Path::new("/from/toml"));
}
