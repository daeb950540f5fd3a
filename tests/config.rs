use std::fs;

use assert_matches::assert_matches;

use sodar_sync::config::{ConfigFile, ConfigLoader, ConfigOverrides, GlobalSection};
use sodar_sync::error::SodarError;

#[test]
fn command_line_overrides_file() {
    let file = ConfigFile {
        global: GlobalSection {
            sodar_server_url: Some("https://file.example.com".to_string()),
            sodar_api_token: Some("file-token".to_string()),
            sodar_api_key: Some("legacy".to_string()),
        },
    };
    let config = ConfigLoader::resolve_config(
        file,
        ConfigOverrides {
            verbose: true,
            sodar_server_url: Some("https://cli.example.com/".to_string()),
            sodar_api_token: None,
        },
    )
    .unwrap();
    assert!(config.verbose);
    assert_eq!(config.sodar_server_url, "https://cli.example.com/");
    assert_eq!(config.sodar_api_token, "file-token");
    assert_eq!(config.sodar_api_key.as_deref(), Some("legacy"));
}

#[test]
fn missing_token_is_reported() {
    let err = ConfigLoader::resolve_config(
        ConfigFile::default(),
        ConfigOverrides {
            sodar_server_url: Some("https://x".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_matches!(err, SodarError::MissingConfig(key) if key == "sodar_api_token");
}

#[test]
fn loads_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("sodar-sync.json");
    fs::write(
        &path,
        r#"{"global": {"sodar_server_url": "https://sodar.example.com", "sodar_api_token": "secret"}}"#,
    )
    .unwrap();
    let config = ConfigLoader::resolve(Some(&path), ConfigOverrides::default()).unwrap();
    assert_eq!(config.sodar_server_url, "https://sodar.example.com");
    assert!(!format!("{config:?}").contains("secret"));
}

#[test]
fn explicit_missing_file_fails() {
    let temp = tempfile::tempdir().unwrap();
    let err = ConfigLoader::load(Some(&temp.path().join("absent.json"))).unwrap_err();
    assert_matches!(err, SodarError::ConfigRead(_));
}

#[test]
fn malformed_file_fails() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, "{global").unwrap();
    let err = ConfigLoader::load(Some(&path)).unwrap_err();
    assert_matches!(err, SodarError::ConfigParse(_));
}
