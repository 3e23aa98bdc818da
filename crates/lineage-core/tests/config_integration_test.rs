use lineage_core::{ConfigError, ConfigManager, LineageConfig, LineageDirection};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_config_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&config_path).unwrap();
    assert!(config_path.exists());

    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("[catalog]"));
    assert!(!written.contains("password"));

    let manager = ConfigManager::load_from(&config_path).unwrap();
    assert_eq!(manager.config_path(), Some(config_path.as_path()));
    assert_eq!(manager.config().catalog.page_size, 500);
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lineage.toml");
    fs::write(
        &config_path,
        r#"
[catalog]
base_url = "https://catalog.example.com/access"
username = "reader"
password = "s3cret"
max_retries = 1

[traversal]
max_depth = 5
default_direction = "both"
"#,
    )
    .unwrap();

    let manager = ConfigManager::load_from(&config_path).unwrap();
    let config = manager.config();
    assert_eq!(config.catalog.username.as_deref(), Some("reader"));
    assert!(config.catalog.password.is_some());
    assert_eq!(config.catalog.max_retries, 1);
    assert_eq!(config.catalog.api_version, "2");
    assert_eq!(config.traversal.max_depth, 5);
    assert_eq!(config.traversal.max_total_nodes, 10_000);
    assert_eq!(config.traversal.default_direction, LineageDirection::Both);
}

#[test]
fn test_missing_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigManager::load_from(&temp_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "[catalog\nbase_url = 3").unwrap();

    let result = ConfigManager::load_from(&config_path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_invalid_values_fail_validation() {
    let mut config = LineageConfig::default();
    config.catalog.page_size = 0;
    assert!(matches!(
        ConfigManager::validate_config(&config),
        Err(ConfigError::ValidationError(_))
    ));
}
