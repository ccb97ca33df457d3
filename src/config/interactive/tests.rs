use super::load_existing_config as load_existing_config_impl;
use super::*;
use tempfile::TempDir;

#[test]
fn load_existing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(!config.embedding.model.is_empty());
    assert!(config.embedding.batch_size > 0);
    assert!(config.retrieval.top_k > 0);
}

#[test]
fn broken_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[api\n").expect("should write file");

    let config = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(config.api, ApiConfig::default());
}

#[test]
fn unreachable_endpoint_is_reported() {
    let api = ApiConfig {
        base_url: "http://127.0.0.1:1/v1".to_string(),
        ..ApiConfig::default()
    };
    assert!(!test_api_connection(&api));
}
