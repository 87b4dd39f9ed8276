//! Integration tests for loading and saving handler configuration.

use replicon_core::{HandlerConfig, HttpMethod, RetryConfig};

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = HandlerConfig::new("acme")
        .with_basic_auth("admin", "hunter2")
        .with_method(HttpMethod::Get)
        .with_header("X-Trace", "on")
        .with_retry(RetryConfig::immediate(4));
    config.save_to(&path).unwrap();

    let loaded = HandlerConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = HandlerConfig::load_from(&dir.path().join("absent.json"));
    assert!(result.is_err());
}

#[test]
fn test_load_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"company_key": "acme"}"#).unwrap();

    let err = HandlerConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("no credentials"));
}

#[test]
fn test_default_path_ends_with_config_json() {
    let path = HandlerConfig::default_path();
    assert!(path.ends_with("replicon/config.json"));
}
