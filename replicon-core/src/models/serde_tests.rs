//! Serde tests for configuration and route types.
//!
//! These check the JSON shapes the CLI and config files rely on.

use serde_json::json;

use crate::{HandlerConfig, HttpMethod, RetryConfig, TenantRoute};

// ============================================================================
// HandlerConfig Serde Tests
// ============================================================================

#[test]
fn test_minimal_config_fills_defaults() {
    let config: HandlerConfig = serde_json::from_value(json!({
        "company_key": "acme",
        "authentication_token": "tok"
    }))
    .unwrap();

    assert_eq!(config.method, HttpMethod::Post);
    assert_eq!(config.retry, RetryConfig::default());
    assert_eq!(config.timeout_secs, 30);
    assert_eq!(config.application, "replicon-handler");
    assert!(config.headers.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_config() {
    let config: HandlerConfig = serde_json::from_value(json!({
        "company_key": "acme",
        "username": "admin",
        "password": "hunter2",
        "method": "put",
        "headers": {"X-Custom": "1"},
        "log_file": "/tmp/replicon.log",
        "swimlane": "us1",
        "retry": {"max_attempts": 5, "delay_ms": 10}
    }))
    .unwrap();

    assert_eq!(config.method, HttpMethod::Put);
    assert_eq!(config.headers.get("X-Custom").map(String::as_str), Some("1"));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.delay_ms, 10);
    assert_eq!(config.retry.max_delay_ms, 60_000);
    assert_eq!(config.swimlane.as_deref(), Some("us1"));
}

#[test]
fn test_unknown_option_rejected() {
    let result: Result<HandlerConfig, _> = serde_json::from_value(json!({
        "company_key": "acme",
        "authentication_token": "tok",
        "workers": 4
    }));
    assert!(result.is_err());
}

#[test]
fn test_invalid_method_rejected() {
    let result: Result<HandlerConfig, _> = serde_json::from_value(json!({
        "company_key": "acme",
        "method": "TRACE"
    }));
    assert!(result.is_err());
}

#[test]
fn test_secrets_serialize_verbatim() {
    let config = HandlerConfig::new("acme").with_token("tok");
    let value = serde_json::to_value(&config).unwrap();

    assert_eq!(value["authentication_token"], "tok");
    assert!(value.get("username").is_none());
}

// ============================================================================
// TenantRoute Serde Tests
// ============================================================================

#[test]
fn test_route_serializes_urls_as_strings() {
    let route = TenantRoute::derived("acme", "us1").unwrap();
    let value = serde_json::to_value(&route).unwrap();

    assert_eq!(value["slug"], "acme");
    assert_eq!(value["swimlane"], "us1");
    assert_eq!(value["base_origin"], "https://acme.us1.replicon.com/");
    assert_eq!(value["source_root"], "https://src-acme.us1.replicon.com/");
}
