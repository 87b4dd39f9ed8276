//! CLI command implementations.

pub mod batch;
pub mod call;
pub mod config;
pub mod resolve;
pub mod url;

use std::path::Path;

use anyhow::{Context, Result};
use replicon_core::{HandlerConfig, OperationUrl};
use replicon_fetch::RepliconHandler;
use serde_json::Value;

use crate::Cli;

/// Loads the config file and applies command-line overrides.
///
/// An explicit `--config` must exist; the default path is optional when
/// `--company-key` is given.
pub fn load_config(cli: &Cli) -> Result<HandlerConfig> {
    let path = cli.config.clone().unwrap_or_else(HandlerConfig::default_path);

    let mut config = if cli.config.is_some() || path.exists() {
        HandlerConfig::read_from(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?
    } else {
        let company_key = cli.company_key.clone().with_context(|| {
            format!(
                "no config at {}; pass --company-key or run `replicon config init`",
                path.display()
            )
        })?;
        HandlerConfig::new(company_key)
    };

    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut HandlerConfig, cli: &Cli) {
    if let Some(company_key) = &cli.company_key {
        config.company_key.clone_from(company_key);
    }
    if let Some(token) = &cli.token {
        config.authentication_token = Some(token.as_str().into());
    }
    if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
        config.username = Some(username.clone());
        config.password = Some(password.as_str().into());
    }
    if let Some(swimlane) = &cli.swimlane {
        config.swimlane = Some(swimlane.clone());
    }
    if let Some(log_file) = &cli.log_file {
        config.log_file = Some(log_file.clone());
    }
}

/// Validates the configuration and builds a handler.
pub fn build_handler(config: HandlerConfig) -> Result<RepliconHandler> {
    RepliconHandler::new(config).context("invalid configuration")
}

/// Resolves the tenant and returns the URL of a Web Service operation.
pub async fn operation_url(
    handler: &RepliconHandler,
    service: &str,
    operation: &str,
    source: bool,
) -> Result<OperationUrl> {
    handler.resolve().await?;
    let url = if source {
        handler.source_web_service(service, operation)?
    } else {
        handler.web_service(service, operation)?
    };
    Ok(url)
}

/// Reads a JSON document from a file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("replicon").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        HandlerConfig::new("FromFile")
            .with_basic_auth("admin", "pw")
            .save_to(&path)
            .unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--company-key",
            "Acme",
            "--token",
            "tok",
            "--swimlane",
            "us1",
            "resolve",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.company_key, "Acme");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.authentication_token.as_ref().unwrap().expose(), "tok");
        assert_eq!(config.swimlane.as_deref(), Some("us1"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let cli = parse(&["--config", path.to_str().unwrap(), "resolve"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_build_handler_requires_credentials() {
        let err = build_handler(HandlerConfig::new("Acme")).unwrap_err();
        assert!(format!("{err:#}").contains("invalid configuration"));

        assert!(build_handler(HandlerConfig::new("Acme").with_token("tok")).is_ok());
    }

    #[test]
    fn test_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payloads.json");
        std::fs::write(&path, r#"[{"id": 1}, {"id": 2}]"#).unwrap();

        let value = read_json(&path).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));

        std::fs::write(&path, "not json").unwrap();
        assert!(read_json(&path).is_err());
    }
}
