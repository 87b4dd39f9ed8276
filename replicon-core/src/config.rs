//! Handler configuration.
//!
//! Every option the handler recognizes lives on [`HandlerConfig`], with its
//! default spelled out next to it. Configuration is validated once, when a
//! handler is constructed, and is immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Tenant discovery endpoint used when no override is configured.
pub const DEFAULT_DISCOVERY_URL: &str =
    "https://global.replicon.com/DiscoveryService1.svc/GetTenantEndpointDetails";

/// Integration name used in the `X-Replicon-Application` header.
pub const DEFAULT_APPLICATION: &str = "replicon-handler";

// ============================================================================
// Secret
// ============================================================================

/// A credential string that never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a credential value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw credential value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// The authentication scheme a handler sends with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`.
    Bearer(Secret),
    /// HTTP basic auth with a company-qualified user principal.
    Basic {
        /// Tenant user name (without the company prefix).
        username: String,
        /// Tenant password.
        password: Secret,
    },
}

impl Credentials {
    /// Returns a short label for logs.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::Basic { .. } => "basic",
        }
    }
}

// ============================================================================
// HTTP Method
// ============================================================================

/// HTTP verb used for Web Service requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST (every Gen3 Web Service operation uses this)
    #[default]
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Returns the canonical upper-case verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            other => Err(CoreError::config(format!("unsupported HTTP method: {other}"))),
        }
    }
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry settings for connection-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before each retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    /// Double the delay on every retry.
    #[serde(default)]
    pub exponential_backoff: bool,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    20_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
            exponential_backoff: false,
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Retry settings with no delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay_ms: 0,
            exponential_backoff: false,
            max_delay_ms: 0,
        }
    }

    /// Returns the base delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Returns the delay cap as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

// ============================================================================
// Handler Config
// ============================================================================

/// Construction-time configuration for a Replicon handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    /// Replicon company key identifying the tenant.
    pub company_key: String,
    /// Tenant user name for basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Tenant password for basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    /// API token; takes precedence over username/password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_token: Option<Secret>,
    /// Default HTTP verb.
    #[serde(default)]
    pub method: HttpMethod,
    /// Extra headers merged into every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// File receiving diagnostic logs.
    ///
    /// The handler only emits `tracing` events; the embedding application
    /// installs the subscriber that writes them here (the `replicon` CLI
    /// does).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Integration name reported in `X-Replicon-Application`.
    #[serde(default = "default_application")]
    pub application: String,
    /// Fixed swimlane; skips tenant discovery when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swimlane: Option<String>,
    /// Tenant discovery endpoint.
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    /// Retry policy for connection failures.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_application() -> String {
    DEFAULT_APPLICATION.to_string()
}

fn default_discovery_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl HandlerConfig {
    /// Creates a configuration for `company_key` with every other option at
    /// its default.
    pub fn new(company_key: impl Into<String>) -> Self {
        Self {
            company_key: company_key.into(),
            username: None,
            password: None,
            authentication_token: None,
            method: HttpMethod::default(),
            headers: BTreeMap::new(),
            log_file: None,
            application: default_application(),
            swimlane: None,
            discovery_url: default_discovery_url(),
            retry: RetryConfig::default(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Sets the API token.
    pub fn with_token(mut self, token: impl Into<Secret>) -> Self {
        self.authentication_token = Some(token.into());
        self
    }

    /// Sets basic-auth credentials.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the default HTTP verb.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds a header merged into every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets a fixed swimlane, bypassing discovery.
    pub fn with_swimlane(mut self, swimlane: impl Into<String>) -> Self {
        self.swimlane = Some(swimlane.into());
        self
    }

    /// Overrides the discovery endpoint.
    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the diagnostic log file.
    ///
    /// Has no effect unless the application installs a subscriber that
    /// honors it; see [`HandlerConfig::log_file`].
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Value for the `X-Replicon-Application` header.
    pub fn application_header(&self) -> String {
        format!(
            "{}_{}_{}",
            self.company_key,
            self.application,
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Selects the active credential scheme.
    ///
    /// A token wins over username/password when both are present. A user
    /// name without a password (or the reverse) is rejected, as is a
    /// configuration with no credentials at all.
    pub fn credentials(&self) -> Result<Credentials, CoreError> {
        if let Some(token) = &self.authentication_token {
            if token.is_blank() {
                return Err(CoreError::config("authentication_token is empty"));
            }
            return Ok(Credentials::Bearer(token.clone()));
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.trim().is_empty() => {
                Ok(Credentials::Basic {
                    username: username.clone(),
                    password: password.clone(),
                })
            }
            (Some(_), Some(_)) => Err(CoreError::config("username is empty")),
            (Some(_), None) => Err(CoreError::config("username given without a password")),
            (None, Some(_)) => Err(CoreError::config("password given without a username")),
            (None, None) => Err(CoreError::config(
                "no credentials: set authentication_token or username/password",
            )),
        }
    }

    /// Checks every option, returning the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.company_key.trim().is_empty() {
            return Err(CoreError::config("company_key is required"));
        }
        if !self
            .company_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::config(format!(
                "company_key contains invalid characters: {:?}",
                self.company_key
            )));
        }
        self.credentials()?;

        if self.application.trim().is_empty() {
            return Err(CoreError::config("application is empty"));
        }
        if let Some(swimlane) = &self.swimlane {
            let valid = !swimlane.is_empty()
                && swimlane
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(CoreError::config(format!("invalid swimlane: {swimlane:?}")));
            }
        }
        url::Url::parse(&self.discovery_url)?;

        if self.retry.max_attempts == 0 {
            return Err(CoreError::config("retry.max_attempts must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::config("timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("replicon")
            .join("config.json")
    }

    /// Parses configuration from a JSON file without validating it.
    pub fn read_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads and validates configuration from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let config = Self::read_from(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_takes_precedence() {
        let config = HandlerConfig::new("acme")
            .with_basic_auth("admin", "hunter2")
            .with_token("tok");

        assert_eq!(
            config.credentials().unwrap(),
            Credentials::Bearer(Secret::new("tok"))
        );
    }

    #[test]
    fn test_basic_credentials() {
        let config = HandlerConfig::new("acme").with_basic_auth("admin", "hunter2");
        let creds = config.credentials().unwrap();

        assert_eq!(creds.scheme(), "basic");
        match creds {
            Credentials::Basic { username, password } => {
                assert_eq!(username, "admin");
                assert_eq!(password.expose(), "hunter2");
            }
            Credentials::Bearer(_) => panic!("expected basic credentials"),
        }
    }

    #[test]
    fn test_incomplete_credentials_rejected() {
        let mut config = HandlerConfig::new("acme");
        assert!(config.credentials().is_err());

        config.username = Some("admin".to_string());
        assert!(config.credentials().is_err());

        config.username = None;
        config.password = Some(Secret::new("hunter2"));
        assert!(config.credentials().is_err());

        let blank = HandlerConfig::new("acme").with_token("  ");
        assert!(blank.credentials().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(HandlerConfig::new("acme").with_token("t").validate().is_ok());
        assert!(HandlerConfig::new("").with_token("t").validate().is_err());
        assert!(HandlerConfig::new("ac me").with_token("t").validate().is_err());
        assert!(HandlerConfig::new("acme_corp-2").with_token("t").validate().is_ok());
        for key in ["acme@evil.com#", "acme.evil", "acme:8443", "acme?x", "acme/x"] {
            assert!(
                HandlerConfig::new(key).with_token("t").validate().is_err(),
                "accepted company key {key:?}"
            );
        }
        assert!(
            HandlerConfig::new("acme")
                .with_token("t")
                .with_swimlane("us1.evil")
                .validate()
                .is_err()
        );
        assert!(
            HandlerConfig::new("acme")
                .with_token("t")
                .with_retry(RetryConfig::immediate(0))
                .validate()
                .is_err()
        );
        assert!(
            HandlerConfig::new("acme")
                .with_token("t")
                .with_discovery_url("not a url")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = HandlerConfig::new("acme")
            .with_basic_auth("admin", "hunter2")
            .with_token("sekrit-token");
        let debug = format!("{config:?}");

        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("sekrit-token"));
        assert!(debug.contains("admin"));
    }

    #[test]
    fn test_application_header() {
        let config = HandlerConfig::new("acme");
        assert_eq!(
            config.application_header(),
            format!("acme_replicon-handler_{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("POST".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::default(), HttpMethod::Post);
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.delay(), Duration::from_secs(20));
        assert!(!retry.exponential_backoff);
    }
}
