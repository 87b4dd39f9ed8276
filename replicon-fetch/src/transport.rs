//! HTTP transport.
//!
//! The dispatcher talks to the network only through the [`Transport`]
//! trait. [`ReqwestTransport`] is the production implementation; tests swap
//! in mocks to script connection failures and latencies.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use replicon_core::{ApiResponse, HttpMethod, OperationUrl};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::HttpError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for the handler.
const USER_AGENT: &str = concat!("replicon-handler/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Prepared Request
// ============================================================================

/// A request ready to be sent, possibly several times.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Target URL.
    pub url: OperationUrl,
    /// Headers, including authorization.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub payload: Option<Value>,
}

impl PreparedRequest {
    /// Creates a request without headers or body.
    pub fn new(method: HttpMethod, url: OperationUrl) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            payload: None,
        }
    }

    /// Sets the JSON body.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replaces the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds one header from string parts.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, HttpError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// Validates a header name/value pair.
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HttpError> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| HttpError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends one HTTP request and returns whatever the server answered.
///
/// Implementations return `Ok` for every HTTP status and `Err` only when no
/// response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single attempt.
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse, HttpError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { inner: client })
    }

    /// Wraps an existing client, keeping its timeout and redirect policy.
    pub fn from_client(client: Client) -> Self {
        Self { inner: client }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse, HttpError> {
        let mut builder = self
            .inner
            .request(to_method(request.method), request.url.as_url().clone())
            .headers(request.headers.clone());
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        debug!(status, "Response received");

        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
            attempts: 1,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn url(server: &MockServer, path: &str) -> OperationUrl {
        OperationUrl::parse(&server.url(path)).unwrap()
    }

    #[tokio::test]
    async fn test_post_json_with_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/services/UserService1.svc/GetAllUsers")
                .header("x-replicon-application", "acme_test_1")
                .json_body(json!({"userUri": "urn:replicon-tenant:acme:user:2"}));
            then.status(200)
                .header("x-execution-correlation-id", "corr-1")
                .json_body(json!({"d": []}));
        });

        let request = PreparedRequest::new(
            HttpMethod::Post,
            url(&server, "/services/UserService1.svc/GetAllUsers"),
        )
        .with_header("X-Replicon-Application", "acme_test_1")
        .unwrap()
        .with_payload(json!({"userUri": "urn:replicon-tenant:acme:user:2"}));

        let transport = ReqwestTransport::new().unwrap();
        let response = transport.send(&request).await.unwrap();

        mock.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.correlation_id(), Some("corr-1"));
        assert_eq!(response.value().unwrap(), json!({"d": []}));
    }

    #[tokio::test]
    async fn test_server_error_is_a_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/fail");
            then.status(500)
                .json_body(json!({"error": {"reason": "Internal"}}));
        });

        let request = PreparedRequest::new(HttpMethod::Post, url(&server, "/fail"))
            .with_payload(json!({}));
        let response = ReqwestTransport::new().unwrap().send(&request).await.unwrap();

        assert_eq!(mock.calls(), 1);
        assert_eq!(response.status, 500);
        assert_eq!(response.error(), Some(json!({"reason": "Internal"})));
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        // Bind then drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = OperationUrl::parse(&format!("http://127.0.0.1:{port}/x")).unwrap();
        let request = PreparedRequest::new(HttpMethod::Get, target);

        let err = ReqwestTransport::new()
            .unwrap()
            .send(&request)
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_redirect_policy_failure_not_retryable() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/moved");
            then.status(302).header("location", server.url("/moved"));
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(0))
            .build()
            .unwrap();
        let request = PreparedRequest::new(HttpMethod::Post, url(&server, "/moved"))
            .with_payload(json!({}));

        let err = ReqwestTransport::from_client(client)
            .send(&request)
            .await
            .unwrap_err();

        assert_eq!(mock.calls(), 1);
        assert!(matches!(err, HttpError::InvalidRequest(_)), "unexpected error: {err:?}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let request = PreparedRequest::new(
            HttpMethod::Get,
            OperationUrl::parse("https://acme.us1.replicon.com/").unwrap(),
        );
        assert!(matches!(
            request.with_header("bad header", "v"),
            Err(HttpError::InvalidHeader { .. })
        ));
    }
}
