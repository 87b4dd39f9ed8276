//! The handler facade.
//!
//! A [`RepliconHandler`] owns one validated [`HandlerConfig`], the tenant
//! resolver, and the dispatcher. Its lifecycle is: construct, resolve the
//! tenant route lazily (or explicitly via [`RepliconHandler::resolve`]),
//! then build URLs and dispatch calls against the cached route.
//!
//! URL builders are synchronous and fail with [`NotResolvedError`] until
//! the route is resolved. [`RepliconHandler::call_web_service`] resolves
//! implicitly.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use replicon_core::{
    ApiResponse, Credentials, HandlerConfig, HttpMethod, OperationUrl, TenantRoute,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::{
    BatchError, HandlerError, HttpError, NotResolvedError, ResolutionError, TransportError,
};
use crate::resolver::{RouteSource, TenantResolver};
use crate::retry::RetryStrategy;
use crate::transport::{PreparedRequest, ReqwestTransport, Transport, parse_header};

/// Header identifying the integration to Replicon.
pub const APPLICATION_HEADER: &str = "x-replicon-application";

// ============================================================================
// Replicon Handler
// ============================================================================

/// Client for one Replicon tenant.
///
/// The handler logs through `tracing` but installs no subscriber, so
/// [`HandlerConfig::log_file`] is honored only by applications that set one
/// up from it.
pub struct RepliconHandler {
    config: HandlerConfig,
    credentials: Credentials,
    headers: HeaderMap,
    dispatcher: Dispatcher,
    resolver: TenantResolver,
}

impl RepliconHandler {
    /// Creates a handler with the default reqwest transport.
    pub fn new(config: HandlerConfig) -> Result<Self, HandlerError> {
        Self::builder(config).build()
    }

    /// Creates a builder for customizing the handler.
    pub fn builder(config: HandlerConfig) -> RepliconHandlerBuilder {
        RepliconHandlerBuilder::new(config)
    }

    /// Returns the configuration the handler was built with.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Returns the active credential scheme.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the headers sent with every Web Service request.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ------------------------------------------------------------------------
    // Tenant routing
    // ------------------------------------------------------------------------

    /// Resolves the tenant route, or returns the cached one.
    pub async fn resolve(&self) -> Result<&TenantRoute, ResolutionError> {
        self.resolver.resolve().await
    }

    /// Returns the cached route without resolving.
    pub fn route(&self) -> Result<&TenantRoute, NotResolvedError> {
        self.resolver.route()
    }

    /// URL of a named Web Service operation.
    pub fn web_service(&self, service: &str, operation: &str) -> Result<OperationUrl, HandlerError> {
        Ok(self.route()?.web_service(service, operation)?)
    }

    /// URL of a Web Service operation on the source swimlane.
    pub fn source_web_service(
        &self,
        service: &str,
        operation: &str,
    ) -> Result<OperationUrl, HandlerError> {
        Ok(self.route()?.source_web_service(service, operation)?)
    }

    /// URL of the analytics API.
    pub fn analytics_url(&self) -> Result<OperationUrl, HandlerError> {
        Ok(self.route()?.analytics_url()?)
    }

    /// URL of the audit-log API.
    pub fn audit_log_url(&self) -> Result<OperationUrl, HandlerError> {
        Ok(self.route()?.audit_log_url()?)
    }

    /// URL of the Polaris GraphQL endpoint.
    pub fn polaris_graphql_url(&self) -> Result<OperationUrl, HandlerError> {
        Ok(self.route()?.polaris_graphql_url()?)
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Builds a request carrying the handler's headers.
    ///
    /// A `Value::Null` payload sends no body.
    pub fn prepare(&self, url: &OperationUrl, payload: Value, method: HttpMethod) -> PreparedRequest {
        let request = PreparedRequest::new(method, url.clone()).with_headers(self.headers.clone());
        if payload.is_null() {
            request
        } else {
            request.with_payload(payload)
        }
    }

    /// Sends one payload with the default method.
    pub async fn call(&self, url: &OperationUrl, payload: Value) -> Result<ApiResponse, TransportError> {
        self.call_with_method(url, payload, self.config.method).await
    }

    /// Sends one payload with an explicit method.
    pub async fn call_with_method(
        &self,
        url: &OperationUrl,
        payload: Value,
        method: HttpMethod,
    ) -> Result<ApiResponse, TransportError> {
        self.dispatcher.call(&self.prepare(url, payload, method)).await
    }

    /// Resolves the tenant if needed, then calls a Web Service operation.
    #[instrument(skip(self, payload))]
    pub async fn call_web_service(
        &self,
        service: &str,
        operation: &str,
        payload: Value,
    ) -> Result<ApiResponse, HandlerError> {
        let url = self.resolve().await?.web_service(service, operation)?;
        Ok(self.call(&url, payload).await?)
    }

    /// Sends every payload to `url` in order, stopping at the first failure.
    pub async fn sequential_batch(
        &self,
        url: &OperationUrl,
        payloads: Vec<Value>,
    ) -> Result<Vec<ApiResponse>, BatchError> {
        let requests = self.prepare_all(url, payloads);
        self.dispatcher.sequential_batch(requests).await
    }

    /// Sends payloads to `url` with at most `concurrency` calls in flight.
    ///
    /// Results are in payload order; the first failing entry aborts the
    /// batch.
    pub async fn concurrent_batch(
        &self,
        url: &OperationUrl,
        payloads: Vec<Value>,
        concurrency: usize,
    ) -> Result<Vec<ApiResponse>, BatchError> {
        let requests = self.prepare_all(url, payloads);
        self.dispatcher.concurrent_batch(requests, concurrency).await
    }

    fn prepare_all(&self, url: &OperationUrl, payloads: Vec<Value>) -> Vec<PreparedRequest> {
        payloads
            .into_iter()
            .map(|payload| self.prepare(url, payload, self.config.method))
            .collect()
    }
}

impl std::fmt::Debug for RepliconHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepliconHandler")
            .field("company_key", &self.config.company_key)
            .field("auth", &self.credentials.scheme())
            .field("resolved", &self.resolver.is_resolved())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Replicon Handler Builder
// ============================================================================

/// Builder for constructing a [`RepliconHandler`].
pub struct RepliconHandlerBuilder {
    config: HandlerConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl RepliconHandlerBuilder {
    /// Creates a builder from a configuration.
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Sets the transport used for every request.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the configuration and builds the handler.
    pub fn build(self) -> Result<RepliconHandler, HandlerError> {
        let config = self.config;
        config.validate()?;
        let credentials = config.credentials()?;
        let headers = default_headers(&config, &credentials)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_timeout(config.timeout())?),
        };
        let dispatcher = Dispatcher::new(transport, RetryStrategy::from(&config.retry));

        let source = match &config.swimlane {
            Some(swimlane) => RouteSource::Swimlane(swimlane.clone()),
            None => RouteSource::Discovery(OperationUrl::parse(&config.discovery_url)?),
        };
        let resolver = TenantResolver::new(config.company_key.clone(), source, dispatcher.clone());

        debug!(
            company_key = %config.company_key,
            auth = credentials.scheme(),
            method = %config.method,
            "Handler created"
        );

        Ok(RepliconHandler {
            config,
            credentials,
            headers,
            dispatcher,
            resolver,
        })
    }
}

/// Builds the per-request headers: JSON content type, application
/// identification, authorization, then user-supplied overrides.
fn default_headers(config: &HandlerConfig, credentials: &Credentials) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let (name, application) = parse_header(APPLICATION_HEADER, &config.application_header())?;
    headers.insert(name, application);

    let authorization = match credentials {
        Credentials::Bearer(token) => format!("Bearer {}", token.expose()),
        Credentials::Basic { username, password } => {
            let principal = format!("{}\\{}:{}", config.company_key, username, password.expose());
            format!("Basic {}", STANDARD.encode(principal))
        }
    };
    let (_, mut authorization) = parse_header(AUTHORIZATION.as_str(), &authorization)?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);

    for (name, value) in &config.headers {
        let (name, value) = parse_header(name, value)?;
        headers.insert(name, value);
    }

    Ok(headers)
}

// ============================================================================
// Tests
// ============================================================================
