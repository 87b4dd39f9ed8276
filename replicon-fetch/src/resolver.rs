//! Tenant resolution.
//!
//! The route is resolved lazily on first use and cached for the lifetime
//! of the resolver. Concurrent callers arriving while resolution is in
//! flight wait for it instead of issuing their own discovery call. A failed
//! resolution is not cached; the next call tries again.

use replicon_core::{HttpMethod, OperationUrl, TenantRoute};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::{NotResolvedError, ResolutionError};
use crate::transport::PreparedRequest;

// ============================================================================
// Discovery Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DiscoveryEnvelope {
    d: Option<TenantEndpointDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantEndpointDetails {
    application_root_url: String,
    #[serde(default)]
    application_root_urls: Vec<ApplicationRootUrl>,
    tenant: TenantDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationRootUrl {
    root_url: String,
}

#[derive(Debug, Deserialize)]
struct TenantDetails {
    slug: String,
}

// ============================================================================
// Route Source
// ============================================================================

/// Where a resolver gets its route from.
#[derive(Debug, Clone)]
pub enum RouteSource {
    /// Ask the discovery service.
    Discovery(OperationUrl),
    /// Derive from the company key and a known swimlane, without I/O.
    Swimlane(String),
}

// ============================================================================
// Tenant Resolver
// ============================================================================

/// Resolves and caches the [`TenantRoute`] of one company.
#[derive(Debug)]
pub struct TenantResolver {
    company_key: String,
    source: RouteSource,
    dispatcher: Dispatcher,
    route: OnceCell<TenantRoute>,
}

impl TenantResolver {
    /// Creates an unresolved resolver.
    pub fn new(company_key: impl Into<String>, source: RouteSource, dispatcher: Dispatcher) -> Self {
        Self {
            company_key: company_key.into(),
            source,
            dispatcher,
            route: OnceCell::new(),
        }
    }

    /// Returns the company key.
    pub fn company_key(&self) -> &str {
        &self.company_key
    }

    /// Returns true once a route has been cached.
    pub fn is_resolved(&self) -> bool {
        self.route.initialized()
    }

    /// Resolves the route, or returns the cached one.
    pub async fn resolve(&self) -> Result<&TenantRoute, ResolutionError> {
        self.route.get_or_try_init(|| self.lookup()).await
    }

    /// Returns the cached route without resolving.
    pub fn route(&self) -> Result<&TenantRoute, NotResolvedError> {
        self.route.get().ok_or_else(|| NotResolvedError {
            company_key: self.company_key.clone(),
        })
    }

    #[instrument(skip(self), fields(company_key = %self.company_key))]
    async fn lookup(&self) -> Result<TenantRoute, ResolutionError> {
        let route = match &self.source {
            RouteSource::Swimlane(swimlane) => TenantRoute::derived(&self.company_key, swimlane)?,
            RouteSource::Discovery(url) => self.discover(url).await?,
        };

        info!(
            slug = %route.slug,
            swimlane = %route.swimlane,
            origin = %route.base_origin,
            "Tenant route resolved"
        );
        Ok(route)
    }

    async fn discover(&self, url: &OperationUrl) -> Result<TenantRoute, ResolutionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let request = PreparedRequest::new(HttpMethod::Post, url.clone())
            .with_headers(headers)
            .with_payload(json!({ "tenant": { "companyKey": self.company_key } }));

        let response = self.dispatcher.call(&request).await?;

        if let Some(app_error) = response.error() {
            error!(error = %app_error, "Discovery rejected company key");
            return Err(ResolutionError::UnknownCompanyKey(self.company_key.clone()));
        }
        if !response.is_success() {
            return Err(ResolutionError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let envelope: DiscoveryEnvelope = response
            .json()
            .map_err(|e| ResolutionError::InvalidResponse(e.to_string()))?;
        let details = envelope
            .d
            .ok_or_else(|| ResolutionError::UnknownCompanyKey(self.company_key.clone()))?;

        let polaris_root = details
            .application_root_urls
            .first()
            .map(|root| root.root_url.as_str())
            .ok_or_else(|| {
                ResolutionError::InvalidResponse("no applicationRootUrls returned".to_string())
            })?;

        Ok(TenantRoute::discovered(
            &details.tenant.slug,
            &details.application_root_url,
            polaris_root,
        )?)
    }
}

// ============================================================================
// Tests
// ============================================================================
