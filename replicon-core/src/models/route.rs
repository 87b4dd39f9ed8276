//! Tenant routing types.
//!
//! A [`TenantRoute`] is computed once per handler, either from a discovery
//! response or from a fixed swimlane, and every request URL is built from it.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

/// Host suffix for algorithmically derived tenant origins.
const REPLICON_DOMAIN: &str = "replicon.com";

/// Path segment under a discovered application root that hosts Web Services.
const SERVICES_SEGMENT: &str = "services";

/// Host prefix of the source-swimlane variant of a tenant origin.
const SOURCE_HOST_PREFIX: &str = "src-";

// ============================================================================
// Operation URL
// ============================================================================

/// A fully qualified request target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationUrl(Url);

impl OperationUrl {
    /// Parses an arbitrary absolute URL.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        Ok(Self(Url::parse(input)?))
    }

    /// Returns the URL as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying [`Url`].
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for OperationUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<Url> for OperationUrl {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl From<OperationUrl> for Url {
    fn from(url: OperationUrl) -> Self {
        url.0
    }
}

// ============================================================================
// Tenant Route
// ============================================================================

/// Routing information for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRoute {
    /// Short tenant identifier.
    pub slug: String,
    /// Deployment/region identifier.
    pub swimlane: String,
    /// Tenant application root; auxiliary APIs hang off it.
    pub base_origin: Url,
    /// Root under which `{service}/{operation}` paths are resolved.
    pub service_root: Url,
    /// Source-swimlane variant of `service_root`.
    pub source_root: Url,
    /// Root of the Polaris application (GraphQL).
    pub polaris_root: Url,
}

impl TenantRoute {
    /// Derives a route from slug and swimlane alone.
    ///
    /// The origin is `https://{slug}.{swimlane}.replicon.com/` and Web
    /// Service paths sit directly under it.
    pub fn derived(slug: &str, swimlane: &str) -> Result<Self, CoreError> {
        let slug = slug.trim().to_ascii_lowercase();
        let swimlane = swimlane.trim().to_ascii_lowercase();
        if !is_host_label(&slug) || !is_host_label(&swimlane) {
            return Err(CoreError::InvalidData(format!(
                "slug {slug:?} and swimlane {swimlane:?} must be non-empty host labels"
            )));
        }

        let base = Url::parse(&format!("https://{slug}.{swimlane}.{REPLICON_DOMAIN}/"))?;
        let source = Url::parse(&format!(
            "https://{SOURCE_HOST_PREFIX}{slug}.{swimlane}.{REPLICON_DOMAIN}/"
        ))?;

        Ok(Self {
            slug,
            swimlane,
            service_root: base.clone(),
            source_root: source,
            polaris_root: base.clone(),
            base_origin: base,
        })
    }

    /// Builds a route from the roots returned by tenant discovery.
    ///
    /// `application_root` looks like `https://na5.replicon.com/Acme/`; its
    /// first host label is the swimlane and Web Services live under its
    /// `services/` path.
    pub fn discovered(
        slug: &str,
        application_root: &str,
        polaris_root: &str,
    ) -> Result<Self, CoreError> {
        let base = with_trailing_slash(Url::parse(application_root)?);
        let polaris = with_trailing_slash(Url::parse(polaris_root)?);

        let host = base
            .host_str()
            .ok_or_else(|| CoreError::InvalidData(format!("no host in {application_root}")))?
            .to_string();
        let swimlane = host
            .split('.')
            .next()
            .filter(|label| !label.is_empty())
            .ok_or_else(|| CoreError::InvalidData(format!("no swimlane in host {host}")))?
            .to_string();

        let service_root = push_segments(&base, &[SERVICES_SEGMENT, ""])?;

        let mut source_base = base.clone();
        source_base
            .set_host(Some(&format!("{SOURCE_HOST_PREFIX}{host}")))
            .map_err(CoreError::InvalidUrl)?;
        let source_root = push_segments(&source_base, &[SERVICES_SEGMENT, ""])?;

        Ok(Self {
            slug: slug.to_string(),
            swimlane,
            base_origin: base,
            service_root,
            source_root,
            polaris_root: polaris,
        })
    }

    /// URL of a named Web Service operation.
    pub fn web_service(&self, service: &str, operation: &str) -> Result<OperationUrl, CoreError> {
        operation_url(&self.service_root, service, operation)
    }

    /// URL of a Web Service operation on the source swimlane.
    pub fn source_web_service(
        &self,
        service: &str,
        operation: &str,
    ) -> Result<OperationUrl, CoreError> {
        operation_url(&self.source_root, service, operation)
    }

    /// URL of the analytics API.
    pub fn analytics_url(&self) -> Result<OperationUrl, CoreError> {
        push_segments(&self.base_origin, &["analytics", ""]).map(OperationUrl)
    }

    /// URL of the audit-log API.
    pub fn audit_log_url(&self) -> Result<OperationUrl, CoreError> {
        push_segments(&self.base_origin, &["audit-log", ""]).map(OperationUrl)
    }

    /// URL of the Polaris GraphQL endpoint.
    pub fn polaris_graphql_url(&self) -> Result<OperationUrl, CoreError> {
        push_segments(&self.polaris_root, &["graphql"]).map(OperationUrl)
    }
}

/// Letters, digits, `-` and `_` only, so the value cannot change the host.
fn is_host_label(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn operation_url(root: &Url, service: &str, operation: &str) -> Result<OperationUrl, CoreError> {
    if service.trim().is_empty() || operation.trim().is_empty() {
        return Err(CoreError::InvalidData(
            "service and operation names must be non-empty".to_string(),
        ));
    }
    push_segments(root, &[service, operation]).map(OperationUrl)
}

/// Appends path segments to `root`, replacing its trailing empty segment.
fn push_segments(root: &Url, segments: &[&str]) -> Result<Url, CoreError> {
    let mut url = root.clone();
    url.path_segments_mut()
        .map_err(|()| CoreError::InvalidData(format!("{root} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

// ============================================================================
// Tests
// ============================================================================
