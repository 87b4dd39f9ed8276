//! Domain models for the Replicon handler.
//!
//! ## Submodules
//!
//! - [`route`] - Tenant routing (TenantRoute, OperationUrl)
//! - [`response`] - Completed request data (ApiResponse)

mod response;
mod route;

pub use response::{ApiResponse, CORRELATION_ID_HEADER};
pub use route::{OperationUrl, TenantRoute};
#[cfg(test)]
mod serde_tests;
