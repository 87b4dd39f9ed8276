// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Replicon Core
//!
//! Core types shared by the Replicon handler crates.
//!
//! This crate has no networking of its own. It provides:
//!
//! - Handler configuration and credential selection
//! - Error types
//! - Tenant routes and operation URLs
//! - The transport-neutral response type
//!
//! ## Key Types
//!
//! ### Configuration
//! - [`HandlerConfig`] - Every recognized handler option with its default
//! - [`Credentials`] - The single active authentication scheme
//! - [`HttpMethod`] - Default HTTP verb for requests
//! - [`RetryConfig`] - Attempt bound and inter-attempt delay
//!
//! ### Routing
//! - [`TenantRoute`] - Slug, swimlane, and the roots derived from them
//! - [`OperationUrl`] - A fully qualified request target
//!
//! ### Responses
//! - [`ApiResponse`] - Status, headers, and body of a completed request

pub mod config;
pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export configuration types
pub use config::{
    Credentials, DEFAULT_APPLICATION, DEFAULT_DISCOVERY_URL, HandlerConfig, HttpMethod,
    RetryConfig, Secret,
};

// Re-export model types
pub use models::{ApiResponse, CORRELATION_ID_HEADER, OperationUrl, TenantRoute};
