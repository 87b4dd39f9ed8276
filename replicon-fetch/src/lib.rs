// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Replicon Fetch
//!
//! Tenant resolution and request dispatch for the Replicon Gen3 Web
//! Services API.
//!
//! ## Components
//!
//! - [`resolver::TenantResolver`] - Discovers a company's slug and swimlane
//!   once and caches the resulting route
//! - [`dispatcher::Dispatcher`] - Sends requests with a uniform retry
//!   policy, singly or in sequential/concurrent batches
//! - [`transport::Transport`] - The network seam, implemented by
//!   [`transport::ReqwestTransport`]
//! - [`handler::RepliconHandler`] - Facade tying configuration, resolver,
//!   and dispatcher together
//!
//! ## Example
//!
//! ```ignore
//! use replicon_core::HandlerConfig;
//! use replicon_fetch::RepliconHandler;
//! use serde_json::json;
//!
//! let handler = RepliconHandler::new(HandlerConfig::new("acme").with_token(token))?;
//!
//! // Resolve once, then build URLs synchronously.
//! let url = handler.resolve().await?.web_service("UserService1.svc", "GetUser2")?;
//!
//! let payloads = user_uris.iter().map(|uri| json!({ "userUri": uri })).collect();
//! let responses = handler.concurrent_batch(&url, payloads, 4).await?;
//! ```

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod resolver;
pub mod retry;
pub mod transport;

// Errors
pub use error::{
    BatchError, HandlerError, HttpError, NotResolvedError, ResolutionError, TransportError,
};

// Components
pub use dispatcher::Dispatcher;
pub use handler::{APPLICATION_HEADER, RepliconHandler, RepliconHandlerBuilder};
pub use resolver::{RouteSource, TenantResolver};
pub use retry::RetryStrategy;
pub use transport::{PreparedRequest, ReqwestTransport, Transport};
