//! Fetch error types.

use replicon_core::CoreError;
use thiserror::Error;

// ============================================================================
// HTTP Error
// ============================================================================

/// Failure of a single transport attempt.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Could not connect (DNS, refused, TLS handshake).
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection dropped while sending or reading the body.
    #[error("Body transfer failed: {0}")]
    Body(String),

    /// Response body could not be decoded.
    #[error("Response decoding failed: {0}")]
    Decode(String),

    /// Request could not be built or followed (including redirect policy).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header name or value rejected.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader {
        /// Offending header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl HttpError {
    /// Returns true for connection-level failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_) | Self::Body(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Connect(message)
        } else if err.is_body() {
            Self::Body(message)
        } else if err.is_decode() {
            Self::Decode(message)
        } else if err.is_request() && !err.is_builder() && !err.is_redirect() {
            // Send failures after connecting, such as a reset connection.
            Self::Connect(message)
        } else {
            Self::InvalidRequest(message)
        }
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// A call failed at the connection level on every allowed attempt.
#[derive(Debug, Error)]
#[error("Request failed after {attempts} attempt(s): {last}")]
pub struct TransportError {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Failure of the final attempt.
    #[source]
    pub last: HttpError,
}

// ============================================================================
// Resolution Error
// ============================================================================

/// Tenant slug and swimlane could not be determined.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Discovery did not recognize the company key.
    #[error("Unknown company key: {0}")]
    UnknownCompanyKey(String),

    /// Discovery endpoint unreachable after retries.
    #[error("Discovery request failed: {0}")]
    Discovery(#[from] TransportError),

    /// Discovery answered with a non-success status.
    #[error("Discovery returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Discovery response was missing fields or malformed.
    #[error("Invalid discovery response: {0}")]
    InvalidResponse(String),

    /// Route could not be built from the discovered values.
    #[error("Invalid tenant route: {0}")]
    Route(#[from] CoreError),
}

// ============================================================================
// Not Resolved Error
// ============================================================================

/// A URL was requested before the tenant route was resolved.
#[derive(Debug, Error)]
#[error("Tenant route for company key {company_key:?} has not been resolved")]
pub struct NotResolvedError {
    /// Company key of the handler.
    pub company_key: String,
}

// ============================================================================
// Batch Error
// ============================================================================

/// A batch stopped at its first failing entry.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Concurrency of zero.
    #[error("Batch concurrency must be at least 1")]
    InvalidConcurrency,

    /// An entry exhausted its retries.
    #[error("Batch entry {index} failed: {source}")]
    Entry {
        /// Position of the entry in the input.
        index: usize,
        /// The entry's transport failure.
        #[source]
        source: TransportError,
    },

    /// The worker running an entry panicked or was cancelled.
    #[error("Batch worker for entry {index} did not complete: {message}")]
    Worker {
        /// Position of the entry in the input.
        index: usize,
        /// Join failure description.
        message: String,
    },
}

impl BatchError {
    /// Input index of the failing entry, if the error belongs to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::InvalidConcurrency => None,
            Self::Entry { index, .. } | Self::Worker { index, .. } => Some(*index),
        }
    }
}

// ============================================================================
// Handler Error
// ============================================================================

/// Error type for [`crate::RepliconHandler`] operations.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Configuration or data error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// HTTP client setup or request preparation failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Tenant resolution failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// URL requested before resolution.
    #[error(transparent)]
    NotResolved(#[from] NotResolvedError),

    /// A single call exhausted its retries.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A batch failed.
    #[error(transparent)]
    Batch(#[from] BatchError),
}
