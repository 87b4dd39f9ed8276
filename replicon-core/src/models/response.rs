//! Completed request data.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Response header carrying the server-side correlation ID.
pub const CORRELATION_ID_HEADER: &str = "x-execution-correlation-id";

/// A response from the Replicon API.
///
/// Any HTTP status counts as a completed request; callers inspect
/// [`ApiResponse::status`] and [`ApiResponse::error`] for application
/// failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, keyed by lower-case name.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: String,
    /// Attempts it took to obtain this response.
    #[serde(default = "one")]
    pub attempts: u32,
}

fn one() -> u32 {
    1
}

impl ApiResponse {
    /// Creates a response from a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
            attempts: 1,
        }
    }

    /// Adds a header, normalizing the name to lower case.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the `x-execution-correlation-id` header, if present.
    pub fn correlation_id(&self) -> Option<&str> {
        self.header(CORRELATION_ID_HEADER)
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parses the body as an untyped JSON value.
    pub fn value(&self) -> Result<Value, CoreError> {
        self.json()
    }

    /// Returns the application-level `error` object of the body.
    ///
    /// Gen3 Web Services report failures as `{"error": {...}}`, frequently
    /// with a 500 status. Bodies that are not JSON, or carry a null error,
    /// yield `None`.
    pub fn error(&self) -> Option<Value> {
        let mut value = self.value().ok()?;
        match value.get_mut("error").map(Value::take) {
            Some(Value::Null) | None => None,
            Some(error) => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_classes() {
        assert!(ApiResponse::new(200, "{}").is_success());
        assert!(ApiResponse::new(204, "").is_success());
        assert!(!ApiResponse::new(500, "").is_success());
        assert!(!ApiResponse::new(302, "").is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = ApiResponse::new(200, "{}").with_header("X-Execution-Correlation-Id", "abc");

        assert_eq!(response.correlation_id(), Some("abc"));
        assert_eq!(response.header("X-EXECUTION-CORRELATION-ID"), Some("abc"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_error_object() {
        let failed = ApiResponse::new(500, r#"{"error": {"reason": "Invalid user"}}"#);
        assert_eq!(failed.error(), Some(json!({"reason": "Invalid user"})));

        let ok = ApiResponse::new(200, r#"{"d": [], "error": null}"#);
        assert_eq!(ok.error(), None);

        let not_json = ApiResponse::new(502, "<html>Bad gateway</html>");
        assert_eq!(not_json.error(), None);
    }

    #[test]
    fn test_typed_body() {
        #[derive(Deserialize)]
        struct Envelope {
            d: Vec<String>,
        }

        let response = ApiResponse::new(200, r#"{"d": ["a", "b"]}"#);
        let envelope: Envelope = response.json().unwrap();
        assert_eq!(envelope.d, vec!["a", "b"]);

        assert!(ApiResponse::new(200, "nope").value().is_err());
    }
}
