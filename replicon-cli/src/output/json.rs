//! JSON output formatting.

use anyhow::Result;
use replicon_core::ApiResponse;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one Web Service response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub status: u16,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Parsed body, or the raw text when it is not JSON.
    pub body: Value,
}

impl ResponseOutput {
    /// Converts a response, keeping a non-JSON body as a string.
    pub fn from_response(response: &ApiResponse) -> Self {
        Self {
            index: None,
            status: response.status,
            attempts: response.attempts,
            correlation_id: response.correlation_id().map(str::to_string),
            body: response
                .value()
                .unwrap_or_else(|_| Value::String(response.body.clone())),
        }
    }

    /// Tags the output with its batch position.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a single response.
    pub fn format_response(&self, response: &ApiResponse) -> Result<String> {
        self.format(&ResponseOutput::from_response(response))
    }

    /// Formats batch responses in input order.
    pub fn format_batch(&self, responses: &[ApiResponse]) -> Result<String> {
        let outputs: Vec<ResponseOutput> = responses
            .iter()
            .enumerate()
            .map(|(index, response)| ResponseOutput::from_response(response).with_index(index))
            .collect();
        self.format(&outputs)
    }
}
