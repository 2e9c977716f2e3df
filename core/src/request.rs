//! Request options carried by a fetch descriptor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Options for a single request: method, headers, body, and anything else.
///
/// Keys without a dedicated field are kept in [`extra`](Self::extra) so a
/// mapping deserialized from configuration passes through verbatim.
///
/// # Example
///
/// ```
/// use composable_fetch_core::request::RequestOptions;
///
/// let options = RequestOptions::new()
///     .method("POST")
///     .header("x-request-id", "42")
///     .body("hello");
///
/// assert_eq!(options.method.as_deref(), Some("POST"));
/// assert_eq!(options.headers.get("x-request-id").map(String::as_str), Some("42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// HTTP method; `None` means GET
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Options without a dedicated field (`mode`, `credentials`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    /// Create empty options (a plain GET)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add or replace a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and mark it as JSON
    ///
    /// # Errors
    ///
    /// Returns the serialization error if `value` cannot be represented as JSON.
    pub fn json_body<T: Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(self.header("content-type", "application/json").body(body))
    }

    /// Set an option that has no dedicated field
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
