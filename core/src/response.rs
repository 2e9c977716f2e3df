//! HTTP responses as seen by the fetch middleware.
//!
//! A [`Response`] carries the status and headers of a completed exchange and
//! an un-read [`Body`]. Reading the body is asynchronous and can fail
//! independently of the request, which is why decode failures are reported
//! separately from transport failures.

use crate::decode::{self, Decoder};
use crate::error::DecodeError;
use futures::future::BoxFuture;
use http::{HeaderMap, StatusCode};
use std::future::Future;

/// Decoded response content handed to `on_success`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// Parsed JSON document
    Json(serde_json::Value),
    /// Body as text
    Text(String),
    /// Raw body bytes
    Bytes(Vec<u8>),
}

impl ResponseData {
    /// Borrow the JSON document, if this is JSON data
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) | Self::Bytes(_) => None,
        }
    }

    /// Borrow the text, if this is text data
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) | Self::Bytes(_) => None,
        }
    }

    /// Take the JSON document, if this is JSON data
    #[must_use]
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) | Self::Bytes(_) => None,
        }
    }
}

/// An un-read response body.
///
/// Wraps the future that produces the body bytes. Bodies built from in-memory
/// data resolve immediately.
pub struct Body(BoxFuture<'static, Result<Vec<u8>, DecodeError>>);

impl Body {
    /// An empty body
    #[must_use]
    pub fn empty() -> Self {
        Self::from(Vec::new())
    }

    /// A body produced by an arbitrary future, e.g. a streaming connection
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Vec<u8>, DecodeError>> + Send + 'static,
    {
        Self(Box::pin(future))
    }

    /// A body whose read always fails with `error`
    #[must_use]
    pub fn failing(error: DecodeError) -> Self {
        Self(Box::pin(futures::future::ready(Err(error))))
    }

    /// Read the whole body
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying source reports.
    pub async fn read(self) -> Result<Vec<u8>, DecodeError> {
        self.0.await
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Box::pin(futures::future::ready(Ok(bytes))))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body(<unread>)")
    }
}

/// A completed HTTP exchange.
///
/// Any status, including 4xx and 5xx, is a response rather than a failure.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// Create a response from its parts
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// The response status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// All response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a header value by name (case-insensitive name match)
    ///
    /// Repeated headers are joined with `", "` in the order received. Bytes
    /// that are not valid UTF-8 are replaced. Returns `None` if the header is
    /// missing.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<_> = self
            .headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Take the un-read body
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Read the body as raw bytes
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Body`] if the body cannot be read.
    pub async fn bytes(self) -> Result<Vec<u8>, DecodeError> {
        self.body.read().await
    }

    /// Read the body as text, replacing invalid UTF-8
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Body`] if the body cannot be read.
    pub async fn text(self) -> Result<String, DecodeError> {
        let bytes = self.body.read().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read and parse the body as JSON
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Body`] if the body cannot be read and
    /// [`DecodeError::Json`] if it is not valid JSON.
    pub async fn json(self) -> Result<serde_json::Value, DecodeError> {
        let bytes = self.body.read().await?;
        decode::parse_json(&bytes)
    }

    /// Read the body and hand it to `decoder`
    ///
    /// # Errors
    ///
    /// Returns the read error, or whatever the decoder reports.
    pub async fn decode_with(self, decoder: &Decoder) -> Result<ResponseData, DecodeError> {
        let bytes = self.body.read().await?;
        decoder(bytes)
    }
}
