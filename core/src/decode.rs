//! Named body decoders.
//!
//! A fetch descriptor may name a `response_method`; the middleware looks the
//! name up here and, if a decoder is registered under it, uses that decoder
//! instead of sniffing the content type.

use crate::error::DecodeError;
use crate::response::ResponseData;
use std::collections::HashMap;
use std::sync::Arc;

/// Decodes a fully read body
pub type Decoder = Arc<dyn Fn(Vec<u8>) -> Result<ResponseData, DecodeError> + Send + Sync>;

/// Decoder name: parse JSON
pub const JSON: &str = "json";

/// Decoder name: body as text
pub const TEXT: &str = "text";

/// Decoder name: raw bytes
pub const BLOB: &str = "blob";

/// Decoder name: raw bytes
pub const ARRAY_BUFFER: &str = "arrayBuffer";

/// Parse `bytes` as a JSON document.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if the bytes are not valid JSON.
pub fn parse_json(bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::Json(e.to_string()))
}

/// Decoder name → decoder.
///
/// # Example
///
/// ```
/// use composable_fetch_core::decode::DecoderRegistry;
/// use composable_fetch_core::response::ResponseData;
///
/// let registry = DecoderRegistry::standard().register("lines", |bytes: Vec<u8>| {
///     let text = String::from_utf8_lossy(&bytes);
///     let lines = text.lines().map(|line| serde_json::Value::from(line)).collect();
///     Ok(ResponseData::Json(serde_json::Value::Array(lines)))
/// });
///
/// assert_eq!(registry.names(), vec!["arrayBuffer", "blob", "json", "lines", "text"]);
/// ```
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Decoder>,
}

impl DecoderRegistry {
    /// A registry with no decoders
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with `json`, `text`, `blob` and `arrayBuffer`
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .register(JSON, |bytes: Vec<u8>| parse_json(&bytes).map(ResponseData::Json))
            .register(TEXT, |bytes: Vec<u8>| {
                Ok(ResponseData::Text(String::from_utf8_lossy(&bytes).into_owned()))
            })
            .register(BLOB, |bytes: Vec<u8>| Ok(ResponseData::Bytes(bytes)))
            .register(ARRAY_BUFFER, |bytes: Vec<u8>| Ok(ResponseData::Bytes(bytes)))
    }

    /// Add a decoder, replacing any decoder with the same name
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(Vec<u8>) -> Result<ResponseData, DecodeError> + Send + Sync + 'static,
    {
        self.decoders.insert(name.into(), Arc::new(decoder));
        self
    }

    /// Look up a decoder by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Decoder> {
        self.decoders.get(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.names())
            .finish()
    }
}
