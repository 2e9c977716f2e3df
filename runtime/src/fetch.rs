//! The fetch middleware.
//!
//! Actions that carry a [`FetchDescriptor`] are forwarded down the chain and
//! then turned into a request. The request settles in a spawned task, which
//! routes the outcome to the descriptor's callbacks:
//!
//! | outcome | callback |
//! |---|---|
//! | response, `response_method` names a registered decoder | `on_success(dispatch, get_state, Some(decoded))` |
//! | response, `content-type` contains `application/json` | `on_success(dispatch, get_state, Some(Json(..)))` |
//! | any other response (including 4xx/5xx) | `on_success(dispatch, get_state, None)` |
//! | transport failure | `on_failure(dispatch, get_state, error)` |
//!
//! A body that fails to decode resolves the pending handle with
//! [`FetchError::Decode`]; it is not reported to `on_failure`. Errors returned
//! by callbacks resolve it with [`FetchError::Callback`].

use crate::http::ReqwestFetcher;
use composable_fetch_core::action::{FetchAction, FetchDescriptor};
use composable_fetch_core::decode::DecoderRegistry;
use composable_fetch_core::error::{
    CallbackError, DecodeError, DispatchError, FetchError, TransportError,
};
use composable_fetch_core::fetcher::Fetcher;
use composable_fetch_core::middleware::{
    DispatchResult, Dispatched, FetchHandle, Middleware, MiddlewareApi, Next,
};
use composable_fetch_core::response::{Response, ResponseData};
use futures::future::BoxFuture;
use http::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Instant;

/// Content-type substring that selects JSON decoding
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Configuration for [`FetchMiddleware`]
///
/// # Example
///
/// ```
/// use composable_fetch_core::response::ResponseData;
/// use composable_fetch_runtime::fetch::FetchConfig;
///
/// let config = FetchConfig::default()
///     .with_json_marker("+json")
///     .with_decoder("length", |bytes: Vec<u8>| Ok(ResponseData::Json(bytes.len().into())));
///
/// assert!(config.decoders.get("length").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Decoders selectable through a descriptor's `response_method`
    pub decoders: DecoderRegistry,
    /// Substring of `content-type` that selects JSON decoding (case-sensitive)
    pub json_marker: String,
}

impl FetchConfig {
    /// Create a configuration with custom values
    #[must_use]
    pub fn new(decoders: DecoderRegistry, json_marker: impl Into<String>) -> Self {
        Self {
            decoders,
            json_marker: json_marker.into(),
        }
    }

    /// Replace the decoder registry
    #[must_use]
    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    /// Add or replace a single decoder
    #[must_use]
    pub fn with_decoder<F>(mut self, name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(Vec<u8>) -> Result<ResponseData, DecodeError> + Send + Sync + 'static,
    {
        self.decoders = self.decoders.register(name, decoder);
        self
    }

    /// Set the content-type substring that selects JSON decoding
    #[must_use]
    pub fn with_json_marker(mut self, marker: impl Into<String>) -> Self {
        self.json_marker = marker.into();
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            decoders: DecoderRegistry::standard(),
            json_marker: JSON_CONTENT_TYPE.to_string(),
        }
    }
}

/// Middleware that performs the requests described by fetch actions.
///
/// Stateless apart from its configuration: every action is handled on its
/// own, and each qualifying action leads to exactly one request and at most
/// one callback.
///
/// Settling happens in a spawned task, so fetch actions must be dispatched
/// from within a Tokio runtime; elsewhere they are rejected with
/// [`DispatchError::NoRuntime`].
///
/// # Example
///
/// ```ignore
/// let store = Store::builder(TodoState::default(), TodoReducer)
///     .middleware(FetchMiddleware::default())
///     .build();
///
/// let pending = store.dispatch(TodoAction::Load(
///     FetchDescriptor::new("https://example.com/todos").on_success(load_todos),
/// ))?;
/// pending.settle().await?;
/// ```
#[derive(Clone)]
pub struct FetchMiddleware {
    fetcher: Arc<dyn Fetcher>,
    config: Arc<FetchConfig>,
}

impl FetchMiddleware {
    /// Create a middleware issuing requests through `fetcher`
    pub fn new<F>(fetcher: F) -> Self
    where
        F: Fetcher + 'static,
    {
        Self {
            fetcher: Arc::new(fetcher),
            config: Arc::new(FetchConfig::default()),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Uses [`ReqwestFetcher::default`].
impl Default for FetchMiddleware {
    fn default() -> Self {
        Self::new(ReqwestFetcher::default())
    }
}

impl std::fmt::Debug for FetchMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchMiddleware")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, A> Middleware<S, A> for FetchMiddleware
where
    S: 'static,
    A: FetchAction<S> + 'static,
{
    /// Forward `action`, then issue its request if it carries a descriptor
    ///
    /// # Errors
    ///
    /// Returns whatever `next` returns. Fetch actions dispatched outside a
    /// Tokio runtime fail with [`DispatchError::NoRuntime`] before reaching
    /// `next`, so neither the state nor the network is touched.
    fn process(&self, api: &MiddlewareApi<S, A>, next: Next<'_, A>, action: A) -> DispatchResult {
        let Some(descriptor) = action.fetch_descriptor().cloned() else {
            tracing::trace!("Action has no fetch descriptor, passing through");
            return next(action);
        };

        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(url = %descriptor.url, "Fetch action dispatched outside a Tokio runtime");
            return Err(DispatchError::NoRuntime);
        }

        // The raw action travels down the chain before the request is issued
        let forwarded = next(action)?;
        tracing::trace!(?forwarded, "Fetch action forwarded");

        tracing::debug!(
            url = %descriptor.url,
            method = descriptor.options.method.as_deref().unwrap_or("GET"),
            "Issuing fetch request"
        );
        metrics::counter!("fetch_requests_total").increment(1);

        let request = self
            .fetcher
            .fetch(&descriptor.url, descriptor.options.clone());

        Ok(Dispatched::Pending(FetchHandle::spawn(settle(
            request,
            descriptor,
            api.clone(),
            Arc::clone(&self.config),
        ))))
    }
}

/// Wait for the request and route its outcome to the callbacks
#[tracing::instrument(skip_all, name = "fetch_settle", fields(url = %descriptor.url))]
async fn settle<S, A>(
    request: BoxFuture<'static, Result<Response, TransportError>>,
    descriptor: FetchDescriptor<S, A>,
    api: MiddlewareApi<S, A>,
    config: Arc<FetchConfig>,
) -> Result<(), FetchError> {
    let started = Instant::now();
    let outcome = request.await;
    metrics::histogram!("fetch_request_duration_seconds")
        .record(started.elapsed().as_secs_f64());

    match outcome {
        Ok(response) => {
            let status = response.status();
            let data = match decode(response, descriptor.response_method.as_deref(), &config).await
            {
                Ok(data) => data,
                Err(error) => {
                    tracing::warn!(%status, error = %error, "Failed to decode response body");
                    record_outcome("decode_error");
                    return Err(FetchError::Decode(error));
                },
            };

            tracing::debug!(%status, decoded = data.is_some(), "Fetch request succeeded");
            record_outcome(if data.is_some() {
                "success_decoded"
            } else {
                "success_untyped"
            });

            descriptor
                .on_success
                .invoke(&api.dispatch, &api.get_state, data)
                .map_err(callback_failed)
        },
        Err(error) => {
            tracing::debug!(error = %error, "Fetch request failed");
            record_outcome("failed");

            descriptor
                .on_failure
                .invoke(&api.dispatch, &api.get_state, error)
                .map_err(callback_failed)
        },
    }
}

/// Decode the body as asked by the descriptor, or by sniffing the content type
///
/// Returns `None` when the response is neither explicitly decoded nor JSON;
/// the body is left unread in that case.
async fn decode(
    response: Response,
    response_method: Option<&str>,
    config: &FetchConfig,
) -> Result<Option<ResponseData>, DecodeError> {
    if let Some(name) = response_method {
        if let Some(decoder) = config.decoders.get(name) {
            return response.decode_with(decoder).await.map(Some);
        }
        tracing::debug!(
            response_method = name,
            "No decoder registered for response method, sniffing content type"
        );
    }

    let is_json = response
        .header(CONTENT_TYPE.as_str())
        .is_some_and(|content_type| content_type.contains(config.json_marker.as_str()));

    if is_json {
        response.json().await.map(|value| Some(ResponseData::Json(value)))
    } else {
        Ok(None)
    }
}

fn callback_failed(error: CallbackError) -> FetchError {
    tracing::warn!(error = %error, "Fetch callback failed");
    record_outcome("callback_error");
    FetchError::Callback(error)
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("fetch_settled_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use composable_fetch_core::{HeaderMap, StatusCode};
    use http::HeaderValue;

    fn response(content_type: Option<&'static str>, body: &str) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Response::new(StatusCode::OK, headers, body)
    }

    #[tokio::test]
    async fn json_content_type_is_decoded() {
        let data = decode(
            response(Some("application/json; charset=utf-8"), r#"{"x":1}"#),
            None,
            &FetchConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(data, Some(ResponseData::Json(serde_json::json!({"x": 1}))));
    }

    #[tokio::test]
    async fn content_type_match_is_case_sensitive() {
        let data = decode(
            response(Some("Application/JSON"), r#"{"x":1}"#),
            None,
            &FetchConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(data, None);
    }

    #[tokio::test]
    async fn missing_content_type_leaves_body_unread() {
        let data = decode(response(None, "not json"), None, &FetchConfig::default())
            .await
            .unwrap();

        assert_eq!(data, None);
    }

    #[tokio::test]
    async fn response_method_wins_over_content_type() {
        let data = decode(
            response(Some("application/json"), r#"{"x":1}"#),
            Some("text"),
            &FetchConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(data, Some(ResponseData::Text(r#"{"x":1}"#.to_string())));
    }

    #[tokio::test]
    async fn unknown_response_method_falls_back_to_sniffing() {
        let data = decode(
            response(Some("application/json"), "[1,2]"),
            Some("formData"),
            &FetchConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(data, Some(ResponseData::Json(serde_json::json!([1, 2]))));
    }

    #[tokio::test]
    async fn custom_json_marker() {
        let config = FetchConfig::default().with_json_marker("+json");

        let data = decode(
            response(Some("application/problem+json"), r#"{"title":"x"}"#),
            None,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(data, Some(ResponseData::Json(serde_json::json!({"title": "x"}))));
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let error = decode(
            response(Some("application/json"), "{"),
            None,
            &FetchConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, DecodeError::Json(_)));
    }
}
