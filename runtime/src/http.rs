//! Default [`Fetcher`] backed by `reqwest`.

use composable_fetch_core::error::{DecodeError, TransportError};
use composable_fetch_core::fetcher::Fetcher;
use composable_fetch_core::request::RequestOptions;
use composable_fetch_core::response::{Body, Response};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};

/// Fetcher that performs real HTTP requests with a shared [`reqwest::Client`].
///
/// Any completed exchange becomes a [`Response`], whatever its status. The
/// body is left on the connection until a decoder asks for it.
///
/// # Example
///
/// ```no_run
/// use composable_fetch_runtime::http::ReqwestFetcher;
/// use composable_fetch_core::fetcher::Fetcher;
/// use composable_fetch_core::request::RequestOptions;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = ReqwestFetcher::default();
/// let response = fetcher.fetch("https://example.com", RequestOptions::new()).await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Use a preconfigured client (proxies, TLS roots, client-level timeouts)
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = match options.method.as_deref() {
            Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("method {method:?}: {e}")))?,
            None => Method::GET,
        };

        let mut headers = HeaderMap::with_capacity(options.headers.len());
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("header value for {name}: {e}"))
            })?;
            headers.insert(name, value);
        }

        if !options.extra.is_empty() {
            tracing::trace!(
                ignored = ?options.extra.keys().collect::<Vec<_>>(),
                "Request options without a reqwest counterpart"
            );
        }

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }
        Ok(request)
    }
}

impl Fetcher for ReqwestFetcher {
    fn fetch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> BoxFuture<'static, Result<Response, TransportError>> {
        let request = match self.build_request(url, options) {
            Ok(request) => request,
            Err(error) => return Box::pin(futures::future::ready(Err(error))),
        };

        Box::pin(async move {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            let headers = response.headers().clone();

            tracing::trace!(%status, "Response headers received");

            let body = Body::from_future(async move {
                response
                    .bytes()
                    .await
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| DecodeError::Body(e.to_string()))
            });

            Ok(Response::new(status, headers, body))
        })
    }
}

fn transport_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_method_fails_without_network() {
        let error = ReqwestFetcher::default()
            .fetch("http://localhost/", RequestOptions::new().method("NOT A METHOD"))
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn invalid_header_fails_without_network() {
        let error = ReqwestFetcher::default()
            .fetch(
                "http://localhost/",
                RequestOptions::new().header("bad header", "x"),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn relative_url_is_an_invalid_request() {
        let error = ReqwestFetcher::default()
            .fetch("/relative", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn lowercase_methods_are_accepted() {
        let request = ReqwestFetcher::default()
            .build_request("http://localhost/", RequestOptions::new().method("post"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
    }
}
