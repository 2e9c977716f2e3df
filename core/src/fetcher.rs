//! The request-issuing capability.

use crate::error::TransportError;
use crate::request::RequestOptions;
use crate::response::Response;
use futures::future::BoxFuture;
use std::future::Future;

/// Issues HTTP requests.
///
/// Calling [`fetch`](Self::fetch) issues the request; the returned future
/// settles it. Implementations must resolve with a [`Response`] for every
/// completed exchange, whatever its status, and fail only when no exchange
/// completed.
///
/// Any `Fn(String, RequestOptions) -> impl Future<Output = Result<Response, TransportError>>`
/// is a fetcher, so a plain async function can be configured directly.
///
/// # Example
///
/// ```
/// use composable_fetch_core::error::TransportError;
/// use composable_fetch_core::fetcher::Fetcher;
/// use composable_fetch_core::request::RequestOptions;
/// use composable_fetch_core::response::Response;
/// use composable_fetch_core::{HeaderMap, StatusCode};
///
/// async fn always_ok(_url: String, _options: RequestOptions) -> Result<Response, TransportError> {
///     Ok(Response::new(StatusCode::OK, HeaderMap::new(), "ok"))
/// }
///
/// fn assert_fetcher<F: Fetcher>(_: &F) {}
/// assert_fetcher(&always_ok);
/// ```
pub trait Fetcher: Send + Sync {
    /// Issue a request to `url`
    fn fetch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> BoxFuture<'static, Result<Response, TransportError>>;
}

impl<F, Fut> Fetcher for F
where
    F: Fn(String, RequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    fn fetch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> BoxFuture<'static, Result<Response, TransportError>> {
        Box::pin(self(url.to_string(), options))
    }
}
