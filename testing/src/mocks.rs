//! In-memory stand-ins for the capabilities the fetch middleware is given
//!
//! - [`MockFetcher`]: scripted [`Fetcher`] that records every request
//! - [`MockResponse`]: builder for the responses it hands out
//! - [`CallbackRecorder`]: records what a callback was called with
//! - [`RecordingNext`]: records what a middleware forwarded to `next`
//! - [`test_api`]: a store handle over a fixed state with a dispatch log

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use composable_fetch_core::callback::Callback;
use composable_fetch_core::error::{CallbackError, DecodeError, DispatchError, TransportError};
use composable_fetch_core::fetcher::Fetcher;
use composable_fetch_core::middleware::{
    Dispatch, DispatchResult, Dispatched, GetState, MiddlewareApi,
};
use composable_fetch_core::request::RequestOptions;
use composable_fetch_core::response::{Body, Response};
use futures::future::{self, BoxFuture};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A request observed by [`MockFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// The URL exactly as passed to `fetch`
    pub url: String,
    /// The options exactly as passed to `fetch`
    pub options: RequestOptions,
}

/// Canned response for [`MockFetcher`]
///
/// # Example
///
/// ```
/// use composable_fetch_testing::MockResponse;
/// use serde_json::json;
///
/// let response = MockResponse::json(&json!({"id": 1}))
///     .with_header("x-request-id", "abc")
///     .into_response();
///
/// assert_eq!(response.header("content-type").as_deref(), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: MockBody,
}

#[derive(Debug, Clone)]
enum MockBody {
    Bytes(Vec<u8>),
    Failing(DecodeError),
}

impl MockResponse {
    /// `200 OK` with no headers and an empty body
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: MockBody::Bytes(Vec::new()),
        }
    }

    /// `200 OK` carrying `value` as `application/json`
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::empty()
            .with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    /// `200 OK` carrying `text` as `text/plain`
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::empty()
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(text.into())
    }

    /// Replace the status code
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = MockBody::Bytes(body.into());
        self
    }

    /// Make reading the body fail with `error`
    #[must_use]
    pub fn with_failing_body(mut self, error: DecodeError) -> Self {
        self.body = MockBody::Failing(error);
        self
    }

    /// Build the [`Response`] a fetcher would hand back
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let body = match self.body {
            MockBody::Bytes(bytes) => Body::from(bytes),
            MockBody::Failing(error) => Body::failing(error),
        };
        Response::new(self.status, headers, body)
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug)]
enum Scripted {
    Respond(MockResponse),
    Fail(TransportError),
    Hang,
}

/// Scripted [`Fetcher`] for deterministic tests
///
/// Outcomes are handed out in the order they were scripted; once the script
/// runs out every request gets [`MockResponse::empty`]. Requests are recorded
/// when `fetch` is called, before the returned future is polled.
///
/// Clones share the script and the record, so a clone can be moved into a
/// middleware while the test keeps the original for assertions.
///
/// # Example
///
/// ```
/// use composable_fetch_core::error::TransportError;
/// use composable_fetch_core::fetcher::Fetcher;
/// use composable_fetch_core::request::RequestOptions;
/// use composable_fetch_testing::{MockFetcher, MockResponse};
///
/// # tokio_test::block_on(async {
/// let fetcher = MockFetcher::new()
///     .respond_with(MockResponse::text("hello"))
///     .fail_with(TransportError::Connect("refused".into()));
///
/// assert!(fetcher.fetch("/a", RequestOptions::new()).await.is_ok());
/// assert!(fetcher.fetch("/b", RequestOptions::new()).await.is_err());
/// assert_eq!(fetcher.call_count(), 2);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockFetcher {
    /// Create a fetcher with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    #[must_use]
    pub fn respond_with(self, response: MockResponse) -> Self {
        self.push(Scripted::Respond(response));
        self
    }

    /// Queue a transport failure
    #[must_use]
    pub fn fail_with(self, error: TransportError) -> Self {
        self.push(Scripted::Fail(error));
        self
    }

    /// Queue a request that never settles
    #[must_use]
    pub fn hang(self) -> Self {
        self.push(Scripted::Hang);
        self
    }

    /// Every request seen so far, in order
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests seen so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn push(&self, scripted: Scripted) {
        self.script.lock().unwrap().push_back(scripted);
    }
}

impl Fetcher for MockFetcher {
    fn fetch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> BoxFuture<'static, Result<Response, TransportError>> {
        self.calls.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            options,
        });

        let scripted = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::Respond(MockResponse::empty()));

        match scripted {
            Scripted::Respond(response) => Box::pin(future::ready(Ok(response.into_response()))),
            Scripted::Fail(error) => Box::pin(future::ready(Err(error))),
            Scripted::Hang => Box::pin(future::pending()),
        }
    }
}

/// Records the values a callback receives
///
/// # Example
///
/// ```
/// use composable_fetch_core::callback::Callback;
/// use composable_fetch_core::middleware::{Dispatch, GetState};
/// use composable_fetch_testing::CallbackRecorder;
///
/// let recorder = CallbackRecorder::<u32>::new();
/// let callback: Callback<(), (), u32> = recorder.callback();
///
/// let dispatch = Dispatch::new(|()| Ok(composable_fetch_core::middleware::Dispatched::Reduced));
/// callback.invoke(&dispatch, &GetState::new(|| ()), 7).unwrap();
///
/// assert_eq!(recorder.calls(), vec![7]);
/// ```
#[derive(Debug)]
pub struct CallbackRecorder<T> {
    calls: Arc<Mutex<Vec<T>>>,
}

impl<T> CallbackRecorder<T>
where
    T: Clone + Send + 'static,
{
    /// Create a recorder that has seen nothing
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A callback that records its value and succeeds
    #[must_use]
    pub fn callback<S, A>(&self) -> Callback<S, A, T> {
        let calls = Arc::clone(&self.calls);
        Callback::new(move |_dispatch: &Dispatch<A>, _get_state: &GetState<S>, value: T| {
            calls.lock().unwrap().push(value);
            Ok(())
        })
    }

    /// A callback that records its value and then fails with `message`
    #[must_use]
    pub fn failing<S, A>(&self, message: &str) -> Callback<S, A, T> {
        let calls = Arc::clone(&self.calls);
        let message = message.to_string();
        Callback::new(move |_dispatch: &Dispatch<A>, _get_state: &GetState<S>, value: T| {
            calls.lock().unwrap().push(value);
            Err(CallbackError::msg(message.clone()))
        })
    }

    /// Every value received so far, in order
    pub fn calls(&self) -> Vec<T> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether the callback was never invoked
    pub fn is_untouched(&self) -> bool {
        self.call_count() == 0
    }
}

impl<T> Clone for CallbackRecorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T> Default for CallbackRecorder<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// What [`RecordingNext`] answers with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NextReply {
    /// `Ok(Dispatched::Reduced)`
    #[default]
    Reduced,
    /// `Ok(Dispatched::Dropped)`
    Dropped,
    /// `Err(error)`
    Reject(DispatchError),
}

impl NextReply {
    fn to_result(&self) -> DispatchResult {
        match self {
            Self::Reduced => Ok(Dispatched::Reduced),
            Self::Dropped => Ok(Dispatched::Dropped),
            Self::Reject(error) => Err(error.clone()),
        }
    }
}

/// A `next` stage that records what it is handed
///
/// # Example
///
/// ```ignore
/// let next = RecordingNext::new();
/// middleware.process(&api, &|action| next.call(action), action)?;
/// assert_eq!(next.forwarded().len(), 1);
/// ```
#[derive(Debug)]
pub struct RecordingNext<A> {
    forwarded: Mutex<Vec<A>>,
    reply: NextReply,
}

impl<A> RecordingNext<A> {
    /// Record actions and answer `Reduced`
    #[must_use]
    pub fn new() -> Self {
        Self::replying(NextReply::Reduced)
    }

    /// Record actions and answer with `reply`
    #[must_use]
    pub const fn replying(reply: NextReply) -> Self {
        Self {
            forwarded: Mutex::new(Vec::new()),
            reply,
        }
    }

    /// The `next` function itself
    ///
    /// # Errors
    ///
    /// Returns the configured rejection, if any.
    pub fn call(&self, action: A) -> DispatchResult {
        self.forwarded.lock().unwrap().push(action);
        self.reply.to_result()
    }

    /// Number of actions forwarded so far
    pub fn call_count(&self) -> usize {
        self.forwarded.lock().unwrap().len()
    }

    /// Take the forwarded actions, leaving the record empty
    pub fn take(&self) -> Vec<A> {
        std::mem::take(&mut *self.forwarded.lock().unwrap())
    }
}

impl<A: Clone> RecordingNext<A> {
    /// Every action forwarded so far, in order
    pub fn forwarded(&self) -> Vec<A> {
        self.forwarded.lock().unwrap().clone()
    }
}

impl<A> Default for RecordingNext<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Actions dispatched through a [`test_api`] handle
#[derive(Debug)]
pub struct DispatchLog<A> {
    actions: Arc<Mutex<Vec<A>>>,
}

impl<A: Clone> DispatchLog<A> {
    /// Every action dispatched so far, in order
    pub fn actions(&self) -> Vec<A> {
        self.actions.lock().unwrap().clone()
    }
}

impl<A> DispatchLog<A> {
    /// Number of actions dispatched so far
    pub fn len(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    /// Whether nothing was dispatched
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A> Clone for DispatchLog<A> {
    fn clone(&self) -> Self {
        Self {
            actions: Arc::clone(&self.actions),
        }
    }
}

/// A store handle over a fixed state
///
/// `get_state` always returns a clone of `state`; `dispatch` appends to the
/// returned [`DispatchLog`] and answers `Reduced`.
pub fn test_api<S, A>(state: S) -> (MiddlewareApi<S, A>, DispatchLog<A>)
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    let log = DispatchLog {
        actions: Arc::new(Mutex::new(Vec::new())),
    };

    let actions = Arc::clone(&log.actions);
    let dispatch = Dispatch::new(move |action| {
        actions.lock().unwrap().push(action);
        Ok(Dispatched::Reduced)
    });
    let get_state = GetState::new(move || state.clone());

    (MiddlewareApi::new(dispatch, get_state), log)
}
