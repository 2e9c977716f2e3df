//! Error types for fetch actions and the store pipeline.
//!
//! The taxonomy follows where a failure surfaces:
//!
//! - [`DispatchError`]: synchronous pipeline failures, returned from `dispatch`/`next`
//! - [`TransportError`]: the request itself failed; routed to `on_failure`
//! - [`DecodeError`]: reading or decoding a response body failed
//! - [`CallbackError`]: a success/failure callback returned an error
//! - [`FetchError`]: how a pending fetch resolves when it does not complete cleanly

use std::error::Error as StdError;
use thiserror::Error;

/// Transport-level request failure.
///
/// Produced by a [`Fetcher`](crate::fetcher::Fetcher) when no HTTP exchange
/// completed. Non-2xx responses are not transport errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be built (bad URL, method, or header)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The client gave up waiting for the server
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other transport failure
    #[error("Request failed: {0}")]
    Request(String),
}

/// Response body could not be read or decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Reading the body from the connection failed
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The body is not valid JSON
    #[error("Failed to parse JSON body: {0}")]
    Json(String),
}

/// Error returned from a success or failure callback.
///
/// Callbacks are application code; whatever they return is carried through
/// unchanged and resolves the pending fetch with [`FetchError::Callback`].
#[derive(Error, Debug)]
#[error(transparent)]
pub struct CallbackError(Box<dyn StdError + Send + Sync + 'static>);

impl CallbackError {
    /// Wrap an arbitrary error
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }

    /// Create an error from a message
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    /// Attempt to view the wrapped error as a concrete type
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Unwrap the boxed error
    #[must_use]
    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.0
    }
}

impl From<DispatchError> for CallbackError {
    fn from(error: DispatchError) -> Self {
        Self::new(error)
    }
}

impl From<serde_json::Error> for CallbackError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error)
    }
}

/// How a pending fetch resolves when it does not complete cleanly.
///
/// Transport failures are not in here: they are handed to `on_failure` and
/// the fetch still resolves with `Ok(())`.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The response body could not be decoded
    ///
    /// Decode failures never reach `on_failure`.
    #[error("Response decoding failed: {0}")]
    Decode(#[from] DecodeError),

    /// A success or failure callback returned an error
    #[error("Callback failed: {0}")]
    Callback(#[from] CallbackError),

    /// The task running the request panicked or was cancelled by the runtime
    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

/// Synchronous failure while pushing an action through the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The store behind a dispatch handle no longer exists
    #[error("Store has been dropped")]
    StoreDropped,

    /// A previous panic poisoned the state lock
    #[error("State lock poisoned")]
    StatePoisoned,

    /// A middleware refused the action
    #[error("Action rejected: {0}")]
    Rejected(String),

    /// The action needs asynchronous work but no Tokio runtime is running
    #[error("No Tokio runtime available to run the request")]
    NoRuntime,
}
