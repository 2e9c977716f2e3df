//! Optional success and failure callbacks.
//!
//! A fetch descriptor may or may not carry callbacks. Instead of checking at
//! runtime whether something is callable, a missing callback is represented
//! by [`Callback::none`], whose invocation does nothing and succeeds.

use crate::error::{CallbackError, TransportError};
use crate::middleware::{Dispatch, GetState};
use crate::response::ResponseData;
use std::sync::Arc;

type CallbackFn<S, A, T> =
    dyn Fn(&Dispatch<A>, &GetState<S>, T) -> Result<(), CallbackError> + Send + Sync;

/// An optional callback receiving the store handle and a value of type `T`.
///
/// The store handle arrives exactly as the middleware received it; callbacks
/// typically dispatch follow-up actions through it.
pub struct Callback<S, A, T> {
    inner: Option<Arc<CallbackFn<S, A, T>>>,
}

/// Called when a response arrives.
///
/// `None` is the two-argument form (no decoded body), `Some(data)` the
/// three-argument form.
pub type OnSuccess<S, A> = Callback<S, A, Option<ResponseData>>;

/// Called when the request itself fails.
pub type OnFailure<S, A> = Callback<S, A, TransportError>;

impl<S, A, T> Callback<S, A, T> {
    /// Wrap a function as a callback
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Dispatch<A>, &GetState<S>, T) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(f)),
        }
    }

    /// The no-op callback
    #[must_use]
    pub const fn none() -> Self {
        Self { inner: None }
    }

    /// Whether a function is attached
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.inner.is_some()
    }

    /// Call the function if one is attached
    ///
    /// # Errors
    ///
    /// Returns whatever the callback returns. An empty callback always succeeds.
    pub fn invoke(
        &self,
        dispatch: &Dispatch<A>,
        get_state: &GetState<S>,
        value: T,
    ) -> Result<(), CallbackError> {
        match &self.inner {
            Some(f) => f(dispatch, get_state, value),
            None => Ok(()),
        }
    }
}

impl<S, A, T> Default for Callback<S, A, T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<S, A, T> Clone for Callback<S, A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Two callbacks are equal when both are empty or both share the same function.
impl<S, A, T> PartialEq for Callback<S, A, T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<S, A, T> std::fmt::Debug for Callback<S, A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_set() {
            write!(f, "Callback(<fn>)")
        } else {
            write!(f, "Callback(none)")
        }
    }
}
