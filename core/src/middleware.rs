//! The middleware seam of a store pipeline.
//!
//! A store runs every dispatched action through its middleware in order. Each
//! middleware receives the store handle ([`MiddlewareApi`]), the rest of the
//! chain ([`Next`]) and the action, and decides what to do with it:
//!
//! ```text
//! dispatch(action) → middleware₁ → middleware₂ → … → reducer
//! ```
//!
//! A middleware that forwards returns whatever `next` returned. A middleware
//! that starts asynchronous work returns [`Dispatched::Pending`] with a handle
//! the caller may await or drop.

use crate::error::{DispatchError, FetchError};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Result of pushing an action through (part of) a pipeline
pub type DispatchResult = Result<Dispatched, DispatchError>;

/// The remainder of the chain after the current middleware
pub type Next<'a, A> = &'a dyn Fn(A) -> DispatchResult;

/// What happened to a dispatched action.
#[derive(Debug)]
pub enum Dispatched {
    /// The action reached the reducer
    Reduced,

    /// A middleware consumed the action without forwarding it
    Dropped,

    /// An asynchronous request and its callbacks are running
    Pending(FetchHandle),
}

impl Dispatched {
    /// Whether asynchronous work is still attached
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Wait for any attached asynchronous work
    ///
    /// # Errors
    ///
    /// Returns the pending fetch's error; synchronous outcomes always succeed.
    pub async fn settle(self) -> Result<(), FetchError> {
        match self {
            Self::Pending(handle) => handle.await,
            Self::Reduced | Self::Dropped => Ok(()),
        }
    }
}

/// Handle on a spawned request-and-callback sequence.
///
/// Awaiting it yields the sequence's outcome. Dropping it detaches: the
/// sequence still runs and its callbacks still fire.
pub struct FetchHandle {
    task: JoinHandle<Result<(), FetchError>>,
}

impl FetchHandle {
    /// Spawn `future` on the current Tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a Tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), FetchError>> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }

    /// Whether the sequence has finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for FetchHandle {
    type Output = Result<(), FetchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(FetchError::Aborted(e.to_string())),
        })
    }
}

impl std::fmt::Debug for FetchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Submits actions into the full pipeline of a store.
pub struct Dispatch<A>(Arc<dyn Fn(A) -> DispatchResult + Send + Sync>);

impl<A> Dispatch<A> {
    /// Wrap a dispatch function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> DispatchResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Dispatch an action
    ///
    /// # Errors
    ///
    /// Returns whatever the pipeline reports.
    pub fn send(&self, action: A) -> DispatchResult {
        (self.0)(action)
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<A> std::fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dispatch(<fn>)")
    }
}

/// Reads a snapshot of a store's current state.
pub struct GetState<S>(Arc<dyn Fn() -> S + Send + Sync>);

impl<S> GetState<S> {
    /// Wrap a state reader
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Read the current state
    #[must_use]
    pub fn get(&self) -> S {
        (self.0)()
    }
}

impl<S> Clone for GetState<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S> std::fmt::Debug for GetState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GetState(<fn>)")
    }
}

/// The store handle given to middleware.
///
/// Middleware pass it on to callbacks without calling it themselves.
pub struct MiddlewareApi<S, A> {
    /// Dispatch through the whole pipeline
    pub dispatch: Dispatch<A>,
    /// Read the current state
    pub get_state: GetState<S>,
}

impl<S, A> MiddlewareApi<S, A> {
    /// Bundle a dispatch and a state reader
    #[must_use]
    pub const fn new(dispatch: Dispatch<A>, get_state: GetState<S>) -> Self {
        Self {
            dispatch,
            get_state,
        }
    }
}

impl<S, A> Clone for MiddlewareApi<S, A> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            get_state: self.get_state.clone(),
        }
    }
}

impl<S, A> std::fmt::Debug for MiddlewareApi<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareApi")
            .field("dispatch", &self.dispatch)
            .field("get_state", &self.get_state)
            .finish()
    }
}

/// A stage of the store pipeline.
///
/// # Example
///
/// ```
/// use composable_fetch_core::middleware::{DispatchResult, Middleware, MiddlewareApi, Next};
///
/// /// Forwards every action twice
/// struct Twice;
///
/// impl<S, A: Clone> Middleware<S, A> for Twice {
///     fn process(&self, _api: &MiddlewareApi<S, A>, next: Next<'_, A>, action: A) -> DispatchResult {
///         next(action.clone())?;
///         next(action)
///     }
/// }
/// ```
pub trait Middleware<S, A>: Send + Sync {
    /// Handle one action
    ///
    /// # Errors
    ///
    /// Returns an error if the action is rejected here or further down the chain.
    fn process(&self, api: &MiddlewareApi<S, A>, next: Next<'_, A>, action: A) -> DispatchResult;
}

impl<S, A, M> Middleware<S, A> for Arc<M>
where
    M: Middleware<S, A> + ?Sized,
{
    fn process(&self, api: &MiddlewareApi<S, A>, next: Next<'_, A>, action: A) -> DispatchResult {
        (**self).process(api, next, action)
    }
}

/// Middleware built from a closure, see [`from_fn`].
pub struct FromFn<S, A, F> {
    f: F,
    _marker: PhantomData<fn(&S, A)>,
}

/// Turn a closure into middleware
///
/// # Example
///
/// ```
/// use composable_fetch_core::error::DispatchError;
/// use composable_fetch_core::middleware::{from_fn, Dispatched, Middleware};
///
/// let reject_negative = from_fn(|_api, next, action: i32| {
///     if action < 0 {
///         return Err(DispatchError::Rejected(format!("{action} is negative")));
///     }
///     next(action)
/// });
/// # fn assert_middleware<M: Middleware<(), i32>>(_: &M) {}
/// # assert_middleware(&reject_negative);
/// ```
pub fn from_fn<S, A, F>(f: F) -> FromFn<S, A, F>
where
    F: Fn(&MiddlewareApi<S, A>, Next<'_, A>, A) -> DispatchResult + Send + Sync,
{
    FromFn {
        f,
        _marker: PhantomData,
    }
}

impl<S, A, F> Middleware<S, A> for FromFn<S, A, F>
where
    F: Fn(&MiddlewareApi<S, A>, Next<'_, A>, A) -> DispatchResult + Send + Sync,
{
    fn process(&self, api: &MiddlewareApi<S, A>, next: Next<'_, A>, action: A) -> DispatchResult {
        (self.f)(api, next, action)
    }
}
