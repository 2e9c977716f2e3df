//! # Composable Fetch Runtime
//!
//! Runtime implementation for Composable Fetch.
//!
//! ## Core Components
//!
//! - **`FetchMiddleware`**: Turns actions carrying a fetch descriptor into requests
//!   and routes the outcome to the descriptor's callbacks
//! - **`ReqwestFetcher`**: The default request primitive, backed by `reqwest`
//! - **Store**: Runs actions through a middleware chain into a reducer
//!
//! ## Example
//!
//! ```ignore
//! use composable_fetch_runtime::{FetchMiddleware, Store};
//!
//! let store = Store::builder(initial_state, my_reducer)
//!     .middleware(FetchMiddleware::default())
//!     .build();
//!
//! // Plain actions reach the reducer synchronously
//! store.dispatch(Action::Reset)?;
//!
//! // Fetch actions come back with a handle on the request
//! let pending = store.dispatch(Action::Load(descriptor))?;
//! pending.settle().await?;
//!
//! let value = store.state(|s| s.some_field.clone());
//! ```

/// Fetch middleware
pub mod fetch;

/// Default request primitive
pub mod http;

/// Prometheus metrics for observability
pub mod metrics;

pub use fetch::{FetchConfig, FetchMiddleware};
pub use http::ReqwestFetcher;

/// Store module - runs actions through middleware into a reducer
pub mod store {
    use composable_fetch_core::error::DispatchError;
    use composable_fetch_core::middleware::{
        Dispatch, DispatchResult, Dispatched, GetState, Middleware, MiddlewareApi,
    };
    use composable_fetch_core::reducer::Reducer;
    use std::sync::{Arc, PoisonError, RwLock, Weak};

    /// The Store - state, a reducer, and the middleware in front of it
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Middleware, run in registration order for every dispatched action
    /// 3. Reducer, the terminal stage of the chain
    ///
    /// The [`MiddlewareApi`] handed to middleware dispatches through the whole
    /// chain again, so actions dispatched from fetch callbacks see every
    /// middleware too. It holds the store weakly; once the last `Store` clone is
    /// dropped, dispatching through it fails with [`DispatchError::StoreDropped`].
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `R`: Reducer implementation
    ///
    /// # Example
    ///
    /// ```
    /// use composable_fetch_core::reducer::Reducer;
    /// use composable_fetch_runtime::Store;
    ///
    /// struct Sum;
    ///
    /// impl Reducer for Sum {
    ///     type State = i64;
    ///     type Action = i64;
    ///
    ///     fn reduce(&self, state: &mut i64, action: i64) {
    ///         *state += action;
    ///     }
    /// }
    ///
    /// let store = Store::new(0, Sum);
    /// store.dispatch(2).unwrap();
    /// store.dispatch(3).unwrap();
    /// assert_eq!(store.get_state(), 5);
    /// ```
    pub struct Store<S, A, R>
    where
        R: Reducer<State = S, Action = A>,
    {
        shared: Arc<Shared<S, A, R>>,
    }

    struct Shared<S, A, R> {
        state: Arc<RwLock<S>>,
        reducer: R,
        middleware: Vec<Box<dyn Middleware<S, A>>>,
        api: MiddlewareApi<S, A>,
    }

    /// Builder for a [`Store`] with middleware
    pub struct StoreBuilder<S, A, R> {
        initial_state: S,
        reducer: R,
        middleware: Vec<Box<dyn Middleware<S, A>>>,
    }

    impl<S, A, R> StoreBuilder<S, A, R>
    where
        R: Reducer<State = S, Action = A> + 'static,
        S: Clone + Send + Sync + 'static,
        A: 'static,
    {
        /// Append a middleware; earlier middleware see actions first
        #[must_use]
        pub fn middleware<M>(mut self, middleware: M) -> Self
        where
            M: Middleware<S, A> + 'static,
        {
            self.middleware.push(Box::new(middleware));
            self
        }

        /// Build the store
        #[must_use]
        pub fn build(self) -> Store<S, A, R> {
            let state = Arc::new(RwLock::new(self.initial_state));
            let reader = Arc::clone(&state);

            let shared = Arc::new_cyclic(|weak: &Weak<Shared<S, A, R>>| {
                let weak = weak.clone();
                let dispatch = Dispatch::new(move |action| match weak.upgrade() {
                    Some(shared) => shared.dispatch_from(0, action),
                    None => Err(DispatchError::StoreDropped),
                });
                let get_state = GetState::new(move || {
                    reader
                        .read()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone()
                });

                Shared {
                    state,
                    reducer: self.reducer,
                    middleware: self.middleware,
                    api: MiddlewareApi::new(dispatch, get_state),
                }
            });

            tracing::debug!(middleware = shared.middleware.len(), "Store built");
            Store { shared }
        }
    }

    impl<S, A, R> Shared<S, A, R>
    where
        R: Reducer<State = S, Action = A>,
    {
        fn dispatch_from(&self, index: usize, action: A) -> DispatchResult {
            match self.middleware.get(index) {
                Some(middleware) => {
                    let next = |action: A| self.dispatch_from(index + 1, action);
                    middleware.process(&self.api, &next, action)
                },
                None => {
                    let mut state = self
                        .state
                        .write()
                        .map_err(|_| DispatchError::StatePoisoned)?;
                    self.reducer.reduce(&mut state, action);
                    tracing::trace!("Action reduced");
                    Ok(Dispatched::Reduced)
                },
            }
        }
    }

    impl<S, A, R> Store<S, A, R>
    where
        R: Reducer<State = S, Action = A> + 'static,
        S: Clone + Send + Sync + 'static,
        A: 'static,
    {
        /// Create a store without middleware
        #[must_use]
        pub fn new(initial_state: S, reducer: R) -> Self {
            Self::builder(initial_state, reducer).build()
        }

        /// Start building a store with middleware
        #[must_use]
        pub fn builder(initial_state: S, reducer: R) -> StoreBuilder<S, A, R> {
            StoreBuilder {
                initial_state,
                reducer,
                middleware: Vec::new(),
            }
        }

        /// Dispatch an action through the middleware chain
        ///
        /// Runs synchronously up to the reducer. Middleware that start
        /// asynchronous work (such as the fetch middleware) return
        /// [`Dispatched::Pending`], which may be awaited or dropped.
        ///
        /// # Errors
        ///
        /// Returns whatever a middleware rejects the action with, or
        /// [`DispatchError::StatePoisoned`] if a reducer panicked earlier.
        /// Fetch actions dispatched outside a Tokio runtime are rejected with
        /// [`DispatchError::NoRuntime`].
        #[tracing::instrument(skip(self, action), name = "store_dispatch")]
        pub fn dispatch(&self, action: A) -> DispatchResult {
            metrics::counter!("store_actions_dispatched_total").increment(1);
            self.shared.dispatch_from(0, action)
        }

        /// Read from the current state
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self
                .shared
                .state
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            f(&state)
        }

        /// Clone the current state
        #[must_use]
        pub fn get_state(&self) -> S {
            self.state(S::clone)
        }

        /// The handle middleware receive: dispatch through the whole chain, read state
        #[must_use]
        pub fn api(&self) -> MiddlewareApi<S, A> {
            self.shared.api.clone()
        }
    }

    impl<S, A, R> Clone for Store<S, A, R>
    where
        R: Reducer<State = S, Action = A>,
    {
        fn clone(&self) -> Self {
            Self {
                shared: Arc::clone(&self.shared),
            }
        }
    }
}

// Re-export for convenience
pub use store::{Store, StoreBuilder};
