//! # Composable Fetch Core
//!
//! Core traits and types for driving HTTP requests from store actions.
//!
//! An action that carries a [`FetchDescriptor`](action::FetchDescriptor) asks the
//! fetch middleware to issue a request and to report the outcome through the
//! descriptor's callbacks. Everything else flows through the middleware chain
//! untouched and ends up in a [`Reducer`](reducer::Reducer).
//!
//! ## Core Concepts
//!
//! - **Action**: Any value flowing through the store pipeline
//! - **Fetch Descriptor**: Declarative description of a request plus callbacks
//! - **Middleware**: A pipeline stage `(api, next, action) → result`
//! - **Fetcher**: The injected request-issuing capability
//! - **Response**: Status, headers and an un-read body, decoded on demand
//! - **Reducer**: The terminal stage that applies actions to state
//!
//! ## Example
//!
//! ```ignore
//! use composable_fetch_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum UserAction {
//!     Load(FetchDescriptor<UserState, UserAction>),
//!     Loaded(serde_json::Value),
//! }
//!
//! impl FetchAction<UserState> for UserAction {
//!     fn fetch_descriptor(&self) -> Option<&FetchDescriptor<UserState, Self>> {
//!         match self {
//!             UserAction::Load(descriptor) => Some(descriptor),
//!             UserAction::Loaded(_) => None,
//!         }
//!     }
//! }
//!
//! let load = UserAction::Load(
//!     FetchDescriptor::new("https://api.example.com/users/1").on_success(
//!         |dispatch: &Dispatch<UserAction>, _: &GetState<UserState>, data: Option<ResponseData>| {
//!             if let Some(ResponseData::Json(user)) = data {
//!                 dispatch.send(UserAction::Loaded(user))?;
//!             }
//!             Ok(())
//!         },
//!     ),
//! );
//! ```

pub mod action;
pub mod callback;
pub mod decode;
pub mod error;
pub mod fetcher;
pub mod middleware;
pub mod request;
pub mod response;

/// Reducer module - the terminal stage of a store pipeline
///
/// Reducers apply actions to state after every middleware has had its turn.
/// They are synchronous and never see the asynchronous side of a fetch; the
/// outcome of a request comes back as new actions dispatched from callbacks.
pub mod reducer {
    /// The Reducer trait - applies actions to state
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    ///
    /// # Example
    ///
    /// ```
    /// use composable_fetch_core::reducer::Reducer;
    ///
    /// struct CounterReducer;
    ///
    /// enum CounterAction {
    ///     Increment,
    ///     Reset,
    /// }
    ///
    /// impl Reducer for CounterReducer {
    ///     type State = i64;
    ///     type Action = CounterAction;
    ///
    ///     fn reduce(&self, state: &mut i64, action: CounterAction) {
    ///         match action {
    ///             CounterAction::Increment => *state += 1,
    ///             CounterAction::Reset => *state = 0,
    ///         }
    ///     }
    /// }
    ///
    /// let mut count = 0;
    /// CounterReducer.reduce(&mut count, CounterAction::Increment);
    /// assert_eq!(count, 1);
    /// ```
    pub trait Reducer: Send + Sync {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// Apply an action to the state in place
        fn reduce(&self, state: &mut Self::State, action: Self::Action);
    }
}

/// Commonly used types, re-exported for glob import
pub mod prelude {
    pub use crate::action::{FetchAction, FetchDescriptor};
    pub use crate::callback::{Callback, OnFailure, OnSuccess};
    pub use crate::decode::{Decoder, DecoderRegistry};
    pub use crate::error::{
        CallbackError, DecodeError, DispatchError, FetchError, TransportError,
    };
    pub use crate::fetcher::Fetcher;
    pub use crate::middleware::{
        Dispatch, DispatchResult, Dispatched, FetchHandle, GetState, Middleware, MiddlewareApi,
        Next, from_fn,
    };
    pub use crate::reducer::Reducer;
    pub use crate::request::RequestOptions;
    pub use crate::response::{Body, Response, ResponseData};
}

pub use futures::future::BoxFuture;
pub use http::{HeaderMap, StatusCode};
