//! Fetch descriptors and the actions that carry them.

use crate::callback::{Callback, OnFailure, OnSuccess};
use crate::error::{CallbackError, TransportError};
use crate::middleware::{Dispatch, GetState};
use crate::request::RequestOptions;
use crate::response::ResponseData;

/// Declarative description of a request attached to an action.
///
/// # Type Parameters
///
/// - `S`: State type of the store the action is dispatched into
/// - `A`: Action type of that store (callbacks dispatch `A`s)
///
/// # Example
///
/// ```
/// use composable_fetch_core::action::FetchDescriptor;
/// use composable_fetch_core::request::RequestOptions;
///
/// let descriptor: FetchDescriptor<(), ()> = FetchDescriptor::new("https://example.com/items")
///     .options(RequestOptions::new().method("DELETE"))
///     .response_method("text");
///
/// assert_eq!(descriptor.url, "https://example.com/items");
/// assert!(!descriptor.on_success.is_set());
/// ```
pub struct FetchDescriptor<S, A> {
    /// Request URL
    pub url: String,

    /// Request options; each request gets its own copy
    pub options: RequestOptions,

    /// Called with the decoded body (if any) when a response arrives
    pub on_success: OnSuccess<S, A>,

    /// Called with the transport error when the request fails
    pub on_failure: OnFailure<S, A>,

    /// Name of the decoder to prefer over content-type sniffing
    pub response_method: Option<String>,
}

impl<S, A> FetchDescriptor<S, A> {
    /// Describe a GET request to `url` with no callbacks
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: RequestOptions::default(),
            on_success: Callback::none(),
            on_failure: Callback::none(),
            response_method: None,
        }
    }

    /// Set the request options
    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the success callback from a function
    #[must_use]
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: Fn(&Dispatch<A>, &GetState<S>, Option<ResponseData>) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.with_on_success(Callback::new(f))
    }

    /// Set the failure callback from a function
    #[must_use]
    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: Fn(&Dispatch<A>, &GetState<S>, TransportError) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.with_on_failure(Callback::new(f))
    }

    /// Set the success callback
    #[must_use]
    pub fn with_on_success(mut self, callback: OnSuccess<S, A>) -> Self {
        self.on_success = callback;
        self
    }

    /// Set the failure callback
    #[must_use]
    pub fn with_on_failure(mut self, callback: OnFailure<S, A>) -> Self {
        self.on_failure = callback;
        self
    }

    /// Prefer the named decoder (e.g. `"text"`) over content-type sniffing
    #[must_use]
    pub fn response_method(mut self, name: impl Into<String>) -> Self {
        self.response_method = Some(name.into());
        self
    }
}

impl<S, A> Clone for FetchDescriptor<S, A> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            options: self.options.clone(),
            on_success: self.on_success.clone(),
            on_failure: self.on_failure.clone(),
            response_method: self.response_method.clone(),
        }
    }
}

impl<S, A> PartialEq for FetchDescriptor<S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.options == other.options
            && self.on_success == other.on_success
            && self.on_failure == other.on_failure
            && self.response_method == other.response_method
    }
}

impl<S, A> std::fmt::Debug for FetchDescriptor<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchDescriptor")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("on_success", &self.on_success)
            .field("on_failure", &self.on_failure)
            .field("response_method", &self.response_method)
            .finish()
    }
}

/// Actions that may carry a fetch descriptor.
///
/// Returning `Some` makes the fetch middleware issue the request; `None`
/// lets the action pass through untouched.
pub trait FetchAction<S>: Sized {
    /// The descriptor carried by this action, if any
    fn fetch_descriptor(&self) -> Option<&FetchDescriptor<S, Self>>;
}
