//! # Composable Fetch Testing
//!
//! Testing utilities and helpers for Composable Fetch.
//!
//! This crate provides:
//! - Mock implementations of the injected capabilities ([`MockFetcher`])
//! - Recorders for callbacks, `next`, and dispatched actions
//! - A Given-When-Then harness for middleware ([`MiddlewareTest`])
//! - Shared fixtures and property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use composable_fetch_testing::{MockFetcher, MockResponse, CallbackRecorder};
//!
//! #[tokio::test]
//! async fn loads_items() {
//!     let fetcher = MockFetcher::new().respond_with(MockResponse::json(&json!([1, 2])));
//!     let on_success = CallbackRecorder::new();
//!     let store = Store::builder(TestState::default(), TestReducer)
//!         .middleware(FetchMiddleware::new(fetcher.clone()))
//!         .build();
//!
//!     store
//!         .dispatch(TestAction::Fetch(
//!             FetchDescriptor::new("/items").with_on_success(on_success.callback()),
//!         ))
//!         .unwrap()
//!         .settle()
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(on_success.call_count(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mocks;

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber, filtered by `RUST_LOG`
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use crate::fixtures::TestAction;
    use composable_fetch_core::request::RequestOptions;
    use proptest::collection::btree_map;
    use proptest::option;
    use proptest::prelude::*;

    /// Arbitrary request options with a token method, simple headers, and an optional body
    pub fn request_options() -> impl Strategy<Value = RequestOptions> {
        (
            option::of(prop::sample::select(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])),
            btree_map("x-[a-z]{1,8}", "[a-zA-Z0-9 ]{0,16}", 0..4),
            option::of(".{0,32}"),
        )
            .prop_map(|(method, headers, body)| RequestOptions {
                method: method.map(str::to_string),
                headers,
                body,
                extra: serde_json::Map::new(),
            })
    }

    /// Arbitrary actions that carry no fetch descriptor
    pub fn plain_action() -> impl Strategy<Value = TestAction> {
        prop_oneof![
            ".*".prop_map(TestAction::Note),
            ".*".prop_map(TestAction::Failed),
            any::<i64>().prop_map(|n| TestAction::Received(n.into())),
        ]
    }
}

// Re-export commonly used items
pub use fixtures::{TestAction, TestReducer, TestState};
pub use middleware_test::{MiddlewareRun, MiddlewareTest};
pub use mocks::{
    CallbackRecorder, DispatchLog, MockFetcher, MockResponse, NextReply, RecordedRequest,
    RecordingNext, test_api,
};
