//! Integration tests for the fetch middleware
//!
//! Covers the pass-through path, the ordering between `next` and the request,
//! and how every kind of outcome is routed to the descriptor's callbacks.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_fetch_core::action::FetchDescriptor;
use composable_fetch_core::callback::Callback;
use composable_fetch_core::error::{DecodeError, DispatchError, FetchError, TransportError};
use composable_fetch_core::middleware::{Dispatch, Dispatched, GetState, Middleware};
use composable_fetch_core::request::RequestOptions;
use composable_fetch_core::response::ResponseData;
use composable_fetch_core::StatusCode;
use composable_fetch_runtime::{FetchConfig, FetchMiddleware, Store};
use composable_fetch_testing::helpers::init_test_tracing;
use composable_fetch_testing::{
    CallbackRecorder, MiddlewareTest, MockFetcher, MockResponse, NextReply, RecordedRequest,
    RecordingNext, TestAction, TestReducer, TestState, properties, test_api,
};
use proptest::prelude::*;
use serde_json::json;
use std::time::Duration;

// ============================================================================
// Helpers
// ============================================================================

type TestStore = Store<TestState, TestAction, TestReducer>;

fn store_with(fetcher: &MockFetcher) -> TestStore {
    Store::builder(TestState::default(), TestReducer)
        .middleware(FetchMiddleware::new(fetcher.clone()))
        .build()
}

fn fetch(descriptor: FetchDescriptor<TestState, TestAction>) -> TestAction {
    TestAction::Fetch(descriptor)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// Pass-through
// ============================================================================

#[test]
fn plain_actions_pass_through_untouched() {
    let fetcher = MockFetcher::new();

    let run = MiddlewareTest::new(FetchMiddleware::new(fetcher.clone()))
        .given_state(TestState::default())
        .given_next_reply(NextReply::Dropped)
        .when_action(TestAction::Note("hello".into()))
        .then_forwarded(|actions| {
            assert_eq!(actions, [TestAction::Note("hello".into())]);
        })
        .then_result(|result| assert!(matches!(result, Ok(Dispatched::Dropped))))
        .run();

    assert!(run.dispatched.is_empty());
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn plain_action_rejection_is_returned_as_is() {
    MiddlewareTest::new(FetchMiddleware::new(MockFetcher::new()))
        .given_state(TestState::default())
        .given_next_reply(NextReply::Reject(DispatchError::Rejected("nope".into())))
        .when_action(TestAction::Failed("x".into()))
        .then_result(|result| {
            assert_eq!(
                result.as_ref().unwrap_err(),
                &DispatchError::Rejected("nope".into())
            );
        })
        .run();
}

proptest! {
    #[test]
    fn descriptorless_actions_are_forwarded_once(action in properties::plain_action()) {
        let fetcher = MockFetcher::new();
        let expected = action.clone();

        let run = MiddlewareTest::new(FetchMiddleware::new(fetcher.clone()))
            .given_state(TestState::default())
            .when_action(action)
            .run();

        prop_assert!(matches!(run.result, Ok(Dispatched::Reduced)));
        prop_assert_eq!(run.forwarded, vec![expected]);
        prop_assert_eq!(fetcher.call_count(), 0);
    }
}

// ============================================================================
// Issuing the request
// ============================================================================

#[tokio::test]
async fn next_sees_the_action_before_the_request_is_issued() {
    init_test_tracing();
    let fetcher = MockFetcher::new();
    let middleware = FetchMiddleware::new(fetcher.clone());
    let (api, _log) = test_api(TestState::default());
    let next = RecordingNext::new();

    let action = fetch(FetchDescriptor::new("/items"));
    let result = middleware.process(
        &api,
        &|action| {
            assert_eq!(fetcher.call_count(), 0, "request issued before next");
            next.call(action)
        },
        action.clone(),
    );

    assert!(result.unwrap().is_pending());
    assert_eq!(next.forwarded(), vec![action]);
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn request_is_issued_once_with_url_and_options() {
    let fetcher = MockFetcher::new();
    let store = store_with(&fetcher);
    let options = RequestOptions::new()
        .method("POST")
        .header("x-trace", "1")
        .body("payload")
        .extra("credentials", "include");

    store
        .dispatch(fetch(
            FetchDescriptor::new("https://api.test/items").options(options.clone()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(
        fetcher.calls(),
        vec![RecordedRequest {
            url: "https://api.test/items".into(),
            options,
        }]
    );
    assert_eq!(store.get_state().notes, vec!["fetch https://api.test/items"]);
}

proptest! {
    #[test]
    fn fetcher_receives_the_options_unchanged(options in properties::request_options()) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let fetcher = MockFetcher::new();

        runtime.block_on(async {
            MiddlewareTest::new(FetchMiddleware::new(fetcher.clone()))
                .given_state(TestState::default())
                .when_action(fetch(FetchDescriptor::new("/any").options(options.clone())))
                .run()
                .result
                .unwrap()
                .settle()
                .await
                .unwrap();
        });

        prop_assert_eq!(fetcher.calls(), vec![RecordedRequest { url: "/any".into(), options }]);
    }
}

#[tokio::test]
async fn rejection_by_next_prevents_the_request() {
    let fetcher = MockFetcher::new();
    let on_success = CallbackRecorder::new();
    let on_failure = CallbackRecorder::new();

    MiddlewareTest::new(FetchMiddleware::new(fetcher.clone()))
        .given_state(TestState::default())
        .given_next_reply(NextReply::Reject(DispatchError::Rejected("busy".into())))
        .when_action(fetch(
            FetchDescriptor::new("/items")
                .with_on_success(on_success.callback())
                .with_on_failure(on_failure.callback()),
        ))
        .then_forwarded(|actions| assert_eq!(actions.len(), 1))
        .then_result(|result| {
            assert_eq!(
                result.as_ref().unwrap_err(),
                &DispatchError::Rejected("busy".into())
            );
        })
        .run();

    assert_eq!(fetcher.call_count(), 0);
    assert!(on_success.is_untouched());
    assert!(on_failure.is_untouched());
}

#[test]
fn fetch_actions_outside_a_runtime_are_rejected_untouched() {
    let fetcher = MockFetcher::new();
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::<Option<ResponseData>>::new();

    let error = store
        .dispatch(fetch(
            FetchDescriptor::new("/a").with_on_success(on_success.callback()),
        ))
        .unwrap_err();

    assert_eq!(error, DispatchError::NoRuntime);
    assert_eq!(store.get_state(), TestState::default());
    assert_eq!(fetcher.call_count(), 0);
    assert!(on_success.is_untouched());

    // Plain actions still work without a runtime
    store.dispatch(TestAction::Note("sync".into())).unwrap();
    assert_eq!(store.get_state().notes, vec!["sync"]);
}

#[tokio::test]
async fn each_dispatch_issues_its_own_request() {
    let fetcher = MockFetcher::new()
        .respond_with(MockResponse::json(&json!(1)))
        .respond_with(MockResponse::json(&json!(2)));
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();
    let descriptor = FetchDescriptor::new("/n").with_on_success(on_success.callback());

    let first = store.dispatch(fetch(descriptor.clone())).unwrap();
    let second = store.dispatch(fetch(descriptor)).unwrap();
    first.settle().await.unwrap();
    second.settle().await.unwrap();

    let mut seen: Vec<_> = on_success
        .calls()
        .into_iter()
        .map(|data| data.and_then(ResponseData::into_json).unwrap())
        .collect();
    seen.sort_by_key(|value| value.as_i64());
    assert_eq!(seen, vec![json!(1), json!(2)]);
    assert_eq!(fetcher.call_count(), 2);
}

// ============================================================================
// Success routing
// ============================================================================

#[tokio::test]
async fn json_responses_are_decoded_for_on_success() {
    let fetcher = MockFetcher::new().respond_with(
        MockResponse::empty()
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"id":7}"#),
    );
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();
    let on_failure = CallbackRecorder::<TransportError>::new();

    store
        .dispatch(fetch(
            FetchDescriptor::new("/item")
                .with_on_success(on_success.callback())
                .with_on_failure(on_failure.callback()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(on_success.calls(), vec![Some(ResponseData::Json(json!({"id": 7})))]);
    assert!(on_failure.is_untouched());
}

#[tokio::test]
async fn json_is_sniffed_across_repeated_content_type_headers() {
    let fetcher = MockFetcher::new().respond_with(
        MockResponse::empty()
            .with_header("content-type", "text/plain")
            .with_header("content-type", "application/json")
            .with_body(r#"{"x":1}"#),
    );
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();

    store
        .dispatch(fetch(
            FetchDescriptor::new("/mixed").with_on_success(on_success.callback()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(on_success.calls(), vec![Some(ResponseData::Json(json!({"x": 1})))]);
}

#[tokio::test]
async fn non_json_responses_reach_on_success_without_data() {
    let fetcher = MockFetcher::new()
        .respond_with(MockResponse::text("plain"))
        .respond_with(MockResponse::empty().with_body("no content type"));
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();
    let descriptor = FetchDescriptor::new("/text").with_on_success(on_success.callback());

    for _ in 0..2 {
        store
            .dispatch(fetch(descriptor.clone()))
            .unwrap()
            .settle()
            .await
            .unwrap();
    }

    assert_eq!(on_success.calls(), vec![None, None]);
}

#[tokio::test]
async fn error_statuses_are_still_successes() {
    let fetcher = MockFetcher::new().respond_with(
        MockResponse::json(&json!({"error": "missing"})).with_status(StatusCode::NOT_FOUND),
    );
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();
    let on_failure = CallbackRecorder::<TransportError>::new();

    store
        .dispatch(fetch(
            FetchDescriptor::new("/missing")
                .with_on_success(on_success.callback())
                .with_on_failure(on_failure.callback()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(
        on_success.calls(),
        vec![Some(ResponseData::Json(json!({"error": "missing"})))]
    );
    assert!(on_failure.is_untouched());
}

#[tokio::test]
async fn response_method_is_preferred_over_content_type() {
    let fetcher = MockFetcher::new().respond_with(MockResponse::json(&json!({"a": 1})));
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();

    store
        .dispatch(fetch(
            FetchDescriptor::new("/raw")
                .response_method("text")
                .with_on_success(on_success.callback()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(
        on_success.calls(),
        vec![Some(ResponseData::Text(r#"{"a":1}"#.into()))]
    );
}

#[tokio::test]
async fn configured_decoders_are_selectable() {
    let fetcher = MockFetcher::new().respond_with(MockResponse::text("a,b,c"));
    let config = FetchConfig::default().with_decoder("csv", |bytes: Vec<u8>| {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(ResponseData::Json(text.split(',').collect::<Vec<_>>().into()))
    });
    let store = Store::builder(TestState::default(), TestReducer)
        .middleware(FetchMiddleware::new(fetcher).with_config(config))
        .build();
    let on_success = CallbackRecorder::new();

    store
        .dispatch(fetch(
            FetchDescriptor::new("/csv")
                .response_method("csv")
                .with_on_success(on_success.callback()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(
        on_success.calls(),
        vec![Some(ResponseData::Json(json!(["a", "b", "c"])))]
    );
}

#[tokio::test]
async fn callbacks_receive_the_store_handle() {
    let fetcher = MockFetcher::new().respond_with(MockResponse::json(&json!({"id": 1})));
    let store = store_with(&fetcher);

    let on_success = Callback::new(
        |dispatch: &Dispatch<TestAction>, get_state: &GetState<TestState>, data: Option<ResponseData>| {
            // The fetch action itself was reduced before the request went out
            assert_eq!(get_state.get().notes, vec!["fetch /item"]);
            let value = data.and_then(ResponseData::into_json).unwrap_or_default();
            dispatch.send(TestAction::Received(value))?;
            Ok(())
        },
    );

    store
        .dispatch(fetch(FetchDescriptor::new("/item").with_on_success(on_success)))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(store.get_state().items, vec![json!({"id": 1})]);
}

// ============================================================================
// Failure routing
// ============================================================================

#[tokio::test]
async fn transport_errors_go_to_on_failure_only() {
    let error = TransportError::Connect("connection refused".into());
    let fetcher = MockFetcher::new().fail_with(error.clone());
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::<Option<ResponseData>>::new();
    let on_failure = CallbackRecorder::new();

    store
        .dispatch(fetch(
            FetchDescriptor::new("/down")
                .with_on_success(on_success.callback())
                .with_on_failure(on_failure.callback()),
        ))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(on_failure.calls(), vec![error]);
    assert!(on_success.is_untouched());
}

#[tokio::test]
async fn on_failure_can_dispatch_into_the_store() {
    let fetcher = MockFetcher::new().fail_with(TransportError::Timeout("30s".into()));
    let store = store_with(&fetcher);

    store
        .dispatch(fetch(FetchDescriptor::new("/slow").on_failure(
            |dispatch: &Dispatch<TestAction>, _: &GetState<TestState>, error: TransportError| {
                dispatch.send(TestAction::Failed(error.to_string()))?;
                Ok(())
            },
        )))
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(store.get_state().errors.len(), 1);
    assert!(store.get_state().errors[0].contains("30s"));
}

#[tokio::test]
async fn missing_callbacks_resolve_cleanly() {
    let fetcher = MockFetcher::new()
        .respond_with(MockResponse::json(&json!(true)))
        .fail_with(TransportError::Request("reset".into()));
    let store = store_with(&fetcher);

    let succeeded = store.dispatch(fetch(FetchDescriptor::new("/ok"))).unwrap();
    succeeded.settle().await.unwrap();

    let failed = store.dispatch(fetch(FetchDescriptor::new("/fail"))).unwrap();
    failed.settle().await.unwrap();
}

#[tokio::test]
async fn callback_errors_resolve_the_handle() {
    let fetcher = MockFetcher::new()
        .respond_with(MockResponse::empty())
        .fail_with(TransportError::Connect("refused".into()));
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::new();
    let on_failure = CallbackRecorder::new();
    let descriptor = FetchDescriptor::new("/x")
        .with_on_success(on_success.failing("bad success"))
        .with_on_failure(on_failure.failing("bad failure"));

    let success_error = store
        .dispatch(fetch(descriptor.clone()))
        .unwrap()
        .settle()
        .await
        .unwrap_err();
    let failure_error = store
        .dispatch(fetch(descriptor))
        .unwrap()
        .settle()
        .await
        .unwrap_err();

    assert!(matches!(&success_error, FetchError::Callback(e) if e.to_string() == "bad success"));
    assert!(matches!(&failure_error, FetchError::Callback(e) if e.to_string() == "bad failure"));
    assert_eq!(on_success.call_count(), 1);
    assert_eq!(on_failure.call_count(), 1);
}

#[tokio::test]
async fn decode_errors_are_not_reported_as_failures() {
    let fetcher = MockFetcher::new()
        .respond_with(MockResponse::json(&json!(null)).with_body("{not json"))
        .respond_with(
            MockResponse::json(&json!(null))
                .with_failing_body(DecodeError::Body("connection reset".into())),
        );
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::<Option<ResponseData>>::new();
    let on_failure = CallbackRecorder::<TransportError>::new();
    let descriptor = FetchDescriptor::new("/broken")
        .with_on_success(on_success.callback())
        .with_on_failure(on_failure.callback());

    let malformed = store
        .dispatch(fetch(descriptor.clone()))
        .unwrap()
        .settle()
        .await
        .unwrap_err();
    let truncated = store
        .dispatch(fetch(descriptor))
        .unwrap()
        .settle()
        .await
        .unwrap_err();

    assert!(matches!(malformed, FetchError::Decode(DecodeError::Json(_))));
    assert!(matches!(
        truncated,
        FetchError::Decode(DecodeError::Body(ref message)) if message == "connection reset"
    ));
    assert!(on_success.is_untouched());
    assert!(on_failure.is_untouched());
}

// ============================================================================
// Handles
// ============================================================================

#[tokio::test]
async fn dropped_handles_still_run_callbacks() {
    let fetcher = MockFetcher::new().respond_with(MockResponse::json(&json!("late")));
    let store = store_with(&fetcher);

    let pending = store
        .dispatch(fetch(FetchDescriptor::new("/fire-and-forget").on_success(
            |dispatch: &Dispatch<TestAction>, _: &GetState<TestState>, data: Option<ResponseData>| {
                let value = data.and_then(ResponseData::into_json).unwrap_or_default();
                dispatch.send(TestAction::Received(value))?;
                Ok(())
            },
        )))
        .unwrap();
    drop(pending);

    wait_until(|| !store.get_state().items.is_empty()).await;
    assert_eq!(store.get_state().items, vec![json!("late")]);
}

#[tokio::test]
async fn unsettled_requests_keep_the_handle_pending() {
    let fetcher = MockFetcher::new().hang();
    let store = store_with(&fetcher);
    let on_success = CallbackRecorder::<Option<ResponseData>>::new();

    let Dispatched::Pending(handle) = store
        .dispatch(fetch(
            FetchDescriptor::new("/never").with_on_success(on_success.callback()),
        ))
        .unwrap()
    else {
        panic!("fetch actions come back pending");
    };

    let mut handle = tokio_test::task::spawn(handle);
    tokio::task::yield_now().await;
    tokio_test::assert_pending!(handle.poll());
    assert!(on_success.is_untouched());
}
