//! A small store domain shared by the workspace's tests

use composable_fetch_core::action::{FetchAction, FetchDescriptor};
use composable_fetch_core::reducer::Reducer;
use serde_json::Value;

/// State that records everything the reducer saw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestState {
    /// Payloads from [`TestAction::Received`]
    pub items: Vec<Value>,
    /// Messages from [`TestAction::Failed`]
    pub errors: Vec<String>,
    /// Notes, plus one `"fetch <url>"` entry per reduced fetch action
    pub notes: Vec<String>,
}

/// Actions for [`TestState`]
#[derive(Debug, Clone, PartialEq)]
pub enum TestAction {
    /// Issue a request
    Fetch(FetchDescriptor<TestState, TestAction>),
    /// A payload arrived
    Received(Value),
    /// Something failed
    Failed(String),
    /// Free-form marker
    Note(String),
}

impl FetchAction<TestState> for TestAction {
    fn fetch_descriptor(&self) -> Option<&FetchDescriptor<TestState, Self>> {
        match self {
            Self::Fetch(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Reducer for [`TestState`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TestReducer;

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;

    fn reduce(&self, state: &mut TestState, action: TestAction) {
        match action {
            TestAction::Fetch(descriptor) => state.notes.push(format!("fetch {}", descriptor.url)),
            TestAction::Received(value) => state.items.push(value),
            TestAction::Failed(message) => state.errors.push(message),
            TestAction::Note(note) => state.notes.push(note),
        }
    }
}
