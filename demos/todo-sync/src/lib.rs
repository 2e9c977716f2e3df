//! # Todo Sync Example
//!
//! A todo list whose contents are loaded from an HTTP endpoint by the fetch
//! middleware.
//!
//! This example showcases:
//! - Actions carrying a [`FetchDescriptor`]
//! - Callbacks that turn responses into follow-up actions
//! - A second middleware composed in front of the fetch middleware
//!
//! ## Flow
//!
//! 1. `Load` reaches the reducer (status becomes `Loading`) and the request goes out
//! 2. A JSON array of todos arrives and `on_success` dispatches `Loaded`
//! 3. Anything else ends in `LoadFailed`, including transport errors via `on_failure`
//!
//! ## Example
//!
//! ```no_run
//! use todo_sync::{load_todos, todo_store};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = todo_store();
//! store
//!     .dispatch(load_todos("https://jsonplaceholder.typicode.com/todos"))?
//!     .settle()
//!     .await?;
//!
//! println!("{} todos", store.state(|s| s.todos.len()));
//! # Ok(())
//! # }
//! ```

use composable_fetch_core::action::{FetchAction, FetchDescriptor};
use composable_fetch_core::error::{CallbackError, TransportError};
use composable_fetch_core::middleware::{Dispatch, GetState, Middleware, MiddlewareApi, Next, from_fn};
use composable_fetch_core::reducer::Reducer;
use composable_fetch_core::request::RequestOptions;
use composable_fetch_core::response::ResponseData;
use composable_fetch_runtime::{FetchMiddleware, Store};
use serde::{Deserialize, Serialize};

/// A single todo item as served by the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Identifier assigned by the server
    pub id: u64,
    /// What needs doing
    pub title: String,
    /// Whether it is done
    #[serde(default)]
    pub completed: bool,
}

/// Where the list stands with respect to the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A load is in flight
    Loading,
    /// The last load succeeded
    Loaded,
    /// The last load failed
    Failed(String),
}

/// Todo list state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoState {
    /// Items from the last successful load
    pub todos: Vec<Todo>,
    /// Sync status
    pub status: SyncStatus,
}

impl TodoState {
    /// Number of items not yet completed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.completed).count()
    }
}

/// Todo list actions
#[derive(Debug, Clone, PartialEq)]
pub enum TodoAction {
    /// Fetch the list
    Load(FetchDescriptor<TodoState, TodoAction>),
    /// The list arrived
    Loaded(Vec<Todo>),
    /// The list could not be loaded
    LoadFailed(String),
    /// Flip an item's completion locally
    Toggle(u64),
}

impl FetchAction<TodoState> for TodoAction {
    fn fetch_descriptor(&self) -> Option<&FetchDescriptor<TodoState, Self>> {
        match self {
            Self::Load(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Todo list reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct TodoReducer;

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;

    fn reduce(&self, state: &mut TodoState, action: TodoAction) {
        match action {
            TodoAction::Load(_) => state.status = SyncStatus::Loading,
            TodoAction::Loaded(todos) => {
                state.todos = todos;
                state.status = SyncStatus::Loaded;
            },
            TodoAction::LoadFailed(reason) => state.status = SyncStatus::Failed(reason),
            TodoAction::Toggle(id) => {
                if let Some(todo) = state.todos.iter_mut().find(|todo| todo.id == id) {
                    todo.completed = !todo.completed;
                }
            },
        }
    }
}

/// The action that loads the list from `url`
pub fn load_todos(url: impl Into<String>) -> TodoAction {
    TodoAction::Load(
        FetchDescriptor::new(url)
            .options(RequestOptions::new().header("accept", "application/json"))
            .on_success(todos_received)
            .on_failure(todos_unavailable),
    )
}

fn todos_received(
    dispatch: &Dispatch<TodoAction>,
    _get_state: &GetState<TodoState>,
    data: Option<ResponseData>,
) -> Result<(), CallbackError> {
    let Some(json) = data.and_then(ResponseData::into_json) else {
        dispatch.send(TodoAction::LoadFailed("response was not JSON".to_string()))?;
        return Ok(());
    };

    let action = match serde_json::from_value::<Vec<Todo>>(json) {
        Ok(todos) => TodoAction::Loaded(todos),
        Err(e) => TodoAction::LoadFailed(format!("unexpected payload: {e}")),
    };
    dispatch.send(action)?;
    Ok(())
}

fn todos_unavailable(
    dispatch: &Dispatch<TodoAction>,
    _get_state: &GetState<TodoState>,
    error: TransportError,
) -> Result<(), CallbackError> {
    dispatch.send(TodoAction::LoadFailed(error.to_string()))?;
    Ok(())
}

/// Middleware that traces every action on its way to the reducer
pub fn action_logger() -> impl Middleware<TodoState, TodoAction> {
    from_fn(
        |api: &MiddlewareApi<TodoState, TodoAction>, next: Next<'_, TodoAction>, action: TodoAction| {
            let kind = match &action {
                TodoAction::Load(descriptor) => format!("Load({})", descriptor.url),
                TodoAction::Loaded(todos) => format!("Loaded({})", todos.len()),
                TodoAction::LoadFailed(_) => "LoadFailed".to_string(),
                TodoAction::Toggle(id) => format!("Toggle({id})"),
            };
            let before = api.get_state.get().status;
            let result = next(action);
            tracing::info!(action = %kind, ?before, after = ?api.get_state.get().status, "Action processed");
            result
        },
    )
}

/// Store wired with the action logger and the default fetch middleware
#[must_use]
pub fn todo_store() -> Store<TodoState, TodoAction, TodoReducer> {
    todo_store_with(FetchMiddleware::default())
}

/// Store wired with the action logger and the given fetch middleware
#[must_use]
pub fn todo_store_with(fetch: FetchMiddleware) -> Store<TodoState, TodoAction, TodoReducer> {
    Store::builder(TodoState::default(), TodoReducer)
        .middleware(action_logger())
        .middleware(fetch)
        .build()
}
