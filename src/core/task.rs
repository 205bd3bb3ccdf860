//! External actions invoked by `Task` states.
//!
//! A `Task` state names a `Resource`; the resource is looked up in the
//! [`TaskHandlers`] supplied with the execution options. Handlers are async
//! and may be slow or fail; the engine treats them as the one place an
//! execution suspends on the outside world.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a task handler.
///
/// `error` is the name matched by `Retry`/`Catch` rules, `cause` is free text.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
#[error("{error}: {cause}")]
pub struct TaskError {
    pub error: String,
    pub cause: String,
}

impl TaskError {
    pub fn new(error: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            cause: cause.into(),
        }
    }
}

/// An external action a `Task` state can invoke.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run the action with the state's effective input.
    async fn invoke(&self, input: Value) -> Result<Value, TaskError>;
}

/// Adapter turning an async closure into a [`TaskHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    async fn invoke(&self, input: Value) -> Result<Value, TaskError> {
        (self.0)(input).await
    }
}

/// Wrap an async closure as a task handler.
///
/// # Example
///
/// ```rust
/// use stepgraph::core::{handler_fn, TaskHandlers};
/// use serde_json::{json, Value};
///
/// let handlers = TaskHandlers::new().with(
///     "greet",
///     handler_fn(|input: Value| async move { Ok(json!({"greeting": input})) }),
/// );
/// assert!(handlers.get("greet").is_some());
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    FnHandler(f)
}

/// Resource name to handler table.
#[derive(Clone, Default)]
pub struct TaskHandlers {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the updated table.
    pub fn with<H>(mut self, resource: impl Into<String>, handler: H) -> Self
    where
        H: TaskHandler + 'static,
    {
        self.insert(resource, Arc::new(handler));
        self
    }

    /// Register or replace a handler.
    pub fn insert(&mut self, resource: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(resource.into(), handler);
    }

    pub fn get(&self, resource: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(resource).cloned()
    }

    /// Registered resource names, sorted.
    pub fn resources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TaskHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandlers")
            .field("resources", &self.resources())
            .finish()
    }
}
