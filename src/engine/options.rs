//! Execution options and their builder.

use super::scheduler::TokioScheduler;
use crate::core::{TaskHandler, TaskHandlers, WaitScheduler};
use std::sync::Arc;

/// Default step budget.
pub const DEFAULT_MAX_STEPS: usize = 25_000;

/// Settings shared by every execution an interpreter starts.
#[derive(Clone, Debug)]
pub struct ExecutionOptions {
    pub(crate) max_steps: Option<usize>,
    pub(crate) scheduler: Arc<dyn WaitScheduler>,
    pub(crate) task_handlers: TaskHandlers,
}

impl ExecutionOptions {
    pub fn builder() -> ExecutionOptionsBuilder {
        ExecutionOptionsBuilder::new()
    }

    /// Maximum number of steps before an execution is stopped.
    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    pub fn scheduler(&self) -> &dyn WaitScheduler {
        self.scheduler.as_ref()
    }

    pub fn task_handlers(&self) -> &TaskHandlers {
        &self.task_handlers
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptionsBuilder::new().build()
    }
}

/// Builder for [`ExecutionOptions`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use stepgraph::engine::{ExecutionOptions, ImmediateScheduler};
///
/// let options = ExecutionOptions::builder()
///     .max_steps(100)
///     .scheduler(Arc::new(ImmediateScheduler::new()))
///     .build();
///
/// assert_eq!(options.max_steps(), Some(100));
/// ```
pub struct ExecutionOptionsBuilder {
    max_steps: Option<usize>,
    scheduler: Arc<dyn WaitScheduler>,
    task_handlers: TaskHandlers,
}

impl ExecutionOptionsBuilder {
    pub fn new() -> Self {
        Self {
            max_steps: Some(DEFAULT_MAX_STEPS),
            scheduler: Arc::new(TokioScheduler),
            task_handlers: TaskHandlers::new(),
        }
    }

    /// Set the step budget.
    pub fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Remove the step budget. Cyclic definitions may then run forever.
    pub fn unbounded(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Set the scheduler that honors `Wait` delays and retry intervals.
    pub fn scheduler(mut self, scheduler: Arc<dyn WaitScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Register a handler for a `Task` resource.
    pub fn task<H>(mut self, resource: impl Into<String>, handler: H) -> Self
    where
        H: TaskHandler + 'static,
    {
        self.task_handlers.insert(resource, Arc::new(handler));
        self
    }

    /// Replace the whole handler table.
    pub fn task_handlers(mut self, handlers: TaskHandlers) -> Self {
        self.task_handlers = handlers;
        self
    }

    pub fn build(self) -> ExecutionOptions {
        ExecutionOptions {
            max_steps: self.max_steps,
            scheduler: self.scheduler,
            task_handlers: self.task_handlers,
        }
    }
}

impl Default for ExecutionOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
