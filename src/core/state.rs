//! The contract every state behavior implements.
//!
//! The execution loop knows nothing about individual state types. It hands
//! each behavior its input and a [`StepContext`], and reads back a
//! [`StepOutcome`] or an [`ExecutionError`].

use super::error::ExecutionError;
use super::schedule::{Delay, WaitScheduler};
use super::task::TaskHandlers;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use uuid::Uuid;

/// What a state produced in one step.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// Continue with the named state.
    Next { next: String, output: Value },

    /// Pause, then continue with `next` (or finish when `next` is `None`).
    Wait {
        delay: Delay,
        next: Option<String>,
        output: Value,
    },

    /// The execution completed successfully at this state.
    End { output: Value },
}

impl StepOutcome {
    /// `Next` when a successor is given, `End` otherwise.
    pub fn advance(next: Option<String>, output: Value) -> Self {
        match next {
            Some(next) => Self::Next { next, output },
            None => Self::End { output },
        }
    }

    pub fn output(&self) -> &Value {
        match self {
            Self::Next { output, .. } | Self::Wait { output, .. } | Self::End { output } => output,
        }
    }

    /// The successor state, if any.
    pub fn next(&self) -> Option<&str> {
        match self {
            Self::Next { next, .. } => Some(next.as_str()),
            Self::Wait { next, .. } => next.as_deref(),
            Self::End { .. } => None,
        }
    }

    /// True when the execution ends after this step.
    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

/// Per-step environment handed to a behavior.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// Identifier of the running execution.
    pub execution_id: Uuid,
    /// One-based step number.
    pub step: usize,
    /// Handlers available to `Task` states.
    pub task_handlers: &'a TaskHandlers,
    /// Scheduler for delays a behavior honors inside its own step,
    /// such as task retry intervals.
    pub scheduler: &'a dyn WaitScheduler,
}

/// Runtime unit implementing one state's type-specific logic.
///
/// Behaviors are constructed once at load time and shared read-only by
/// every execution of the owning state machine, so `execute` takes `&self`.
/// Successors are referenced by name; the loop resolves them.
#[async_trait]
pub trait StateBehavior: Send + Sync + Debug {
    /// Name of the state in the definition.
    fn name(&self) -> &str;

    /// The definition's `Type` for this state.
    fn state_type(&self) -> &str;

    /// Run one step.
    async fn execute(
        &self,
        input: Value,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError>;
}
