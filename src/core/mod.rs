//! Core interpreter types.
//!
//! This module contains the pieces every other layer builds on:
//! - The `StateBehavior` contract and the `StepOutcome` it produces
//! - Trace recording (`TraceEntry`, `ExecutionTrace`)
//! - The execution-time error taxonomy
//! - Reference paths into JSON input
//! - Task handler and wait scheduler seams
//!
//! Nothing here knows about individual state types or about the loop
//! that drives an execution.

mod error;
mod history;
mod schedule;
mod state;
mod task;
mod value;

pub use error::{ExecutionError, ALL_ERRORS, RUNTIME_ERROR, TASK_FAILED, TIMEOUT};
pub use history::{ExecutionTrace, TraceEntry};
pub use schedule::{Delay, WaitScheduler};
pub use state::{StateBehavior, StepContext, StepOutcome};
pub use task::{handler_fn, FnHandler, TaskError, TaskHandler, TaskHandlers};
pub use value::{PathError, ReferencePath};
