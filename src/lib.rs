//! Stepgraph: an interpreter for declarative state machine definitions
//!
//! A definition names its states, gives each a `Type`, and links them by
//! name. Stepgraph loads such a definition into an immutable state machine
//! and drives executions over it, producing a final output and an ordered
//! trace with one entry per visited state. On failure the trace gathered so
//! far travels with the error.
//!
//! # Core Concepts
//!
//! - **StateBehavior**: the single `execute` contract every state type implements
//! - **StateRegistry**: maps a `Type` string to a constructor, consulted only at load
//! - **StateMachine**: the loaded graph; shared read-only by concurrent executions
//! - **ExecutionTrace**: ordered history of one execution
//! - **Interpreter**: the `load_definition` / `execute` facade
//!
//! # Example
//!
//! ```rust
//! use stepgraph::Interpreter;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let interpreter = Interpreter::new();
//! let handle = interpreter
//!     .load_definition(&json!({
//!         "Comment": "greeting",
//!         "StartAt": "S1",
//!         "States": {
//!             "S1": { "Type": "Pass", "Result": "hi", "Next": "S2" },
//!             "S2": { "Type": "Pass", "End": true }
//!         }
//!     }))
//!     .unwrap();
//!
//! let result = interpreter.execute(&handle, json!({})).await.unwrap();
//! assert_eq!(result.output, json!("hi"));
//! assert_eq!(result.trace.path(), vec!["S1", "S2"]);
//! assert!(result.trace.last().unwrap().next_state.is_none());
//! # }
//! ```

pub mod core;
pub mod definition;
pub mod engine;
pub mod states;

// Re-export commonly used types
pub use crate::core::{
    ExecutionError, ExecutionTrace, StateBehavior, StepContext, StepOutcome, TaskError,
    TaskHandler, TraceEntry,
};
pub use definition::{load, Definition, DefinitionError, StateRegistry};
pub use engine::{
    ExecutionFailure, ExecutionOptions, ExecutionResult, ExecutionStatus, Interpreter,
    MachineHandle, MachineRegistry, StateMachine,
};
