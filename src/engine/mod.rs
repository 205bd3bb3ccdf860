//! The execution shell around the core types.
//!
//! This module drives executions: it owns loaded state machines, the
//! step loop, scheduling of delays, cancellation, and the process-wide
//! table of named machines.
//!
//! # Key Concepts
//!
//! - **StateMachine**: immutable graph produced by the loader
//! - **Interpreter**: `load_definition` and `execute`, the two operations
//!   a front end calls
//! - **ExecutionOptions**: step budget, wait scheduler, task handlers
//! - **MachineRegistry**: named machines, replaced atomically on reload

mod executor;
mod interpreter;
mod machine;
mod options;
mod registry;
mod scheduler;

pub use executor::{execute, ExecutionFailure, ExecutionResult, ExecutionStatus};
pub use interpreter::Interpreter;
pub use machine::{MachineHandle, StateMachine};
pub use options::{ExecutionOptions, ExecutionOptionsBuilder, DEFAULT_MAX_STEPS};
pub use registry::{MachineRegistry, RegistryError};
pub use scheduler::{ImmediateScheduler, TokioScheduler};
