//! The interpreter facade: load a definition, execute it with input.

use super::executor::{self, ExecutionFailure, ExecutionResult};
use super::machine::MachineHandle;
use super::options::ExecutionOptions;
use crate::definition::{self, DefinitionError, StateRegistry};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Entry point for callers such as an HTTP front end.
///
/// An interpreter pairs a state type registry (used when loading) with
/// execution options (used when running). It holds no per-execution state
/// and can be shared across tasks.
///
/// # Example
///
/// ```rust
/// use stepgraph::Interpreter;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let interpreter = Interpreter::new();
/// let handle = interpreter
///     .load_definition(&json!({
///         "StartAt": "Hello",
///         "States": { "Hello": { "Type": "Pass", "Result": "Hello, World!", "End": true } }
///     }))
///     .unwrap();
///
/// let result = interpreter.execute(&handle, json!({})).await.unwrap();
/// assert_eq!(result.output, json!("Hello, World!"));
/// assert_eq!(result.trace.len(), 1);
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Interpreter {
    registry: StateRegistry,
    options: ExecutionOptions,
}

impl Interpreter {
    /// An interpreter with the built-in state types and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom state type registry for subsequent loads.
    pub fn with_registry(mut self, registry: StateRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use custom execution options for subsequent executions.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Parse and validate a definition, returning a handle for execution.
    pub fn load_definition(&self, raw: &Value) -> Result<MachineHandle, DefinitionError> {
        let machine = definition::load(raw, &self.registry)?;
        let handle = MachineHandle::new(machine);

        info!(
            machine = %handle.name(),
            handle_id = %handle.id(),
            "definition_registered"
        );

        Ok(handle)
    }

    /// Run a loaded machine to completion.
    pub async fn execute(
        &self,
        handle: &MachineHandle,
        input: Value,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        self.execute_with_cancel(handle, input, CancellationToken::new())
            .await
    }

    /// Run a loaded machine, stopping between steps once `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        handle: &MachineHandle,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        executor::execute(handle.machine(), input, &self.options, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{handler_fn, ExecutionError};
    use crate::engine::scheduler::ImmediateScheduler;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn load_then_execute() {
        let interpreter = Interpreter::new();
        let handle = interpreter
            .load_definition(&json!({
                "StartAt": "A",
                "States": {"A": {"Type": "Pass", "Result": {"ok": true}, "End": true}}
            }))
            .unwrap();

        let result = interpreter.execute(&handle, json!({})).await.unwrap();
        assert_eq!(result.output, json!({"ok": true}));
    }

    #[tokio::test]
    async fn one_handle_runs_concurrently() {
        let interpreter = Interpreter::new().with_options(
            ExecutionOptions::builder()
                .scheduler(Arc::new(ImmediateScheduler::new()))
                .task(
                    "inc",
                    handler_fn(|input: Value| async move {
                        tokio::task::yield_now().await;
                        Ok(json!(input.as_i64().unwrap_or_default() + 1))
                    }),
                )
                .build(),
        );
        let handle = interpreter
            .load_definition(&json!({
                "StartAt": "Inc",
                "States": {"Inc": {"Type": "Task", "Resource": "inc", "End": true}}
            }))
            .unwrap();

        let runs: Vec<_> = (0..8)
            .map(|n| {
                let interpreter = interpreter.clone();
                let handle = handle.clone();
                tokio::spawn(async move { interpreter.execute(&handle, json!(n)).await })
            })
            .collect();

        for (n, run) in runs.into_iter().enumerate() {
            let result = run.await.unwrap().unwrap();
            assert_eq!(result.output, json!(n as i64 + 1));
        }
    }

    #[tokio::test]
    async fn configured_failure_is_distinguishable() {
        let interpreter = Interpreter::new();
        let handle = interpreter
            .load_definition(&json!({
                "StartAt": "Reject",
                "States": {"Reject": {"Type": "Fail", "Error": "Rejected", "Cause": "policy"}}
            }))
            .unwrap();

        let failure = interpreter.execute(&handle, json!({})).await.unwrap_err();
        assert!(failure.error.is_configured_failure());
        assert_eq!(
            failure.error,
            ExecutionError::ConfiguredFailure {
                error: Some("Rejected".to_string()),
                cause: Some("policy".to_string()),
            }
        );
        assert_eq!(failure.failed_state(), Some("Reject"));
    }
}
