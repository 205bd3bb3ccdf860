//! The execution loop.
//!
//! An execution walks the machine from `StartAt`, feeding each state's
//! output to the next state, until a state reports no successor or an error
//! stops the run. Exactly one trace entry is appended per step, and the
//! trace gathered so far is returned on every outcome.

use super::machine::StateMachine;
use super::options::ExecutionOptions;
use crate::core::{
    Delay, ExecutionError, ExecutionTrace, StateBehavior, StepContext, StepOutcome, TraceEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Terminal status of an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Output and trace of a successful execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: Uuid,
    pub output: Value,
    pub trace: ExecutionTrace,
}

impl ExecutionResult {
    pub fn status(&self) -> ExecutionStatus {
        ExecutionStatus::Succeeded
    }
}

/// An execution that did not succeed, with the trace up to the point it
/// stopped.
///
/// When the execution failed at a state, the last trace entry carries the
/// error. A cancelled execution leaves its trace untouched.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("execution {execution_id} stopped: {error}")]
pub struct ExecutionFailure {
    pub execution_id: Uuid,
    #[source]
    pub error: ExecutionError,
    pub trace: ExecutionTrace,
}

impl ExecutionFailure {
    pub fn status(&self) -> ExecutionStatus {
        match self.error {
            ExecutionError::Cancelled => ExecutionStatus::Cancelled,
            _ => ExecutionStatus::Failed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == ExecutionStatus::Cancelled
    }

    /// Name of the state the execution failed at, if it failed at one.
    pub fn failed_state(&self) -> Option<&str> {
        self.trace
            .last()
            .filter(|entry| entry.is_error())
            .map(|entry| entry.state_name.as_str())
    }
}

/// Resolved result of one step.
struct Step {
    output: Value,
    next: Option<Arc<dyn StateBehavior>>,
    delay: Option<Delay>,
}

/// Run `machine` with `input` until it terminates, fails, or `cancel` fires.
///
/// Cancellation is observed between steps and while a `Wait` delay is
/// pending, never in the middle of a state's own work.
#[instrument(
    name = "execution",
    skip(machine, input, options, cancel),
    fields(machine = %machine.name())
)]
pub async fn execute(
    machine: &StateMachine,
    input: Value,
    options: &ExecutionOptions,
    cancel: CancellationToken,
) -> Result<ExecutionResult, ExecutionFailure> {
    let execution_id = Uuid::new_v4();
    let mut trace = ExecutionTrace::new();

    info!(
        execution_id = %execution_id,
        start_at = %machine.start_at(),
        "execution_started"
    );

    let stop = |error: ExecutionError, trace: ExecutionTrace| {
        match &error {
            ExecutionError::Cancelled => {
                warn!(execution_id = %execution_id, steps = trace.len(), "execution_cancelled")
            }
            other => error!(execution_id = %execution_id, error = %other, "execution_failed"),
        }
        ExecutionFailure {
            execution_id,
            error,
            trace,
        }
    };

    let mut current = match machine.resolve(machine.start_at()) {
        Ok(state) => Arc::clone(state),
        Err(error) => return Err(stop(error, trace)),
    };
    let mut input = input;
    let mut steps = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(stop(ExecutionError::Cancelled, trace));
        }
        if let Some(limit) = options.max_steps {
            if steps >= limit {
                // The over-budget step is the one that fails.
                let error = ExecutionError::StepLimitExceeded { limit };
                let entry = TraceEntry::open(current.name(), current.state_type(), input);
                let trace = trace.record(entry.fail(&error));
                return Err(stop(error, trace));
            }
        }
        steps += 1;

        let ctx = StepContext {
            execution_id,
            step: steps,
            task_handlers: options.task_handlers(),
            scheduler: options.scheduler(),
        };
        let entry = TraceEntry::open(current.name(), current.state_type(), input.clone());

        debug!(
            execution_id = %execution_id,
            state = %current.name(),
            step = steps,
            "state_entered"
        );

        let step = current
            .execute(input, &ctx)
            .await
            .and_then(|outcome| resolve_successor(machine, outcome));

        let step = match step {
            Ok(step) => step,
            Err(error) => {
                let trace = trace.record(entry.fail(&error));
                return Err(stop(error, trace));
            }
        };

        let next_name = step.next.as_ref().map(|state| state.name().to_string());
        trace = trace.record(entry.complete(step.output.clone(), next_name.clone()));

        info!(
            execution_id = %execution_id,
            state = %current.name(),
            next = ?next_name,
            "state_completed"
        );

        if let Some(delay) = step.delay {
            tokio::select! {
                _ = options.scheduler().wait(&delay) => {}
                _ = cancel.cancelled() => {
                    return Err(stop(ExecutionError::Cancelled, trace));
                }
            }
        }

        match step.next {
            Some(next) => {
                current = next;
                input = step.output;
            }
            None => {
                info!(
                    execution_id = %execution_id,
                    steps = trace.len(),
                    "execution_succeeded"
                );
                return Ok(ExecutionResult {
                    execution_id,
                    output: step.output,
                    trace,
                });
            }
        }
    }
}

/// Turn a behavior's outcome into a step, resolving the successor by name.
fn resolve_successor(machine: &StateMachine, outcome: StepOutcome) -> Result<Step, ExecutionError> {
    let (next, output, delay) = match outcome {
        StepOutcome::Next { next, output } => (Some(next), output, None),
        StepOutcome::Wait {
            delay,
            next,
            output,
        } => (next, output, Some(delay)),
        StepOutcome::End { output } => (None, output, None),
    };

    let next = next
        .map(|name| machine.resolve(&name).map(Arc::clone))
        .transpose()?;

    Ok(Step {
        output,
        next,
        delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::ImmediateScheduler;
    use serde_json::json;
    use std::time::Duration;

    fn machine(definition: Value) -> StateMachine {
        StateMachine::from_definition(&definition).unwrap()
    }

    fn options() -> ExecutionOptions {
        ExecutionOptions::builder()
            .scheduler(Arc::new(ImmediateScheduler::new()))
            .build()
    }

    #[tokio::test]
    async fn pass_chain_produces_result_and_trace() {
        let machine = machine(json!({
            "StartAt": "S1",
            "States": {
                "S1": {"Type": "Pass", "Result": "hi", "Next": "S2"},
                "S2": {"Type": "Pass", "End": true}
            }
        }));

        let result = execute(&machine, json!({}), &options(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.output, json!("hi"));
        assert_eq!(result.trace.len(), 2);
        assert_eq!(result.trace.path(), vec!["S1", "S2"]);
        assert_eq!(result.trace.entries()[0].next_state.as_deref(), Some("S2"));
        assert_eq!(result.trace.entries()[1].input, json!("hi"));
        assert_eq!(result.trace.last().unwrap().next_state, None);
        assert_eq!(result.status(), ExecutionStatus::Succeeded);
    }

    #[tokio::test]
    async fn unknown_successor_fails_at_the_transitioning_state() {
        let machine = machine(json!({
            "StartAt": "S1",
            "States": {"S1": {"Type": "Pass", "Next": "Ghost"}}
        }));

        let failure = execute(&machine, json!({"a": 1}), &options(), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            failure.error,
            ExecutionError::UnknownState {
                name: "Ghost".to_string()
            }
        );
        assert_eq!(failure.trace.len(), 1);
        let entry = failure.trace.last().unwrap();
        assert_eq!(entry.state_name, "S1");
        assert_eq!(entry.input, json!({"a": 1}));
        assert!(entry.error.is_some());
        assert_eq!(entry.output, None);
        assert_eq!(failure.failed_state(), Some("S1"));
        assert_eq!(failure.status(), ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn cancelled_before_start_records_nothing() {
        let machine = machine(json!({
            "StartAt": "S1",
            "States": {"S1": {"Type": "Succeed"}}
        }));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = execute(&machine, json!({}), &options(), cancel)
            .await
            .unwrap_err();

        assert!(failure.is_cancelled());
        assert!(failure.trace.is_empty());
        assert_eq!(failure.failed_state(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_wait_keeps_trace_through_the_wait() {
        let machine = machine(json!({
            "StartAt": "Hold",
            "States": {
                "Hold": {"Type": "Wait", "Seconds": 3600, "Next": "Done"},
                "Done": {"Type": "Succeed"}
            }
        }));
        let options = ExecutionOptions::default();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let failure = execute(&machine, json!({}), &options, cancel)
            .await
            .unwrap_err();

        assert!(failure.is_cancelled());
        assert_eq!(failure.trace.path(), vec!["Hold"]);
        assert!(failure.trace.last().unwrap().error.is_none());
    }

    #[tokio::test]
    async fn cycles_are_bounded_by_the_step_limit() {
        let machine = machine(json!({
            "StartAt": "Ping",
            "States": {
                "Ping": {"Type": "Pass", "Next": "Pong"},
                "Pong": {"Type": "Pass", "Next": "Ping"}
            }
        }));
        let options = ExecutionOptions::builder()
            .max_steps(10)
            .scheduler(Arc::new(ImmediateScheduler::new()))
            .build();

        let failure = execute(&machine, json!({}), &options, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.error, ExecutionError::StepLimitExceeded { limit: 10 });
        assert_eq!(failure.trace.len(), 11);
        let (failed, before) = failure.trace.entries().split_last().unwrap();
        assert_eq!(failed.state_name, "Ping");
        assert!(failed.error.is_some());
        assert!(failed.output.is_none());
        assert!(before.iter().all(|entry| entry.error.is_none()));
        assert_eq!(failure.failed_state(), Some("Ping"));
    }

    #[tokio::test]
    async fn self_loop_fails_on_the_step_past_the_budget() {
        let machine = machine(json!({
            "StartAt": "A",
            "States": {"A": {"Type": "Pass", "Next": "A"}}
        }));
        let options = ExecutionOptions::builder()
            .max_steps(3)
            .scheduler(Arc::new(ImmediateScheduler::new()))
            .build();

        let failure = execute(&machine, json!({"n": 1}), &options, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.trace.len(), 4);
        let last = failure.trace.last().unwrap();
        assert_eq!(last.input, json!({"n": 1}));
        assert_eq!(last.error.as_deref(), Some("step limit of 3 exceeded"));
        assert_eq!(failure.trace.failed_entry(), Some(last));
    }

    #[tokio::test]
    async fn wait_delay_is_handed_to_the_scheduler() {
        let machine = machine(json!({
            "StartAt": "Hold",
            "States": {"Hold": {"Type": "Wait", "Seconds": 90, "End": true}}
        }));
        let scheduler = Arc::new(ImmediateScheduler::new());
        let options = ExecutionOptions::builder()
            .scheduler(scheduler.clone())
            .build();

        let result = execute(&machine, json!({"k": "v"}), &options, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.output, json!({"k": "v"}));
        assert_eq!(
            scheduler.recorded(),
            vec![Delay::For(Duration::from_secs(90))]
        );
    }
}
