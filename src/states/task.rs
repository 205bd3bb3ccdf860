//! `Task`: invoke an external action through a registered handler.
//!
//! A task is the one place an execution waits on the outside world, so it
//! is also where failure handling lives. Each attempt may be bounded by
//! `TimeoutSeconds`. A failed attempt is retried by the first matching
//! `Retry` rule until that rule's attempts run out. An error that survives
//! retries is handed to the first matching `Catch` rule, which turns it
//! into an ordinary transition. The execution loop never retries anything.

use super::io::{IoPaths, PathSetting};
use crate::core::{
    Delay, ExecutionError, StateBehavior, StepContext, StepOutcome, TaskHandler, ALL_ERRORS,
    TASK_FAILED,
};
use crate::definition::DefinitionError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

fn default_max_attempts() -> u32 {
    3
}

fn default_interval_seconds() -> f64 {
    1.0
}

fn default_backoff_rate() -> f64 {
    2.0
}

/// True when `names` selects `error`.
///
/// `States.ALL` selects everything; `States.TaskFailed` selects any failure
/// reported by a handler.
fn selects(names: &[String], error: &ExecutionError) -> bool {
    let name = error.error_name();
    names.iter().any(|candidate| {
        candidate == ALL_ERRORS
            || candidate == name
            || (candidate == TASK_FAILED && matches!(error, ExecutionError::TaskFailed { .. }))
    })
}

/// One `Retry` rule.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Retrier {
    pub error_equals: Vec<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: f64,
    #[serde(default = "default_backoff_rate")]
    pub backoff_rate: f64,
}

impl Retrier {
    fn validate(&self, state: &str) -> Result<(), DefinitionError> {
        if self.error_equals.is_empty() {
            return Err(DefinitionError::invalid(state, "Retry: ErrorEquals must not be empty"));
        }
        if !self.interval_seconds.is_finite() || self.interval_seconds < 0.0 {
            return Err(DefinitionError::invalid(
                state,
                "Retry: IntervalSeconds must be a non-negative number",
            ));
        }
        if !self.backoff_rate.is_finite() || self.backoff_rate < 1.0 {
            return Err(DefinitionError::invalid(
                state,
                "Retry: BackoffRate must be at least 1.0",
            ));
        }
        Ok(())
    }

    pub fn matches(&self, error: &ExecutionError) -> bool {
        selects(&self.error_equals, error)
    }

    /// Pause before retry number `retry` (zero-based).
    pub fn interval(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let seconds = self.interval_seconds * self.backoff_rate.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// One `Catch` rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Catcher {
    pub error_equals: Vec<String>,
    pub next: String,
    pub result_path: PathSetting,
}

impl Catcher {
    fn from_config(state: &str, config: &Value) -> Result<Self, DefinitionError> {
        let error_equals: Vec<String> = super::field(state, config, "ErrorEquals")?
            .ok_or_else(|| DefinitionError::invalid(state, "Catch: ErrorEquals is required"))?;
        if error_equals.is_empty() {
            return Err(DefinitionError::invalid(state, "Catch: ErrorEquals must not be empty"));
        }

        let next = match config.get("Next") {
            Some(Value::String(next)) => next.clone(),
            _ => return Err(DefinitionError::invalid(state, "Catch: Next must be a string")),
        };

        Ok(Self {
            error_equals,
            next,
            result_path: PathSetting::from_config(state, config, "ResultPath")?,
        })
    }

    pub fn matches(&self, error: &ExecutionError) -> bool {
        selects(&self.error_equals, error)
    }
}

/// Invokes the handler registered for `Resource`.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskState {
    name: String,
    resource: String,
    next: Option<String>,
    io: IoPaths,
    timeout_seconds: Option<u64>,
    retry: Vec<Retrier>,
    catch: Vec<Catcher>,
}

impl TaskState {
    pub fn from_config(name: &str, config: &Value) -> Result<Self, DefinitionError> {
        let resource = match config.get("Resource") {
            Some(Value::String(resource)) => resource.clone(),
            Some(_) => return Err(DefinitionError::invalid(name, "Resource must be a string")),
            None => return Err(DefinitionError::invalid(name, "Resource is required")),
        };

        let timeout_seconds: Option<u64> = super::field(name, config, "TimeoutSeconds")?;
        if timeout_seconds == Some(0) {
            return Err(DefinitionError::invalid(name, "TimeoutSeconds must be positive"));
        }

        let retry: Vec<Retrier> = super::field(name, config, "Retry")?.unwrap_or_default();
        for retrier in &retry {
            retrier.validate(name)?;
        }

        let catch = match config.get("Catch") {
            None => Vec::new(),
            Some(Value::Array(catchers)) => catchers
                .iter()
                .map(|catcher| Catcher::from_config(name, catcher))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(DefinitionError::invalid(name, "Catch must be an array")),
        };

        Ok(Self {
            name: name.to_string(),
            resource,
            next: super::successor(name, config)?,
            io: IoPaths::from_config(name, config)?,
            timeout_seconds,
            retry,
            catch,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn retriers(&self) -> &[Retrier] {
        &self.retry
    }

    pub fn catchers(&self) -> &[Catcher] {
        &self.catch
    }

    async fn attempt(
        &self,
        handler: Option<&Arc<dyn TaskHandler>>,
        input: Value,
    ) -> Result<Value, ExecutionError> {
        let Some(handler) = handler else {
            return Err(ExecutionError::TaskFailed {
                state: self.name.clone(),
                error: TASK_FAILED.to_string(),
                cause: format!("no handler registered for resource '{}'", self.resource),
            });
        };

        let call = handler.invoke(input);
        let result = match self.timeout_seconds {
            Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), call)
                .await
                .map_err(|_| ExecutionError::TaskTimedOut {
                    state: self.name.clone(),
                    seconds,
                })?,
            None => call.await,
        };

        result.map_err(|e| ExecutionError::TaskFailed {
            state: self.name.clone(),
            error: e.error,
            cause: e.cause,
        })
    }

    async fn invoke_with_retry(
        &self,
        input: Value,
        ctx: &StepContext<'_>,
    ) -> Result<Value, ExecutionError> {
        let handler = ctx.task_handlers.get(&self.resource);
        let mut retries = vec![0u32; self.retry.len()];

        loop {
            let error = match self.attempt(handler.as_ref(), input.clone()).await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            let Some(index) = self.retry.iter().position(|retrier| retrier.matches(&error))
            else {
                return Err(error);
            };
            let retrier = &self.retry[index];
            if retries[index] >= retrier.max_attempts {
                return Err(error);
            }

            let interval = retrier.interval(retries[index]);
            retries[index] += 1;
            warn!(
                execution_id = %ctx.execution_id,
                state = %self.name,
                error = %error.error_name(),
                retry = retries[index],
                interval_ms = interval.as_millis() as u64,
                "task_retry"
            );
            ctx.scheduler.wait(&Delay::For(interval)).await;
        }
    }
}

#[async_trait]
impl StateBehavior for TaskState {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_type(&self) -> &str {
        "Task"
    }

    async fn execute(
        &self,
        input: Value,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError> {
        let effective = self.io.effective_input(&self.name, &input)?;

        match self.invoke_with_retry(effective, ctx).await {
            Ok(result) => {
                let output = self.io.output(&self.name, input, result)?;
                Ok(StepOutcome::advance(self.next.clone(), output))
            }
            Err(error) => {
                let Some(catcher) = self.catch.iter().find(|catcher| catcher.matches(&error))
                else {
                    return Err(error);
                };

                debug!(
                    execution_id = %ctx.execution_id,
                    state = %self.name,
                    error = %error.error_name(),
                    next = %catcher.next,
                    "task_error_caught"
                );
                let caught = json!({"Error": error.error_name(), "Cause": error.cause()});
                let output = catcher.result_path.merge(&self.name, input, caught)?;
                Ok(StepOutcome::Next {
                    next: catcher.next.clone(),
                    output,
                })
            }
        }
    }
}
