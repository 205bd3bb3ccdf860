//! Execution-time error taxonomy.

use thiserror::Error;

/// Error name reported for failures the engine raises itself.
pub const RUNTIME_ERROR: &str = "States.Runtime";
/// Wildcard accepted by `Retry` and `Catch` rules.
pub const ALL_ERRORS: &str = "States.ALL";
/// Generic task failure name.
pub const TASK_FAILED: &str = "States.TaskFailed";
/// Name reported when a task attempt exceeds its timeout.
pub const TIMEOUT: &str = "States.Timeout";

/// Errors that stop an execution.
///
/// Every variant except [`ConfiguredFailure`](Self::ConfiguredFailure) and
/// [`Cancelled`](Self::Cancelled) indicates a problem with the definition or
/// an external collaborator. A `ConfiguredFailure` is the designed outcome of
/// reaching a `Fail` state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("state '{name}' not found")]
    UnknownState { name: String },

    #[error("no choice rule matched in state '{state}' and no default is configured")]
    NoMatchingChoice { state: String },

    #[error("{}", describe_failure(.error.as_deref(), .cause.as_deref()))]
    ConfiguredFailure {
        error: Option<String>,
        cause: Option<String>,
    },

    #[error("task in state '{state}' failed with {error}: {cause}")]
    TaskFailed {
        state: String,
        error: String,
        cause: String,
    },

    #[error("task in state '{state}' timed out after {seconds}s")]
    TaskTimedOut { state: String, seconds: u64 },

    #[error("state '{state}' could not process its data: {message}")]
    InvalidPath { state: String, message: String },

    #[error("state '{state}' could not compute its wait: {message}")]
    InvalidWait { state: String, message: String },

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: usize },

    #[error("execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// The error name used when matching `Retry`/`Catch` rules.
    pub fn error_name(&self) -> &str {
        match self {
            Self::NoMatchingChoice { .. } => "States.NoChoiceMatched",
            Self::ConfiguredFailure { error, .. } => error.as_deref().unwrap_or("States.Failed"),
            Self::TaskFailed { error, .. } => error.as_str(),
            Self::TaskTimedOut { .. } => TIMEOUT,
            Self::Cancelled => "States.Cancelled",
            Self::UnknownState { .. }
            | Self::InvalidPath { .. }
            | Self::InvalidWait { .. }
            | Self::StepLimitExceeded { .. } => RUNTIME_ERROR,
        }
    }

    /// Human-readable cause, as placed in caught error output.
    pub fn cause(&self) -> String {
        match self {
            Self::TaskFailed { cause, .. } => cause.clone(),
            Self::ConfiguredFailure { cause, .. } => cause.clone().unwrap_or_default(),
            other => other.to_string(),
        }
    }

    /// True when a `Fail` state ended the execution on purpose.
    pub fn is_configured_failure(&self) -> bool {
        matches!(self, Self::ConfiguredFailure { .. })
    }
}

fn describe_failure(error: Option<&str>, cause: Option<&str>) -> String {
    match (error, cause) {
        (Some(error), Some(cause)) => format!("execution failed with {error}: {cause}"),
        (Some(error), None) => format!("execution failed with {error}"),
        (None, Some(cause)) => format!("execution failed: {cause}"),
        (None, None) => "execution failed".to_string(),
    }
}
