//! `Wait`: pause for a fixed or input-derived delay.
//!
//! The state never sleeps itself. It returns a [`Delay`] that the executor
//! hands to the configured scheduler.

use super::io::IoPaths;
use crate::core::{Delay, ExecutionError, ReferencePath, StateBehavior, StepContext, StepOutcome};
use crate::definition::DefinitionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// How a `Wait` state computes its delay.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitTime {
    Seconds(u64),
    SecondsPath(ReferencePath),
    Timestamp(DateTime<Utc>),
    TimestampPath(ReferencePath),
}

impl WaitTime {
    fn from_config(state: &str, config: &Value) -> Result<Self, DefinitionError> {
        let forms: Vec<&str> = ["Seconds", "SecondsPath", "Timestamp", "TimestampPath"]
            .into_iter()
            .filter(|key| config.get(*key).is_some())
            .collect();

        let form = match forms.as_slice() {
            [form] => *form,
            [] => {
                return Err(DefinitionError::invalid(
                    state,
                    "one of Seconds, SecondsPath, Timestamp or TimestampPath is required",
                ))
            }
            _ => {
                return Err(DefinitionError::invalid(
                    state,
                    format!("only one wait form may be given, found {}", forms.join(", ")),
                ))
            }
        };

        let invalid = |message: &str| DefinitionError::invalid(state, format!("{form}: {message}"));
        let raw = &config[form];
        match form {
            "Seconds" => raw
                .as_u64()
                .map(Self::Seconds)
                .ok_or_else(|| invalid("must be a non-negative integer")),
            "Timestamp" => raw
                .as_str()
                .and_then(parse_timestamp)
                .map(Self::Timestamp)
                .ok_or_else(|| invalid("must be an RFC 3339 timestamp")),
            _ => {
                let path = raw.as_str().ok_or_else(|| invalid("must be a string"))?;
                let path = ReferencePath::parse(path).map_err(|e| invalid(&e.to_string()))?;
                Ok(if form == "SecondsPath" {
                    Self::SecondsPath(path)
                } else {
                    Self::TimestampPath(path)
                })
            }
        }
    }

    /// Compute the delay against the state's effective input.
    pub fn delay(&self, state: &str, input: &Value) -> Result<Delay, ExecutionError> {
        let invalid = |message: String| ExecutionError::InvalidWait {
            state: state.to_string(),
            message,
        };

        match self {
            Self::Seconds(seconds) => Ok(Delay::For(Duration::from_secs(*seconds))),
            Self::Timestamp(instant) => Ok(Delay::Until(*instant)),
            Self::SecondsPath(path) => {
                let value = path.resolve(input).map_err(|e| invalid(e.to_string()))?;
                value
                    .as_u64()
                    .map(|seconds| Delay::For(Duration::from_secs(seconds)))
                    .ok_or_else(|| invalid(format!("{path} is not a non-negative integer")))
            }
            Self::TimestampPath(path) => {
                let value = path.resolve(input).map_err(|e| invalid(e.to_string()))?;
                value
                    .as_str()
                    .and_then(parse_timestamp)
                    .map(Delay::Until)
                    .ok_or_else(|| invalid(format!("{path} is not an RFC 3339 timestamp")))
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

/// Pauses the execution, then passes its input on.
///
/// The state never sleeps itself. It returns a [`Delay`] and the execution
/// loop hands it to the configured scheduler.
#[derive(Clone, Debug, PartialEq)]
pub struct WaitState {
    name: String,
    wait: WaitTime,
    next: Option<String>,
    io: IoPaths,
}

impl WaitState {
    pub fn from_config(name: &str, config: &Value) -> Result<Self, DefinitionError> {
        Ok(Self {
            name: name.to_string(),
            wait: WaitTime::from_config(name, config)?,
            next: super::successor(name, config)?,
            io: IoPaths::passthrough(name, config)?,
        })
    }

    pub fn wait_time(&self) -> &WaitTime {
        &self.wait
    }
}

#[async_trait]
impl StateBehavior for WaitState {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_type(&self) -> &str {
        "Wait"
    }

    async fn execute(
        &self,
        input: Value,
        _ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError> {
        let effective = self.io.effective_input(&self.name, &input)?;
        let delay = self.wait.delay(&self.name, &effective)?;
        debug!(state = %self.name, delay = ?delay, "wait_computed");

        let output = self.io.output(&self.name, input, effective)?;
        Ok(StepOutcome::Wait {
            delay,
            next: self.next.clone(),
            output,
        })
    }
}
