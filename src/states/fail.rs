//! `Fail`: stop the execution with an error name and cause.

use super::io::invalid_path;
use crate::core::{ExecutionError, ReferencePath, StateBehavior, StepContext, StepOutcome};
use crate::definition::DefinitionError;
use async_trait::async_trait;
use serde_json::Value;

/// Where a `Fail` state takes its error name or cause from.
#[derive(Clone, Debug, PartialEq)]
enum Field {
    Absent,
    Fixed(String),
    FromInput(ReferencePath),
}

impl Field {
    fn from_config(state: &str, config: &Value, key: &str) -> Result<Self, DefinitionError> {
        let path_key = format!("{key}Path");
        match (config.get(key), config.get(&path_key)) {
            (Some(_), Some(_)) => Err(DefinitionError::invalid(
                state,
                format!("{key} and {path_key} are mutually exclusive"),
            )),
            (Some(Value::String(fixed)), None) => Ok(Self::Fixed(fixed.clone())),
            (Some(_), None) => Err(DefinitionError::invalid(
                state,
                format!("{key} must be a string"),
            )),
            (None, Some(Value::String(path))) => ReferencePath::parse(path)
                .map(Self::FromInput)
                .map_err(|e| DefinitionError::invalid(state, format!("{path_key}: {e}"))),
            (None, Some(_)) => Err(DefinitionError::invalid(
                state,
                format!("{path_key} must be a string"),
            )),
            (None, None) => Ok(Self::Absent),
        }
    }

    fn resolve(&self, state: &str, input: &Value) -> Result<Option<String>, ExecutionError> {
        match self {
            Self::Absent => Ok(None),
            Self::Fixed(fixed) => Ok(Some(fixed.clone())),
            Self::FromInput(path) => match path.resolve(input) {
                Ok(Value::String(value)) => Ok(Some(value.clone())),
                Ok(_) => Err(invalid_path(state, format!("{path} does not hold a string"))),
                Err(e) => Err(invalid_path(state, e)),
            },
        }
    }
}

/// Ends the execution with a configured failure.
///
/// Reaching a `Fail` state is a designed outcome: the resulting
/// [`ExecutionError::ConfiguredFailure`] is reported like any other
/// failure but is distinguishable from engine and task errors.
#[derive(Clone, Debug, PartialEq)]
pub struct FailState {
    name: String,
    error: Field,
    cause: Field,
}

impl FailState {
    pub fn from_config(name: &str, config: &Value) -> Result<Self, DefinitionError> {
        super::forbid(name, config, &["Next", "End", "InputPath", "OutputPath", "ResultPath"])?;
        Ok(Self {
            name: name.to_string(),
            error: Field::from_config(name, config, "Error")?,
            cause: Field::from_config(name, config, "Cause")?,
        })
    }
}

#[async_trait]
impl StateBehavior for FailState {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_type(&self) -> &str {
        "Fail"
    }

    async fn execute(
        &self,
        input: Value,
        _ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError> {
        Err(ExecutionError::ConfiguredFailure {
            error: self.error.resolve(&self.name, &input)?,
            cause: self.cause.resolve(&self.name, &input)?,
        })
    }
}
