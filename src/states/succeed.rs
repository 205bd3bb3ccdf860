//! `Succeed`: stop the execution successfully.

use super::io::IoPaths;
use crate::core::{ExecutionError, StateBehavior, StepContext, StepOutcome};
use crate::definition::DefinitionError;
use async_trait::async_trait;
use serde_json::Value;

/// Ends the execution successfully with its (filtered) input.
#[derive(Clone, Debug, PartialEq)]
pub struct SucceedState {
    name: String,
    io: IoPaths,
}

impl SucceedState {
    pub fn from_config(name: &str, config: &Value) -> Result<Self, DefinitionError> {
        super::forbid(name, config, &["Next"])?;
        Ok(Self {
            name: name.to_string(),
            io: IoPaths::passthrough(name, config)?,
        })
    }
}

#[async_trait]
impl StateBehavior for SucceedState {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_type(&self) -> &str {
        "Succeed"
    }

    async fn execute(
        &self,
        input: Value,
        _ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError> {
        let effective = self.io.effective_input(&self.name, &input)?;
        let output = self.io.output(&self.name, input, effective)?;
        Ok(StepOutcome::End { output })
    }
}
