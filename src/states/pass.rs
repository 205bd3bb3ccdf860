//! `Pass`: forward the input, or inject a fixed result.

use super::io::IoPaths;
use crate::core::{ExecutionError, StateBehavior, StepContext, StepOutcome};
use crate::definition::DefinitionError;
use async_trait::async_trait;
use serde_json::Value;

/// Passes its input through, or replaces it with a fixed `Result`.
#[derive(Clone, Debug, PartialEq)]
pub struct PassState {
    name: String,
    result: Option<Value>,
    next: Option<String>,
    io: IoPaths,
}

impl PassState {
    pub fn from_config(name: &str, config: &Value) -> Result<Self, DefinitionError> {
        Ok(Self {
            name: name.to_string(),
            result: config.get("Result").cloned(),
            next: super::successor(name, config)?,
            io: IoPaths::from_config(name, config)?,
        })
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}

#[async_trait]
impl StateBehavior for PassState {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_type(&self) -> &str {
        "Pass"
    }

    async fn execute(
        &self,
        input: Value,
        _ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError> {
        let result = match &self.result {
            Some(result) => result.clone(),
            None => self.io.effective_input(&self.name, &input)?,
        };
        let output = self.io.output(&self.name, input, result)?;
        Ok(StepOutcome::advance(self.next.clone(), output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskHandlers;
    use crate::engine::ImmediateScheduler;
    use crate::states::testing::context;
    use serde_json::json;

    async fn run(config: Value, input: Value) -> Result<StepOutcome, ExecutionError> {
        let state = PassState::from_config("P", &config).unwrap();
        let handlers = TaskHandlers::new();
        let scheduler = ImmediateScheduler::new();
        state.execute(input, &context(&handlers, &scheduler)).await
    }

    #[tokio::test]
    async fn without_result_is_identity() {
        let outcome = run(json!({"Type": "Pass", "Next": "B"}), json!({"x": [1, 2]}))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Next {
                next: "B".to_string(),
                output: json!({"x": [1, 2]})
            }
        );
    }

    #[tokio::test]
    async fn result_replaces_input() {
        let outcome = run(json!({"Type": "Pass", "Result": "hi", "End": true}), json!(42))
            .await
            .unwrap();

        assert_eq!(outcome, StepOutcome::End { output: json!("hi") });
    }

    #[tokio::test]
    async fn result_path_keeps_the_input() {
        let outcome = run(
            json!({"Type": "Pass", "Result": {"ok": true}, "ResultPath": "$.check"}),
            json!({"id": 1}),
        )
        .await
        .unwrap();

        assert_eq!(outcome.output(), &json!({"id": 1, "check": {"ok": true}}));
        assert!(outcome.is_terminal());
    }

    #[tokio::test]
    async fn input_and_output_paths_filter() {
        let outcome = run(
            json!({"Type": "Pass", "InputPath": "$.order", "OutputPath": "$.lines[0]"}),
            json!({"order": {"lines": ["a", "b"]}}),
        )
        .await
        .unwrap();

        assert_eq!(outcome.output(), &json!("a"));
    }

    #[test]
    fn explicit_null_result_is_kept() {
        let state = PassState::from_config("P", &json!({"Type": "Pass", "Result": null})).unwrap();
        assert_eq!(state.result(), Some(&Value::Null));
    }
}
