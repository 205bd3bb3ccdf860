//! `Choice`: pick the successor from the input.

mod rule;

pub use rule::{ChoiceRule, Condition, Kind, Operand, Operator, Relation};

use super::io::IoPaths;
use crate::core::{ExecutionError, StateBehavior, StepContext, StepOutcome};
use crate::definition::DefinitionError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Selects the target of the first rule whose condition holds, falling back
/// to `Default`. Output is the input, unchanged apart from `InputPath` and
/// `OutputPath`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceState {
    name: String,
    rules: Vec<ChoiceRule>,
    default: Option<String>,
    io: IoPaths,
}

impl ChoiceState {
    pub fn from_config(name: &str, config: &Value) -> Result<Self, DefinitionError> {
        super::forbid(name, config, &["Next", "End"])?;

        let rules = match config.get("Choices") {
            Some(Value::Array(rules)) if !rules.is_empty() => rules
                .iter()
                .map(|rule| ChoiceRule::parse(name, rule))
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(DefinitionError::invalid(
                    name,
                    "Choices must be a non-empty array",
                ))
            }
        };

        let default = match config.get("Default") {
            None => None,
            Some(Value::String(default)) => Some(default.clone()),
            Some(_) => return Err(DefinitionError::invalid(name, "Default must be a string")),
        };

        Ok(Self {
            name: name.to_string(),
            rules,
            default,
            io: IoPaths::passthrough(name, config)?,
        })
    }

    pub fn rules(&self) -> &[ChoiceRule] {
        &self.rules
    }

    pub fn default_target(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The target selected for `input`, if any.
    pub fn select(&self, input: &Value) -> Option<&str> {
        self.rules
            .iter()
            .position(|rule| rule.condition.evaluate(input))
            .map(|index| {
                debug!(state = %self.name, rule = index, "choice_rule_matched");
                self.rules[index].next.as_str()
            })
            .or_else(|| {
                debug!(state = %self.name, default = ?self.default, "choice_no_rule_matched");
                self.default.as_deref()
            })
    }
}

#[async_trait]
impl StateBehavior for ChoiceState {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_type(&self) -> &str {
        "Choice"
    }

    async fn execute(
        &self,
        input: Value,
        _ctx: &StepContext<'_>,
    ) -> Result<StepOutcome, ExecutionError> {
        let effective = self.io.effective_input(&self.name, &input)?;
        let next = self
            .select(&effective)
            .ok_or_else(|| ExecutionError::NoMatchingChoice {
                state: self.name.clone(),
            })?
            .to_string();

        let output = self.io.output(&self.name, input, effective)?;
        Ok(StepOutcome::Next { next, output })
    }
}
