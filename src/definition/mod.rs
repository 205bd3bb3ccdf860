//! Definition documents and the loader that turns them into state machines.
//!
//! Loading validates the document's structure, constructs one behavior per
//! `States` entry through the [`StateRegistry`], and only then builds a
//! fresh [`StateMachine`]. Problems in individual states are accumulated so
//! a broken definition reports everything wrong with it at once.
//!
//! Transition targets are not checked here. Some states compute their
//! successor at run time, so unknown targets surface during execution.

mod error;
mod registry;

pub use error::DefinitionError;
pub use registry::{StateConstructor, StateRegistry};

use crate::core::StateBehavior;
use crate::engine::StateMachine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

/// Name used for a definition without a `Comment`.
pub const DEFAULT_MACHINE_NAME: &str = "default-state-machine";

/// The raw definition document.
///
/// ```json
/// { "Comment": "optional", "StartAt": "First", "States": { "First": { "Type": "Pass", "End": true } } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub start_at: String,
    pub states: Map<String, Value>,
}

impl Definition {
    /// Read the top-level structure of a raw document.
    pub fn from_value(raw: &Value) -> Result<Self, DefinitionError> {
        let document = raw
            .as_object()
            .ok_or_else(|| DefinitionError::malformed("definition must be a JSON object"))?;

        let start_at = match document.get("StartAt") {
            Some(Value::String(start_at)) => start_at.clone(),
            Some(_) => return Err(DefinitionError::malformed("StartAt must be a string")),
            None => return Err(DefinitionError::malformed("missing required field StartAt")),
        };

        let states = match document.get("States") {
            Some(Value::Object(states)) => states.clone(),
            Some(_) => return Err(DefinitionError::malformed("States must be an object")),
            None => return Err(DefinitionError::malformed("missing required field States")),
        };

        let comment = match document.get("Comment") {
            None | Some(Value::Null) => None,
            Some(Value::String(comment)) => Some(comment.clone()),
            Some(_) => return Err(DefinitionError::malformed("Comment must be a string")),
        };

        Ok(Self {
            comment,
            start_at,
            states,
        })
    }

    /// The name a front end registers this definition under: the
    /// `Comment`, or [`DEFAULT_MACHINE_NAME`].
    pub fn name(&self) -> &str {
        self.comment.as_deref().unwrap_or(DEFAULT_MACHINE_NAME)
    }
}

/// Load a raw definition into a new state machine.
///
/// # Example
///
/// ```rust
/// use stepgraph::definition::{load, StateRegistry};
/// use serde_json::json;
///
/// let machine = load(
///     &json!({
///         "StartAt": "Hello",
///         "States": { "Hello": { "Type": "Pass", "Result": "Hello, World!", "End": true } }
///     }),
///     &StateRegistry::with_builtins(),
/// )
/// .unwrap();
///
/// assert_eq!(machine.start_at(), "Hello");
/// ```
pub fn load(raw: &Value, registry: &StateRegistry) -> Result<StateMachine, DefinitionError> {
    let definition = Definition::from_value(raw)?;

    if definition.states.is_empty() {
        return Err(DefinitionError::malformed(
            "States must declare at least one state",
        ));
    }
    if !definition.states.contains_key(&definition.start_at) {
        return Err(DefinitionError::malformed(format!(
            "StartAt '{}' does not name a state",
            definition.start_at
        )));
    }

    let states = construct_states(&definition, registry)?;

    debug!(
        machine = %definition.name(),
        states = states.len(),
        "definition_loaded"
    );

    Ok(StateMachine::new(definition, states))
}

fn construct_states(
    definition: &Definition,
    registry: &StateRegistry,
) -> Result<Vec<(String, Arc<dyn StateBehavior>)>, DefinitionError> {
    let checks: Vec<Validation<(String, Arc<dyn StateBehavior>), NonEmptyVec<DefinitionError>>> =
        definition
            .states
            .iter()
            .map(|(name, config)| match registry.construct(name, config) {
                Ok(behavior) => Validation::success((name.clone(), behavior)),
                Err(problem) => Validation::fail(problem),
            })
            .collect();

    // Accumulate every failing state rather than stopping at the first
    match Validation::all_vec(checks) {
        Validation::Success(states) => Ok(states),
        Validation::Failure(problems) => Err(DefinitionError::from_problems(
            problems.iter().cloned().collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> StateRegistry {
        StateRegistry::with_builtins()
    }

    #[test]
    fn loads_minimal_definition() {
        let machine = load(
            &json!({
                "Comment": "greeter",
                "StartAt": "Hello",
                "States": {"Hello": {"Type": "Pass", "End": true}}
            }),
            &registry(),
        )
        .unwrap();

        assert_eq!(machine.name(), "greeter");
        assert_eq!(machine.start_at(), "Hello");
        assert_eq!(machine.state_names(), vec!["Hello"]);
    }

    #[test]
    fn missing_start_at_is_malformed() {
        let err = load(&json!({"States": {}}), &registry()).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::MalformedDefinition {
                message: "missing required field StartAt".to_string()
            }
        );
    }

    #[test]
    fn missing_states_is_malformed() {
        let err = load(&json!({"StartAt": "A"}), &registry()).unwrap_err();
        assert!(matches!(err, DefinitionError::MalformedDefinition { .. }));
    }

    #[test]
    fn non_object_document_is_malformed() {
        let err = load(&json!(["StartAt"]), &registry()).unwrap_err();
        assert!(matches!(err, DefinitionError::MalformedDefinition { .. }));
    }

    #[test]
    fn start_at_must_name_a_state() {
        let err = load(
            &json!({"StartAt": "Missing", "States": {"A": {"Type": "Succeed"}}}),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::MalformedDefinition { .. }));
    }

    #[test]
    fn unsupported_type_fails_the_whole_load() {
        let err = load(
            &json!({
                "StartAt": "A",
                "States": {
                    "A": {"Type": "Pass", "Next": "B"},
                    "B": {"Type": "Map", "End": true}
                }
            }),
            &registry(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            DefinitionError::UnsupportedStateType {
                state: "B".to_string(),
                state_type: "Map".to_string()
            }
        );
    }

    #[test]
    fn every_broken_state_is_reported() {
        let err = load(
            &json!({
                "StartAt": "A",
                "States": {
                    "A": {"Type": "Pass", "Next": "B", "End": true},
                    "B": {"Type": "Map"},
                    "C": {"Next": "A"}
                }
            }),
            &registry(),
        )
        .unwrap_err();

        assert!(matches!(err, DefinitionError::Multiple(_)));
        assert_eq!(err.problems().len(), 3);
    }

    #[test]
    fn unsupported_type_next_to_a_broken_state_is_still_detectable() {
        let err = load(
            &json!({
                "StartAt": "A",
                "States": {
                    "A": {"Type": "Map", "End": true},
                    "B": {"Next": "A"}
                }
            }),
            &registry(),
        )
        .unwrap_err();

        assert!(matches!(err, DefinitionError::Multiple(_)));
        assert!(err.is_unsupported_type());
    }

    #[test]
    fn transition_targets_are_not_checked_at_load() {
        let machine = load(
            &json!({"StartAt": "A", "States": {"A": {"Type": "Pass", "Next": "Ghost"}}}),
            &registry(),
        );
        assert!(machine.is_ok());
    }

    #[test]
    fn definition_name_defaults_without_comment() {
        let definition =
            Definition::from_value(&json!({"StartAt": "A", "States": {"A": {"Type": "Succeed"}}}))
                .unwrap();
        assert_eq!(definition.name(), DEFAULT_MACHINE_NAME);
    }
}
