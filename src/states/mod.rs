//! Built-in state behaviors.
//!
//! Each type reads its own configuration once, at load time, and keeps it
//! in typed form. The execution loop only ever sees them as
//! [`StateBehavior`](crate::core::StateBehavior) trait objects.
//!
//! | Type      | Successor            | Output                          |
//! |-----------|----------------------|---------------------------------|
//! | `Pass`    | `Next`, or end       | `Result`, or its input          |
//! | `Task`    | `Next`, or end       | the handler's result            |
//! | `Choice`  | first matching rule  | its input                       |
//! | `Wait`    | `Next`, or end       | its input, after a delay        |
//! | `Succeed` | end                  | its input                       |
//! | `Fail`    | none                 | fails with `Error`/`Cause`      |

mod choice;
mod fail;
mod io;
mod pass;
mod succeed;
mod task;
mod wait;

pub use choice::{ChoiceRule, ChoiceState, Condition, Kind, Operand, Operator, Relation};
pub use fail::FailState;
pub use io::{IoPaths, PathSetting};
pub use pass::PassState;
pub use succeed::SucceedState;
pub use task::{Catcher, Retrier, TaskState};
pub use wait::{WaitState, WaitTime};

use crate::definition::{DefinitionError, StateRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Register the six built-in types.
pub(crate) fn register_builtins(registry: &mut StateRegistry) {
    registry
        .register("Pass", |name, config| {
            Ok(Arc::new(PassState::from_config(name, config)?))
        })
        .register("Task", |name, config| {
            Ok(Arc::new(TaskState::from_config(name, config)?))
        })
        .register("Choice", |name, config| {
            Ok(Arc::new(ChoiceState::from_config(name, config)?))
        })
        .register("Wait", |name, config| {
            Ok(Arc::new(WaitState::from_config(name, config)?))
        })
        .register("Succeed", |name, config| {
            Ok(Arc::new(SucceedState::from_config(name, config)?))
        })
        .register("Fail", |name, config| {
            Ok(Arc::new(FailState::from_config(name, config)?))
        });
}

/// Read `Next` and `End`.
///
/// `None` means the state ends the execution: either `End: true` or no
/// `Next` at all. Declaring both is rejected.
pub(crate) fn successor(state: &str, config: &Value) -> Result<Option<String>, DefinitionError> {
    let next = match config.get("Next") {
        None => None,
        Some(Value::String(next)) => Some(next.clone()),
        Some(_) => return Err(DefinitionError::invalid(state, "Next must be a string")),
    };
    let end = match config.get("End") {
        None => false,
        Some(Value::Bool(end)) => *end,
        Some(_) => return Err(DefinitionError::invalid(state, "End must be a boolean")),
    };

    if end && next.is_some() {
        return Err(DefinitionError::invalid(
            state,
            "Next and End: true are mutually exclusive",
        ));
    }
    Ok(next)
}

/// Reject keys a state type does not accept.
pub(crate) fn forbid(state: &str, config: &Value, keys: &[&str]) -> Result<(), DefinitionError> {
    match keys.iter().find(|key| config.get(**key).is_some()) {
        Some(key) => Err(DefinitionError::invalid(
            state,
            format!("{key} is not allowed for this state type"),
        )),
        None => Ok(()),
    }
}

/// Deserialize an optional typed field.
pub(crate) fn field<T: DeserializeOwned>(
    state: &str,
    config: &Value,
    key: &str,
) -> Result<Option<T>, DefinitionError> {
    config
        .get(key)
        .map(|raw| {
            serde_json::from_value(raw.clone())
                .map_err(|e| DefinitionError::invalid(state, format!("{key}: {e}")))
        })
        .transpose()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn next_is_the_successor() {
        assert_eq!(
            successor("S", &json!({"Next": "T"})).unwrap(),
            Some("T".to_string())
        );
    }

    #[test]
    fn end_or_no_next_is_terminal() {
        assert_eq!(successor("S", &json!({"End": true})).unwrap(), None);
        assert_eq!(successor("S", &json!({})).unwrap(), None);
    }

    #[test]
    fn next_with_end_is_rejected() {
        let err = successor("S", &json!({"Next": "T", "End": true})).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::invalid("S", "Next and End: true are mutually exclusive")
        );
    }

    #[test]
    fn non_string_next_is_rejected() {
        assert!(successor("S", &json!({"Next": 4})).is_err());
        assert!(successor("S", &json!({"End": "yes"})).is_err());
    }

    #[test]
    fn forbid_names_the_key() {
        let err = forbid("S", &json!({"Next": "T"}), &["Next", "End"]).unwrap_err();
        assert!(err.to_string().contains("Next is not allowed"));
        assert!(forbid("S", &json!({}), &["Next"]).is_ok());
    }

    #[test]
    fn builtins_are_registered() {
        let mut registry = StateRegistry::empty();
        register_builtins(&mut registry);
        assert_eq!(
            registry.state_types(),
            vec!["Choice", "Fail", "Pass", "Succeed", "Task", "Wait"]
        );
    }
}
