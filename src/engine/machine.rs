//! Loaded, immutable state machines.

use crate::core::{ExecutionError, StateBehavior};
use crate::definition::{self, Definition, DefinitionError, StateRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A validated graph of named state behaviors plus a start pointer.
///
/// Built once by the loader and never mutated afterwards; executions only
/// read it, so a machine can be shared freely between concurrent runs.
#[derive(Debug)]
pub struct StateMachine {
    definition: Definition,
    states: HashMap<String, Arc<dyn StateBehavior>>,
}

impl StateMachine {
    pub(crate) fn new(
        definition: Definition,
        states: impl IntoIterator<Item = (String, Arc<dyn StateBehavior>)>,
    ) -> Self {
        Self {
            definition,
            states: states.into_iter().collect(),
        }
    }

    /// Load a definition with the built-in state types.
    pub fn from_definition(raw: &Value) -> Result<Self, DefinitionError> {
        definition::load(raw, &StateRegistry::with_builtins())
    }

    /// Name derived from the definition's `Comment`.
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn start_at(&self) -> &str {
        &self.definition.start_at
    }

    /// The document this machine was loaded from.
    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn state(&self, name: &str) -> Option<&Arc<dyn StateBehavior>> {
        self.states.get(name)
    }

    /// Resolve a state by name for traversal.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn StateBehavior>, ExecutionError> {
        self.state(name).ok_or_else(|| ExecutionError::UnknownState {
            name: name.to_string(),
        })
    }

    /// State names, sorted.
    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Opaque reference to a loaded state machine.
///
/// Cloning a handle is cheap; every clone refers to the same immutable
/// machine.
#[derive(Clone, Debug)]
pub struct MachineHandle {
    id: Uuid,
    machine: Arc<StateMachine>,
}

impl MachineHandle {
    pub fn new(machine: StateMachine) -> Self {
        Self {
            id: Uuid::new_v4(),
            machine: Arc::new(machine),
        }
    }

    /// Unique identifier of this load.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn name(&self) -> &str {
        self.machine.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn machine() -> StateMachine {
        StateMachine::from_definition(&json!({
            "Comment": "two-step",
            "StartAt": "S1",
            "States": {
                "S1": {"Type": "Pass", "Next": "S2"},
                "S2": {"Type": "Succeed"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn resolves_known_states() {
        let machine = machine();
        assert_eq!(machine.resolve("S1").unwrap().state_type(), "Pass");
        assert_eq!(machine.resolve("S2").unwrap().state_type(), "Succeed");
        assert_eq!(machine.len(), 2);
    }

    #[test]
    fn unknown_state_is_an_error() {
        let err = machine().resolve("Ghost").unwrap_err();
        assert_eq!(
            err,
            ExecutionError::UnknownState {
                name: "Ghost".to_string()
            }
        );
    }

    #[test]
    fn keeps_original_definition() {
        let machine = machine();
        assert_eq!(machine.definition().comment.as_deref(), Some("two-step"));
        assert_eq!(machine.name(), "two-step");
    }

    #[test]
    fn handles_share_the_machine() {
        let handle = MachineHandle::new(machine());
        let clone = handle.clone();

        assert_eq!(handle.id(), clone.id());
        assert!(std::ptr::eq(handle.machine(), clone.machine()));
    }
}
