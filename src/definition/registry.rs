//! Type registry mapping a definition's `Type` to a behavior constructor.
//!
//! The registry is consulted only while loading. Adding a new state type
//! means registering one constructor; the execution loop and the trace
//! recorder are unaffected.

use super::error::DefinitionError;
use crate::core::StateBehavior;
use crate::states;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a behavior from a state's name and raw configuration.
pub type StateConstructor =
    Arc<dyn Fn(&str, &Value) -> Result<Arc<dyn StateBehavior>, DefinitionError> + Send + Sync>;

/// Name to constructor table for state types.
#[derive(Clone)]
pub struct StateRegistry {
    constructors: HashMap<String, StateConstructor>,
}

impl StateRegistry {
    /// A registry with no state types.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with `Pass`, `Task`, `Choice`, `Wait`, `Succeed` and `Fail`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        states::register_builtins(&mut registry);
        registry
    }

    /// Register or replace the constructor for `state_type`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use stepgraph::definition::StateRegistry;
    /// use stepgraph::states::SucceedState;
    ///
    /// let mut registry = StateRegistry::empty();
    /// registry.register("Done", |name, config| {
    ///     Ok(Arc::new(SucceedState::from_config(name, config)?))
    /// });
    /// assert!(registry.contains("Done"));
    /// ```
    pub fn register<F>(&mut self, state_type: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&str, &Value) -> Result<Arc<dyn StateBehavior>, DefinitionError>
            + Send
            + Sync
            + 'static,
    {
        self.constructors
            .insert(state_type.into(), Arc::new(constructor));
        self
    }

    pub fn contains(&self, state_type: &str) -> bool {
        self.constructors.contains_key(state_type)
    }

    /// Registered type names, sorted.
    pub fn state_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the behavior for one `States` entry.
    pub fn construct(
        &self,
        name: &str,
        config: &Value,
    ) -> Result<Arc<dyn StateBehavior>, DefinitionError> {
        if !config.is_object() {
            return Err(DefinitionError::malformed(format!(
                "state '{name}' must be an object"
            )));
        }

        let state_type = match config.get("Type") {
            Some(Value::String(state_type)) => state_type,
            Some(_) => {
                return Err(DefinitionError::malformed(format!(
                    "state '{name}' has a non-string Type"
                )))
            }
            None => {
                return Err(DefinitionError::malformed(format!(
                    "state '{name}' does not declare a Type"
                )))
            }
        };

        let constructor =
            self.constructors
                .get(state_type)
                .ok_or_else(|| DefinitionError::UnsupportedStateType {
                    state: name.to_string(),
                    state_type: state_type.clone(),
                })?;

        constructor(name, config)
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("state_types", &self.state_types())
            .finish()
    }
}
