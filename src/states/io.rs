//! Input and output processing shared by several state types.
//!
//! - `InputPath` picks the part of the raw input a state works on.
//! - `ResultPath` places the state's result into the raw input.
//! - `OutputPath` picks the part of that combination passed on.
//!
//! All default to `$`. An explicit `null` discards: `InputPath`/`OutputPath`
//! yield `{}`, `ResultPath` keeps the raw input and drops the result.

use crate::core::{ExecutionError, ReferencePath};
use crate::definition::DefinitionError;
use serde_json::{Map, Value};

/// A configured path, or an explicit `null`.
#[derive(Clone, Debug, PartialEq)]
pub enum PathSetting {
    Path(ReferencePath),
    Discard,
}

impl Default for PathSetting {
    fn default() -> Self {
        Self::Path(ReferencePath::root())
    }
}

impl PathSetting {
    /// Read `key` from a state (or catcher) configuration object.
    pub(crate) fn from_config(
        state: &str,
        config: &Value,
        key: &str,
    ) -> Result<Self, DefinitionError> {
        match config.get(key) {
            None => Ok(Self::default()),
            Some(Value::Null) => Ok(Self::Discard),
            Some(Value::String(path)) => ReferencePath::parse(path)
                .map(Self::Path)
                .map_err(|e| DefinitionError::invalid(state, format!("{key}: {e}"))),
            Some(_) => Err(DefinitionError::invalid(
                state,
                format!("{key} must be a string or null"),
            )),
        }
    }

    /// Apply as an `InputPath` or `OutputPath`.
    pub(crate) fn select(&self, state: &str, value: &Value) -> Result<Value, ExecutionError> {
        match self {
            Self::Discard => Ok(Value::Object(Map::new())),
            Self::Path(path) => path
                .resolve(value)
                .cloned()
                .map_err(|e| invalid_path(state, e)),
        }
    }

    /// Apply as a `ResultPath`.
    pub(crate) fn merge(
        &self,
        state: &str,
        raw_input: Value,
        result: Value,
    ) -> Result<Value, ExecutionError> {
        match self {
            Self::Discard => Ok(raw_input),
            Self::Path(path) if path.is_root() => Ok(result),
            Self::Path(path) => path
                .insert(raw_input, result)
                .map_err(|e| invalid_path(state, e)),
        }
    }
}

/// The three filters of one state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IoPaths {
    pub input_path: PathSetting,
    pub result_path: PathSetting,
    pub output_path: PathSetting,
}

impl IoPaths {
    /// Read `InputPath`, `ResultPath` and `OutputPath`.
    pub(crate) fn from_config(state: &str, config: &Value) -> Result<Self, DefinitionError> {
        Ok(Self {
            input_path: PathSetting::from_config(state, config, "InputPath")?,
            result_path: PathSetting::from_config(state, config, "ResultPath")?,
            output_path: PathSetting::from_config(state, config, "OutputPath")?,
        })
    }

    /// Read only `InputPath` and `OutputPath`; the state has no result.
    pub(crate) fn passthrough(state: &str, config: &Value) -> Result<Self, DefinitionError> {
        if config.get("ResultPath").is_some() {
            return Err(DefinitionError::invalid(
                state,
                "ResultPath is not allowed for this state type",
            ));
        }
        Ok(Self {
            input_path: PathSetting::from_config(state, config, "InputPath")?,
            result_path: PathSetting::default(),
            output_path: PathSetting::from_config(state, config, "OutputPath")?,
        })
    }

    pub(crate) fn effective_input(&self, state: &str, raw: &Value) -> Result<Value, ExecutionError> {
        self.input_path.select(state, raw)
    }

    /// Combine `result` with the raw input and filter the output.
    pub(crate) fn output(
        &self,
        state: &str,
        raw: Value,
        result: Value,
    ) -> Result<Value, ExecutionError> {
        let combined = self.result_path.merge(state, raw, result)?;
        self.output_path.select(state, &combined)
    }
}

pub(crate) fn invalid_path(state: &str, error: impl ToString) -> ExecutionError {
    ExecutionError::InvalidPath {
        state: state.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_pass_everything_through() {
        let io = IoPaths::from_config("S", &json!({})).unwrap();
        let raw = json!({"a": 1});

        assert_eq!(io.effective_input("S", &raw).unwrap(), raw);
        assert_eq!(io.output("S", raw.clone(), json!("r")).unwrap(), json!("r"));
    }

    #[test]
    fn input_path_selects_subtree() {
        let io = IoPaths::from_config("S", &json!({"InputPath": "$.order"})).unwrap();
        let raw = json!({"order": {"id": 7}, "other": true});

        assert_eq!(io.effective_input("S", &raw).unwrap(), json!({"id": 7}));
    }

    #[test]
    fn result_path_merges_into_input() {
        let io = IoPaths::from_config("S", &json!({"ResultPath": "$.price"})).unwrap();
        let output = io.output("S", json!({"sku": "x"}), json!(9.5)).unwrap();

        assert_eq!(output, json!({"sku": "x", "price": 9.5}));
    }

    #[test]
    fn null_result_path_discards_result() {
        let io = IoPaths::from_config("S", &json!({"ResultPath": null})).unwrap();
        let output = io.output("S", json!({"sku": "x"}), json!("ignored")).unwrap();

        assert_eq!(output, json!({"sku": "x"}));
    }

    #[test]
    fn null_input_and_output_paths_yield_empty_object() {
        let io = IoPaths::from_config("S", &json!({"InputPath": null, "OutputPath": null})).unwrap();

        assert_eq!(io.effective_input("S", &json!([1, 2])).unwrap(), json!({}));
        assert_eq!(io.output("S", json!({}), json!(1)).unwrap(), json!({}));
    }

    #[test]
    fn missing_input_path_target_is_a_runtime_error() {
        let io = IoPaths::from_config("S", &json!({"InputPath": "$.missing"})).unwrap();
        let err = io.effective_input("S", &json!({})).unwrap_err();

        assert!(matches!(err, ExecutionError::InvalidPath { state, .. } if state == "S"));
    }

    #[test]
    fn bad_paths_are_rejected_at_load() {
        let err = IoPaths::from_config("S", &json!({"OutputPath": "result"})).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidState { .. }));

        let err = IoPaths::from_config("S", &json!({"InputPath": 3})).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidState { .. }));
    }

    #[test]
    fn passthrough_rejects_result_path() {
        let err = IoPaths::passthrough("S", &json!({"ResultPath": "$.x"})).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidState { .. }));
    }
}
