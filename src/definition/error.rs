//! Load-time errors.

use thiserror::Error;

/// Errors that can occur while loading a definition.
///
/// A failed load never produces a partially populated state machine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionError {
    #[error("malformed definition: {message}")]
    MalformedDefinition { message: String },

    #[error("state '{state}' has unsupported type '{state_type}'")]
    UnsupportedStateType { state: String, state_type: String },

    #[error("state '{state}' is invalid: {message}")]
    InvalidState { state: String, message: String },

    #[error("definition has {} problems: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<DefinitionError>),
}

impl DefinitionError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(state: &str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.to_string(),
            message: message.into(),
        }
    }

    /// Collapse accumulated problems: one problem is reported as itself.
    pub(crate) fn from_problems(mut problems: Vec<DefinitionError>) -> Self {
        if problems.len() == 1 {
            problems.remove(0)
        } else {
            Self::Multiple(problems)
        }
    }

    /// Every individual problem, flattening `Multiple`.
    pub fn problems(&self) -> Vec<&DefinitionError> {
        match self {
            Self::Multiple(problems) => problems.iter().flat_map(|p| p.problems()).collect(),
            other => vec![other],
        }
    }

    /// Whether any problem is an unregistered `Type`.
    ///
    /// An unsupported type is reported as `UnsupportedStateType` on its own,
    /// but inside `Multiple` when other states are broken too.
    pub fn is_unsupported_type(&self) -> bool {
        self.problems()
            .iter()
            .any(|problem| matches!(problem, Self::UnsupportedStateType { .. }))
    }
}

fn join_messages(problems: &[DefinitionError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
