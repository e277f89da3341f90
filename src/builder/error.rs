//! Errors raised while building a machine from its definition.

use thiserror::Error;

/// A single problem found in a machine definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionError {
    #[error("State '{source_state}' targets unknown state '{target}'")]
    UnresolvedTarget { source_state: String, target: String },

    #[error("State '{state}' references unknown guard '{guard}'")]
    UnknownGuard { state: String, guard: String },

    #[error("State '{state}' references unknown action '{action}'")]
    UnknownAction { state: String, action: String },

    #[error("State '{state}' invokes unknown actor source '{src}'")]
    UnknownActor { state: String, src: String },

    #[error("State '{state}' has initial '{initial}' which is not one of its children")]
    InvalidInitial { state: String, initial: String },

    #[error("Compound state '{state}' has no child states")]
    EmptyCompound { state: String },

    #[error("State '{state}' is a {kind} state and cannot have child states")]
    UnexpectedChildren { state: String, kind: String },

    #[error("History state '{state}' must have a compound or parallel parent")]
    OrphanHistory { state: String },

    #[error("Duplicate state id '{id}'")]
    DuplicateId { id: String },

    #[error("Duplicate invocation id '{id}'")]
    DuplicateInvocation { id: String },
}

/// Errors that can occur when building machines.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid machine definition: {}", summarize(.errors))]
    Invalid { errors: Vec<DefinitionError> },

    #[error("Machine definition could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BuildError {
    /// Every definition problem found, empty for parse failures.
    pub fn problems(&self) -> &[DefinitionError] {
        match self {
            BuildError::Invalid { errors } => errors,
            BuildError::Parse(_) => &[],
        }
    }
}

fn summarize(errors: &[DefinitionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
