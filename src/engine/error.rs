//! Errors raised while executing a machine.

use crate::core::ActionError;
use thiserror::Error;

/// Errors that can occur while computing a macrostep.
///
/// Guard and action failures are runtime data problems; cycles and the
/// microstep limit indicate a defect in the machine definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Guard '{guard}' failed while handling '{event}': {source}")]
    Guard {
        guard: String,
        event: String,
        #[source]
        source: ActionError,
    },

    #[error("Action '{action}' failed while handling '{event}': {source}")]
    Action {
        action: String,
        event: String,
        #[source]
        source: ActionError,
    },

    #[error("Transition cycle detected in {state} while handling '{event}': {transitions:?} reselected with no progress")]
    Cycle {
        state: String,
        event: String,
        transitions: Vec<String>,
    },

    #[error("Macrostep for '{event}' exceeded the limit of {limit} microsteps")]
    MicrostepLimit { event: String, limit: usize },
}

impl ExecutionError {
    /// True for errors caused by the machine definition rather than by a
    /// failing guard or action.
    pub fn is_definition_defect(&self) -> bool {
        matches!(
            self,
            ExecutionError::Cycle { .. } | ExecutionError::MicrostepLimit { .. }
        )
    }
}
