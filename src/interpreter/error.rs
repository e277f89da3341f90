//! Errors surfaced by a running interpreter.

use crate::engine::ExecutionError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InterpreterError {
    /// A macrostep failed; the published state is the one from before it.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Interpreter {session} has been stopped and cannot be restarted")]
    Stopped { session: String },
}
