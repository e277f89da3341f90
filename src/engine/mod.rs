//! The execution engine.
//!
//! [`Machine`] pairs an immutable [`StateTree`](crate::core::StateTree)
//! with the implementations its definition names and computes macrosteps
//! as pure functions from one [`State`](crate::core::State) to the next.
//!
//! Anything that must happen outside the machine (timers, actors,
//! messages to actors) is returned as a list of [`Command`]s instead of
//! being performed, so the same engine serves both the live
//! [`Interpreter`](crate::interpreter::Interpreter) and plan search.

mod error;
mod macrostep;
mod microstep;
mod registry;
mod select;

pub use error::ExecutionError;
pub use macrostep::{Machine, Macrostep, DEFAULT_MAX_MICROSTEPS};
pub use registry::{ActorFactory, Implementations};

use crate::core::{Event, NodeId};
use std::time::Duration;

/// Whether effect actions run while computing a macrostep.
///
/// Assignment actions always run; they are part of the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Run every action.
    #[default]
    Live,
    /// Skip effect actions. Used for hypothetical steps.
    Replay,
}

/// A side effect requested by a macrostep, to be carried out by whoever
/// owns the running machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Deliver `event` after `delay` unless `owner` is exited first.
    Schedule {
        owner: NodeId,
        event: Event,
        delay: Duration,
    },
    /// Drop every pending timer scheduled by `owner`.
    CancelTimers { owner: NodeId },
    /// Start the actor registered under `src` as `id`.
    Invoke {
        owner: NodeId,
        id: String,
        src: String,
    },
    StopActor { id: String },
    /// Forward `event` to the running actor `actor`.
    SendTo { actor: String, event: Event },
}
