//! Core statechart types.
//!
//! This module contains the pure data of the engine:
//! - Events and the context trait
//! - The immutable state tree (nodes and transitions in an arena)
//! - Guard and action implementations
//! - State snapshots and the macrostep journal
//!
//! Nothing here performs I/O; the engine and interpreter build on top.

mod action;
mod context;
mod event;
mod guard;
mod journal;
mod node;
mod state;
mod tree;

pub use action::{Action, ActionError};
pub use context::Context;
pub use event::{Event, DONE_STATE_PREFIX, INIT_EVENT, STOP_EVENT};
pub use guard::Guard;
pub use journal::{Journal, StepRecord};
pub use node::{
    ActionRef, Delayed, HistoryMode, Invocation, NodeId, NodeKind, StateNode, Transition,
    TransitionId,
};
pub use state::{State, StateValue};
pub use tree::{Ancestors, StateTree};
