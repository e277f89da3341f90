//! Machine definitions and construction.
//!
//! A definition is plain data ([`StateConfig`]) that names its guards,
//! actions and actors. [`MachineBuilder`] pairs it with the named
//! implementations, validates both together and produces an immutable
//! [`Machine`](crate::engine::Machine).

pub mod config;
pub mod error;
pub mod machine;
mod tree;

pub use config::{
    ActionConfig, DelayConfig, EventConfig, InvokeConfig, StateConfig, TransitionConfig,
};
pub use error::{BuildError, DefinitionError};
pub use machine::MachineBuilder;
