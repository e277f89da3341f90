//! Statecraft: a deterministic statechart interpreter
//!
//! Statecraft follows a "pure core, imperative shell" split. The engine
//! computes every macrostep as a pure function from one immutable state
//! snapshot to the next; timers, invoked actors and listeners live in the
//! interpreter that drives it.
//!
//! # Core Concepts
//!
//! - **Definition**: plain-data [`StateConfig`](builder::StateConfig) trees
//!   naming their guards, actions and actors
//! - **Machine**: an immutable state tree plus the named implementations
//! - **State**: an immutable snapshot of configuration, context and history
//! - **Interpreter**: owns the current state and the event queue
//! - **Plan search**: breadth-first exploration of the reachable states
//!
//! # Example
//!
//! ```rust
//! use statecraft::builder::{MachineBuilder, StateConfig, TransitionConfig};
//! use statecraft::core::{Action, Event, Guard};
//! use statecraft::interpreter::Interpreter;
//!
//! let config = StateConfig::new("door")
//!     .initial("closed")
//!     .state(
//!         StateConfig::new("closed")
//!             .on_transition("OPEN", TransitionConfig::to("open").guard("unlocked"))
//!             .on_transition("UNLOCK", TransitionConfig::targetless().action("unlock")),
//!     )
//!     .state(StateConfig::new("open").on("CLOSE", "closed"));
//!
//! let machine = MachineBuilder::new(config)
//!     .context(false)
//!     .guard("unlocked", Guard::context(|unlocked: &bool| *unlocked))
//!     .action("unlock", Action::assign(|_: &bool, _: &Event| true))
//!     .build()
//!     .unwrap();
//!
//! let mut interpreter = Interpreter::new(machine);
//! interpreter.start().unwrap();
//!
//! interpreter.send("OPEN").unwrap();
//! assert!(interpreter.state().unwrap().matches("closed"));
//!
//! interpreter.send("UNLOCK").unwrap();
//! interpreter.send("OPEN").unwrap();
//! assert!(interpreter.state().unwrap().matches("open"));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod graph;
pub mod interpreter;

// Re-export commonly used types
pub use builder::{MachineBuilder, StateConfig, TransitionConfig};
pub use core::{Action, Context, Event, Guard, State, StateValue};
pub use engine::{ExecutionError, Machine};
pub use interpreter::{Interpreter, Status};
