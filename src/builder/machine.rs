//! Builder for constructing machines.

use crate::builder::config::StateConfig;
use crate::builder::error::BuildError;
use crate::builder::tree::build_tree;
use crate::core::{Action, Context, Guard};
use crate::engine::{Implementations, Machine, DEFAULT_MAX_MICROSTEPS};
use crate::interpreter::Actor;
use std::sync::Arc;

/// Builder for constructing a [`Machine`] with a fluent API.
///
/// The definition and the implementations it names are validated together
/// by [`build`](Self::build).
pub struct MachineBuilder<C: Context> {
    config: StateConfig,
    context: C,
    implementations: Implementations<C>,
    max_microsteps: usize,
}

impl<C: Context + Default> MachineBuilder<C> {
    /// Create a builder starting from `C::default()`.
    pub fn new(config: StateConfig) -> Self {
        Self::with_context(config, C::default())
    }

    /// Parse a JSON definition.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        let config: StateConfig = serde_json::from_str(json)?;
        Ok(Self::new(config))
    }
}

impl<C: Context> MachineBuilder<C> {
    /// Create a builder with an explicit initial context.
    pub fn with_context(config: StateConfig, context: C) -> Self {
        Self {
            config,
            context,
            implementations: Implementations::new(),
            max_microsteps: DEFAULT_MAX_MICROSTEPS,
        }
    }

    /// Set the initial context.
    pub fn context(mut self, context: C) -> Self {
        self.context = context;
        self
    }

    pub fn guard(mut self, name: impl Into<String>, guard: Guard<C>) -> Self {
        self.implementations.insert_guard(name, guard);
        self
    }

    pub fn action(mut self, name: impl Into<String>, action: Action<C>) -> Self {
        self.implementations.insert_action(name, action);
        self
    }

    /// Register an actor source. `factory` runs every time a state invoking
    /// `src` is entered.
    pub fn actor<F, A>(mut self, src: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&C) -> A + Send + Sync + 'static,
        A: Actor + 'static,
    {
        self.implementations
            .insert_actor(src, Arc::new(move |context: &C| Box::new(factory(context)) as Box<dyn Actor>));
        self
    }

    /// Replace every registered implementation at once.
    pub fn implementations(mut self, implementations: Implementations<C>) -> Self {
        self.implementations = implementations;
        self
    }

    /// Ceiling on microsteps within a single macrostep (default 1000).
    pub fn max_microsteps(mut self, limit: usize) -> Self {
        self.max_microsteps = limit;
        self
    }

    /// Build the machine.
    /// Returns every definition problem found, not just the first.
    pub fn build(self) -> Result<Machine<C>, BuildError> {
        let tree = build_tree(&self.config, &self.implementations)?;
        tracing::debug!(
            machine = tree.root().id(),
            states = tree.len(),
            transitions = tree.transitions().count(),
            "Built machine"
        );
        Ok(Machine::new(
            tree,
            self.implementations,
            self.context,
            self.max_microsteps,
        ))
    }
}
