//! The named capabilities a machine definition can refer to.

use crate::core::{Action, Context, Guard};
use crate::interpreter::Actor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Creates a fresh actor each time its invoking state is entered. Receives
/// the context at the end of the entering macrostep.
pub type ActorFactory<C> = Arc<dyn Fn(&C) -> Box<dyn Actor> + Send + Sync>;

/// Guards, actions and actor sources keyed by the names a definition uses.
pub struct Implementations<C: Context> {
    guards: HashMap<String, Guard<C>>,
    actions: HashMap<String, Action<C>>,
    actors: HashMap<String, ActorFactory<C>>,
}

impl<C: Context> Implementations<C> {
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
            actions: HashMap::new(),
            actors: HashMap::new(),
        }
    }

    pub fn insert_guard(&mut self, name: impl Into<String>, guard: Guard<C>) {
        self.guards.insert(name.into(), guard);
    }

    pub fn insert_action(&mut self, name: impl Into<String>, action: Action<C>) {
        self.actions.insert(name.into(), action);
    }

    pub fn insert_actor(&mut self, src: impl Into<String>, factory: ActorFactory<C>) {
        self.actors.insert(src.into(), factory);
    }

    pub fn guard(&self, name: &str) -> Option<&Guard<C>> {
        self.guards.get(name)
    }

    pub fn action(&self, name: &str) -> Option<&Action<C>> {
        self.actions.get(name)
    }

    pub fn actor(&self, src: &str) -> Option<&ActorFactory<C>> {
        self.actors.get(src)
    }

    pub fn has_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_actor(&self, src: &str) -> bool {
        self.actors.contains_key(src)
    }
}

impl<C: Context> Default for Implementations<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> Clone for Implementations<C> {
    fn clone(&self) -> Self {
        Self {
            guards: self.guards.clone(),
            actions: self.actions.clone(),
            actors: self.actors.clone(),
        }
    }
}

impl<C: Context> fmt::Debug for Implementations<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut guards: Vec<_> = self.guards.keys().collect();
        let mut actions: Vec<_> = self.actions.keys().collect();
        let mut actors: Vec<_> = self.actors.keys().collect();
        guards.sort();
        actions.sort();
        actors.sort();
        f.debug_struct("Implementations")
            .field("guards", &guards)
            .field("actions", &actions)
            .field("actors", &actors)
            .finish()
    }
}
