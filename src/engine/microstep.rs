//! Microstep execution.
//!
//! A microstep applies one set of selected transitions:
//!
//! 1. exit the active descendants of each transition's domain, deepest
//!    first, recording history on the way out;
//! 2. run the transitions' own actions in selection order;
//! 3. enter the targets, their ancestors below the domain, parallel
//!    siblings and default initial descendants, parent before child.

use super::error::ExecutionError;
use super::registry::Implementations;
use super::{Command, ExecutionMode};
use crate::core::{
    Action, ActionError, ActionRef, Context, Event, HistoryMode, NodeId, StateTree, TransitionId,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The subtree a transition exits and re-enters, `None` for targetless
/// transitions.
pub(crate) fn transition_domain(tree: &StateTree, transition: TransitionId) -> Option<NodeId> {
    let transition = tree.transition(transition);
    if transition.is_targetless() {
        return None;
    }

    let source = transition.source();
    let source_node = tree.node(source);
    let internal = !transition.reenter()
        && source_node.is_compound()
        && transition
            .targets()
            .iter()
            .all(|target| tree.is_descendant(*target, source));
    if internal {
        return Some(source);
    }

    let mut nodes = Vec::with_capacity(transition.targets().len() + 1);
    nodes.push(source);
    nodes.extend_from_slice(transition.targets());
    Some(tree.lcca(&nodes))
}

/// Active nodes exited by a set of transitions.
pub(crate) fn exit_set(
    tree: &StateTree,
    configuration: &BTreeSet<NodeId>,
    transitions: &[TransitionId],
) -> BTreeSet<NodeId> {
    let mut exits = BTreeSet::new();
    for transition in transitions {
        if let Some(domain) = transition_domain(tree, *transition) {
            exits.extend(
                configuration
                    .iter()
                    .copied()
                    .filter(|node| tree.is_descendant(*node, domain)),
            );
        }
    }
    exits
}

/// Nodes to enter, collected in document order.
struct EntrySet<'t> {
    tree: &'t StateTree,
    history: &'t BTreeMap<String, Vec<NodeId>>,
    states: BTreeSet<NodeId>,
}

impl<'t> EntrySet<'t> {
    fn new(tree: &'t StateTree, history: &'t BTreeMap<String, Vec<NodeId>>) -> Self {
        Self {
            tree,
            history,
            states: BTreeSet::new(),
        }
    }

    fn add_descendants(&mut self, state: NodeId) {
        let node = self.tree.node(state);

        if node.is_history() {
            let Some(parent) = node.parent() else {
                return;
            };
            let restored = self
                .history
                .get(node.id())
                .cloned()
                .unwrap_or_else(|| self.default_history(state));
            for target in &restored {
                self.add_descendants(*target);
            }
            for target in &restored {
                self.add_ancestors(*target, parent);
            }
            return;
        }

        self.states.insert(state);
        if node.is_compound() {
            if let Some(initial) = node.initial() {
                self.add_descendants(initial);
                self.add_ancestors(initial, state);
            }
        } else if node.is_parallel() {
            self.add_missing_regions(state);
        }
    }

    fn add_ancestors(&mut self, state: NodeId, domain: NodeId) {
        for ancestor in self.tree.ancestors_until(state, Some(domain)) {
            self.states.insert(ancestor);
            if self.tree.node(ancestor).is_parallel() {
                self.add_missing_regions(ancestor);
            }
        }
    }

    fn add_missing_regions(&mut self, parallel: NodeId) {
        let regions: Vec<NodeId> = self.tree.node(parallel).children().to_vec();
        for region in regions {
            if self.tree.node(region).is_history() {
                continue;
            }
            let covered = self
                .states
                .iter()
                .any(|s| *s == region || self.tree.is_descendant(*s, region));
            if !covered {
                self.add_descendants(region);
            }
        }
    }

    /// Targets used when a history state has nothing remembered: its
    /// declared default, otherwise the parent's initial child (or every
    /// region of a parallel parent).
    fn default_history(&self, history: NodeId) -> Vec<NodeId> {
        let node = self.tree.node(history);
        if !node.history_target.is_empty() {
            return node.history_target.clone();
        }
        let Some(parent) = node.parent() else {
            return Vec::new();
        };
        let parent = self.tree.node(parent);
        if parent.is_parallel() {
            parent
                .children()
                .iter()
                .copied()
                .filter(|child| !self.tree.node(*child).is_history())
                .collect()
        } else {
            parent.initial().into_iter().collect()
        }
    }
}

/// Mutable working copy of a snapshot while a macrostep is computed.
///
/// Nothing here is visible to anyone until the macrostep completes.
pub(crate) struct Execution<'m, C: Context> {
    pub(crate) tree: &'m StateTree,
    pub(crate) implementations: &'m Implementations<C>,
    pub(crate) mode: ExecutionMode,
    pub(crate) configuration: BTreeSet<NodeId>,
    pub(crate) context: C,
    pub(crate) history: BTreeMap<String, Vec<NodeId>>,
    pub(crate) actions: Vec<String>,
    pub(crate) internal: VecDeque<Event>,
    pub(crate) commands: Vec<Command>,
    pub(crate) microsteps: usize,
}

impl<C: Context> Execution<'_, C> {
    /// Apply one set of transitions.
    pub(crate) fn microstep(
        &mut self,
        transitions: &[TransitionId],
        event: &Event,
    ) -> Result<(), ExecutionError> {
        self.microsteps += 1;
        let tree = self.tree;

        let exits = exit_set(tree, &self.configuration, transitions);
        self.record_history(&exits);
        self.exit_states(&exits, event)?;

        for transition in transitions {
            self.run_actions(&tree.transition(*transition).actions, event)?;
        }

        let entries = {
            let mut entry = EntrySet::new(self.tree, &self.history);
            for transition in transitions {
                let Some(domain) = transition_domain(self.tree, *transition) else {
                    continue;
                };
                let targets = self.tree.transition(*transition).targets();
                for target in targets {
                    entry.add_descendants(*target);
                }
                for target in targets {
                    for effective in self.effective_targets(*target) {
                        entry.add_ancestors(effective, domain);
                    }
                }
                // Only a parallel root can be a parallel domain.
                if self.tree.node(domain).is_parallel() {
                    entry.add_missing_regions(domain);
                }
            }
            entry.states
        };

        tracing::trace!(
            event = %event,
            exited = exits.len(),
            entered = entries.len(),
            "Microstep"
        );
        self.enter_states(&entries, event)
    }

    /// Enter the root and its default descendants.
    pub(crate) fn enter_initial(&mut self, event: &Event) -> Result<(), ExecutionError> {
        self.microsteps += 1;
        let entries = {
            let mut entry = EntrySet::new(self.tree, &self.history);
            entry.add_descendants(self.tree.root_id());
            entry.states
        };
        self.enter_states(&entries, event)
    }

    /// Exit every active node, deepest first.
    pub(crate) fn exit_all(&mut self, event: &Event) -> Result<(), ExecutionError> {
        let exits = self.configuration.clone();
        self.exit_states(&exits, event)
    }

    /// History targets stand for the states they restore.
    fn effective_targets(&self, target: NodeId) -> Vec<NodeId> {
        let node = self.tree.node(target);
        if !node.is_history() {
            return vec![target];
        }
        let entry = EntrySet::new(self.tree, &self.history);
        self.history
            .get(node.id())
            .cloned()
            .unwrap_or_else(|| entry.default_history(target))
    }

    fn record_history(&mut self, exits: &BTreeSet<NodeId>) {
        let tree = self.tree;
        for exited in exits {
            for child in tree.node(*exited).children() {
                let history = tree.node(*child);
                let Some(mode) = history.history_mode() else {
                    continue;
                };
                let remembered: Vec<NodeId> = match mode {
                    HistoryMode::Shallow => tree
                        .active_children(*exited, &self.configuration)
                        .collect(),
                    HistoryMode::Deep => self
                        .configuration
                        .iter()
                        .copied()
                        .filter(|node| {
                            tree.node(*node).is_atomic() && tree.is_descendant(*node, *exited)
                        })
                        .collect(),
                };
                self.history.insert(history.id().to_string(), remembered);
            }
        }
    }

    fn exit_states(
        &mut self,
        exits: &BTreeSet<NodeId>,
        event: &Event,
    ) -> Result<(), ExecutionError> {
        let tree = self.tree;
        for exited in exits.iter().rev() {
            let node = tree.node(*exited);
            self.run_actions(&node.exit, event)?;
            if !node.after.is_empty() {
                self.commands.push(Command::CancelTimers { owner: *exited });
            }
            for invocation in &node.invoke {
                self.commands.push(Command::StopActor {
                    id: invocation.id.clone(),
                });
            }
            self.configuration.remove(exited);
        }
        Ok(())
    }

    fn enter_states(
        &mut self,
        entries: &BTreeSet<NodeId>,
        event: &Event,
    ) -> Result<(), ExecutionError> {
        let tree = self.tree;
        for entered in entries {
            let node = tree.node(*entered);
            self.configuration.insert(*entered);

            for delayed in &node.after {
                self.commands.push(Command::Schedule {
                    owner: *entered,
                    event: Event::new(delayed.event_type.clone()),
                    delay: delayed.delay,
                });
            }
            for invocation in &node.invoke {
                self.commands.push(Command::Invoke {
                    owner: *entered,
                    id: invocation.id.clone(),
                    src: invocation.src.clone(),
                });
            }
            self.run_actions(&node.entry, event)?;

            if node.is_final() {
                self.raise_completion(*entered);
            }
        }
        Ok(())
    }

    /// Queue `done.state.*` events for the parent of a final node and, when
    /// every region of a parallel grandparent is complete, for it as well.
    fn raise_completion(&mut self, final_node: NodeId) {
        let root = self.tree.root_id();
        let Some(parent) = self.tree.node(final_node).parent() else {
            return;
        };
        if parent == root {
            return;
        }
        self.internal
            .push_back(Event::done_state(self.tree.node(parent).id()));

        let Some(grandparent) = self.tree.node(parent).parent() else {
            return;
        };
        if grandparent != root
            && self.tree.node(grandparent).is_parallel()
            && self.tree.is_in_final_state(grandparent, &self.configuration)
        {
            self.internal
                .push_back(Event::done_state(self.tree.node(grandparent).id()));
        }
    }

    pub(crate) fn run_actions(
        &mut self,
        actions: &[ActionRef],
        event: &Event,
    ) -> Result<(), ExecutionError> {
        for action in actions {
            self.actions.push(action.label());
            match action {
                ActionRef::Named(name) => self.run_named(name, event)?,
                ActionRef::Raise(raised) => self.internal.push_back(raised.clone()),
                ActionRef::SendTo { actor, event } => self.commands.push(Command::SendTo {
                    actor: actor.clone(),
                    event: event.clone(),
                }),
            }
        }
        Ok(())
    }

    fn run_named(&mut self, name: &str, event: &Event) -> Result<(), ExecutionError> {
        let to_error = |source: ActionError| ExecutionError::Action {
            action: name.to_string(),
            event: event.event_type().to_string(),
            source,
        };
        let implementations = self.implementations;
        match implementations.action(name) {
            Some(Action::Assign(assign)) => {
                self.context = assign(&self.context, event).map_err(to_error)?;
            }
            Some(Action::Effect(effect)) => {
                if self.mode == ExecutionMode::Live {
                    effect(&self.context, event).map_err(to_error)?;
                }
            }
            None => return Err(to_error(ActionError::new("action is not registered"))),
        }
        Ok(())
    }
}
