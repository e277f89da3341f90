//! Construction of a [`StateTree`] from a [`StateConfig`].
//!
//! Construction runs in two passes: the first lays out the arena in
//! document order, the second resolves names (initial children, targets,
//! guards, actions, actor sources). Every problem found is accumulated with
//! `Validation` so a single build reports all of them.

use crate::builder::config::{ActionConfig, StateConfig, TransitionConfig};
use crate::builder::error::{BuildError, DefinitionError};
use crate::core::{
    ActionRef, Context, Delayed, Event, HistoryMode, Invocation, NodeId, NodeKind, StateNode,
    StateTree, Transition, TransitionId,
};
use crate::engine::Implementations;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DefinitionError>>;

pub(crate) fn build_tree<C: Context>(
    root: &StateConfig,
    implementations: &Implementations<C>,
) -> Result<StateTree, BuildError> {
    let mut builder = TreeBuilder {
        nodes: Vec::new(),
        configs: Vec::new(),
        transitions: Vec::new(),
        ids: HashMap::new(),
        checks: Vec::new(),
    };
    builder.add_node(root, None, None, 0);
    builder.resolve_structure();
    builder.resolve_behavior(implementations);
    builder.finish()
}

struct TreeBuilder<'a> {
    nodes: Vec<StateNode>,
    configs: Vec<&'a StateConfig>,
    transitions: Vec<Transition>,
    ids: HashMap<String, NodeId>,
    checks: Vec<Check>,
}

impl<'a> TreeBuilder<'a> {
    fn check(&mut self, ok: bool, error: impl FnOnce() -> DefinitionError) {
        let check: Check = if ok {
            Validation::success(())
        } else {
            Validation::fail(error())
        };
        self.checks.push(check);
    }

    fn register(&mut self, id: String, index: NodeId) {
        let unique = !self.ids.contains_key(&id);
        self.check(unique, || DefinitionError::DuplicateId { id: id.clone() });
        if unique {
            self.ids.insert(id, index);
        }
    }

    fn add_node(
        &mut self,
        config: &'a StateConfig,
        parent: Option<NodeId>,
        parent_path: Option<&str>,
        depth: usize,
    ) -> NodeId {
        let index = NodeId(self.nodes.len());
        let path = match parent_path {
            Some(parent_path) => format!("{parent_path}.{}", config.key),
            None => config.key.clone(),
        };
        let kind = config.resolved_kind();

        self.register(path.clone(), index);
        if let Some(explicit) = config.id.as_ref().filter(|id| **id != path) {
            self.register(explicit.clone(), index);
        }

        self.nodes.push(StateNode {
            index,
            id: config.id.clone().unwrap_or_else(|| path.clone()),
            key: config.key.clone(),
            kind,
            parent,
            children: Vec::new(),
            initial: None,
            history: (kind == NodeKind::History).then(|| config.history.unwrap_or_default()),
            history_target: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            on: Vec::new(),
            always: Vec::new(),
            after: Vec::new(),
            invoke: Vec::new(),
            depth,
            subtree_end: 0,
        });
        self.configs.push(config);

        for child in &config.states {
            let child = self.add_node(child, Some(index), Some(&path), depth + 1);
            self.nodes[index.0].children.push(child);
        }
        self.nodes[index.0].subtree_end = self.nodes.len();
        index
    }

    /// Initial children, history defaults and kind/children consistency.
    fn resolve_structure(&mut self) {
        for position in 0..self.nodes.len() {
            let index = NodeId(position);
            let config = self.configs[position];
            let id = self.nodes[position].id.clone();
            let kind = self.nodes[position].kind;

            if matches!(kind, NodeKind::Atomic | NodeKind::Final | NodeKind::History) {
                self.check(config.states.is_empty(), || {
                    DefinitionError::UnexpectedChildren {
                        state: id.clone(),
                        kind: kind.to_string(),
                    }
                });
            }

            match kind {
                NodeKind::Compound => self.resolve_initial(index, config, &id),
                NodeKind::History => self.resolve_history(index, config, &id),
                _ => {}
            }
        }
    }

    fn resolve_initial(&mut self, index: NodeId, config: &StateConfig, id: &str) {
        let children = self.nodes[index.0].children.clone();
        self.check(!children.is_empty(), || DefinitionError::EmptyCompound {
            state: id.to_string(),
        });

        let initial = match &config.initial {
            Some(key) => {
                let found = children
                    .iter()
                    .copied()
                    .find(|child| self.nodes[child.0].key == *key);
                self.check(found.is_some(), || DefinitionError::InvalidInitial {
                    state: id.to_string(),
                    initial: key.clone(),
                });
                found
            }
            None => children
                .iter()
                .copied()
                .find(|child| self.nodes[child.0].kind != NodeKind::History),
        };
        self.nodes[index.0].initial = initial;
    }

    fn resolve_history(&mut self, index: NodeId, config: &StateConfig, id: &str) {
        let parent_kind = self.nodes[index.0]
            .parent
            .map(|parent| self.nodes[parent.0].kind);
        self.check(
            matches!(
                parent_kind,
                Some(NodeKind::Compound) | Some(NodeKind::Parallel)
            ),
            || DefinitionError::OrphanHistory {
                state: id.to_string(),
            },
        );

        let targets = self.resolve_targets(index, &config.target);
        self.nodes[index.0].history_target = targets;
        if self.nodes[index.0].history.is_none() {
            self.nodes[index.0].history = Some(HistoryMode::Shallow);
        }
    }

    /// Transitions, actions and invocations, in document order.
    fn resolve_behavior<C: Context>(&mut self, implementations: &Implementations<C>) {
        let mut invocation_ids = HashSet::new();

        for position in 0..self.nodes.len() {
            let index = NodeId(position);
            let config = self.configs[position];
            let id = self.nodes[position].id.clone();

            let entry = self.resolve_actions(&id, &config.entry, implementations);
            let exit = self.resolve_actions(&id, &config.exit, implementations);
            self.nodes[position].entry = entry;
            self.nodes[position].exit = exit;

            for handler in &config.on {
                self.add_transitions(index, &handler.event, &handler.transitions, implementations);
            }

            if !config.on_done.is_empty() {
                let event = Event::done_state(&id);
                self.add_transitions(index, event.event_type(), &config.on_done, implementations);
            }

            for delay in &config.after {
                let event_type = Event::after_type(delay.delay_ms, &id);
                self.nodes[position].after.push(Delayed {
                    delay: Duration::from_millis(delay.delay_ms),
                    event_type: event_type.clone(),
                });
                self.add_transitions(index, &event_type, &delay.transitions, implementations);
            }

            for transition in &config.always {
                let transition = self.make_transition(index, None, transition, implementations);
                self.nodes[position].always.push(transition);
            }

            for (n, invoke) in config.invoke.iter().enumerate() {
                let invocation_id = invoke
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{id}:invocation[{n}]"));
                self.check(invocation_ids.insert(invocation_id.clone()), || {
                    DefinitionError::DuplicateInvocation {
                        id: invocation_id.clone(),
                    }
                });
                self.check(implementations.has_actor(&invoke.src), || {
                    DefinitionError::UnknownActor {
                        state: id.clone(),
                        src: invoke.src.clone(),
                    }
                });
                self.nodes[position].invoke.push(Invocation {
                    id: invocation_id,
                    src: invoke.src.clone(),
                });
            }
        }
    }

    fn add_transitions<C: Context>(
        &mut self,
        source: NodeId,
        event: &str,
        candidates: &[TransitionConfig],
        implementations: &Implementations<C>,
    ) {
        let ids: Vec<TransitionId> = candidates
            .iter()
            .map(|candidate| self.make_transition(source, Some(event), candidate, implementations))
            .collect();

        let handlers = &mut self.nodes[source.0].on;
        match handlers.iter_mut().find(|(declared, _)| declared == event) {
            Some((_, existing)) => existing.extend(ids),
            None => handlers.push((event.to_string(), ids)),
        }
    }

    fn make_transition<C: Context>(
        &mut self,
        source: NodeId,
        event: Option<&str>,
        config: &TransitionConfig,
        implementations: &Implementations<C>,
    ) -> TransitionId {
        let state = self.nodes[source.0].id.clone();
        if let Some(guard) = &config.guard {
            self.check(implementations.has_guard(guard), || {
                DefinitionError::UnknownGuard {
                    state: state.clone(),
                    guard: guard.clone(),
                }
            });
        }

        let targets = self.resolve_targets(source, &config.target);
        let actions = self.resolve_actions(&state, &config.actions, implementations);
        let index = TransitionId(self.transitions.len());
        self.transitions.push(Transition {
            index,
            source,
            event: event.map(str::to_string),
            guard: config.guard.clone(),
            actions,
            targets,
            reenter: config.reenter,
        });
        index
    }

    fn resolve_actions<C: Context>(
        &mut self,
        state: &str,
        actions: &[ActionConfig],
        implementations: &Implementations<C>,
    ) -> Vec<ActionRef> {
        actions
            .iter()
            .map(|action| match action {
                ActionConfig::Named(name) => {
                    self.check(implementations.has_action(name), || {
                        DefinitionError::UnknownAction {
                            state: state.to_string(),
                            action: name.clone(),
                        }
                    });
                    ActionRef::Named(name.clone())
                }
                ActionConfig::Raise { raise } => ActionRef::Raise(raise.clone()),
                ActionConfig::SendTo { send_to, event } => ActionRef::SendTo {
                    actor: send_to.clone(),
                    event: event.clone(),
                },
            })
            .collect()
    }

    fn resolve_targets(&mut self, source: NodeId, targets: &[String]) -> Vec<NodeId> {
        let source_state = self.nodes[source.0].id.clone();
        let mut resolved = Vec::new();
        for target in targets {
            let found = self.resolve_target(source, target);
            self.check(found.is_some(), || DefinitionError::UnresolvedTarget {
                source_state: source_state.clone(),
                target: target.clone(),
            });
            resolved.extend(found);
        }
        resolved
    }

    /// `#id` is absolute, `.child` is relative to the source, anything else
    /// is a sibling key, optionally followed by descendant keys.
    fn resolve_target(&self, source: NodeId, target: &str) -> Option<NodeId> {
        if let Some(id) = target.strip_prefix('#') {
            if let Some(found) = self.ids.get(id) {
                return Some(*found);
            }
            let (head, rest) = id.split_once('.')?;
            let base = *self.ids.get(head)?;
            return self.descend(base, rest);
        }
        if let Some(path) = target.strip_prefix('.') {
            return self.descend(source, path);
        }
        let base = self.nodes[source.0].parent.unwrap_or(source);
        self.descend(base, target)
    }

    fn descend(&self, from: NodeId, path: &str) -> Option<NodeId> {
        path.split('.').try_fold(from, |node, key| {
            self.nodes[node.0]
                .children
                .iter()
                .copied()
                .find(|child| self.nodes[child.0].key == key)
        })
    }

    fn finish(self) -> Result<StateTree, BuildError> {
        match Validation::all_vec(self.checks) {
            Validation::Success(_) => Ok(StateTree {
                nodes: self.nodes,
                transitions: self.transitions,
                ids: self.ids,
            }),
            Validation::Failure(errors) => Err(BuildError::Invalid {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }
}
