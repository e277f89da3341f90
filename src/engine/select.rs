//! Transition selection.
//!
//! For every active atomic node the selector walks up through its
//! ancestors and stops at the first node owning a candidate whose guard
//! passes. Candidates are tried in declaration order, so the first enabled
//! one wins even when later ones would also be enabled. Parallel regions
//! select independently; conflicting picks are resolved in favour of the
//! deeper source.

use super::error::ExecutionError;
use super::microstep::exit_set;
use super::registry::Implementations;
use crate::core::{ActionError, Context, Event, NodeId, StateTree, TransitionId};
use std::collections::BTreeSet;
use std::iter;

/// Which candidate lists to consult.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// Transitions declared for the event's type.
    Event,
    /// Eventless (`always`) transitions, with guards seeing `event`.
    Eventless,
}

pub(crate) fn select_transitions<C: Context>(
    tree: &StateTree,
    implementations: &Implementations<C>,
    configuration: &BTreeSet<NodeId>,
    context: &C,
    event: &Event,
    trigger: Trigger,
) -> Result<Vec<TransitionId>, ExecutionError> {
    let mut enabled: Vec<TransitionId> = Vec::new();

    for leaf in tree.atomic_nodes(configuration) {
        'walk: for node in iter::once(leaf).chain(tree.ancestors(leaf)) {
            let state = tree.node(node);
            let candidates = match trigger {
                Trigger::Event => state.transitions_for(event.event_type()),
                Trigger::Eventless => state.always(),
            };
            for candidate in candidates {
                if guard_passes(tree, implementations, *candidate, context, event)? {
                    if !enabled.contains(candidate) {
                        enabled.push(*candidate);
                    }
                    break 'walk;
                }
            }
        }
    }

    let selected = remove_conflicts(tree, configuration, enabled);
    if !selected.is_empty() {
        tracing::trace!(
            event = %event,
            eventless = trigger == Trigger::Eventless,
            selected = selected.len(),
            "Selected transitions"
        );
    }
    Ok(selected)
}

fn guard_passes<C: Context>(
    tree: &StateTree,
    implementations: &Implementations<C>,
    transition: TransitionId,
    context: &C,
    event: &Event,
) -> Result<bool, ExecutionError> {
    let Some(name) = tree.transition(transition).guard() else {
        return Ok(true);
    };
    let to_error = |source: ActionError| ExecutionError::Guard {
        guard: name.to_string(),
        event: event.event_type().to_string(),
        source,
    };
    let guard = implementations
        .guard(name)
        .ok_or_else(|| to_error(ActionError::new("guard is not registered")))?;
    guard.check(context, event).map_err(to_error)
}

/// Two transitions conflict when their exit sets intersect. The one whose
/// source is a descendant of the other's source preempts it; otherwise the
/// earlier selection is kept.
fn remove_conflicts(
    tree: &StateTree,
    configuration: &BTreeSet<NodeId>,
    enabled: Vec<TransitionId>,
) -> Vec<TransitionId> {
    let mut filtered: Vec<(TransitionId, BTreeSet<NodeId>)> = Vec::new();

    for candidate in enabled {
        let exits = exit_set(tree, configuration, &[candidate]);
        let source = tree.transition(candidate).source();
        let mut preempted = false;
        let mut displaced = Vec::new();

        for (kept, kept_exits) in &filtered {
            if exits.is_disjoint(kept_exits) {
                continue;
            }
            if tree.is_descendant(source, tree.transition(*kept).source()) {
                displaced.push(*kept);
            } else {
                preempted = true;
                break;
            }
        }

        if !preempted {
            filtered.retain(|(kept, _)| !displaced.contains(kept));
            filtered.push((candidate, exits));
        }
    }

    filtered.into_iter().map(|(transition, _)| transition).collect()
}
