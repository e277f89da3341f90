//! Traversals of the state graph induced by candidate events.
//!
//! Next states come from [`Machine::transition`], so effect actions never
//! run and no timers or actors are involved.

use super::options::SearchOptions;
use super::plan::{Plan, Plans, Step};
use super::SearchError;
use crate::core::{Context, State};
use crate::engine::Machine;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Shortest plan to every reachable state.
///
/// Breadth-first: the first plan recorded for a fingerprint has the fewest
/// events; ties go to the earlier candidate event.
pub fn shortest_plans<C: Context>(
    machine: &Machine<C>,
    options: &SearchOptions<C>,
) -> Result<Plans<C>, SearchError> {
    let initial = machine.initial_state()?;
    let fingerprint = options.state_fingerprint(&initial);

    let mut plans = Plans::new();
    plans.insert(Plan {
        state: initial,
        fingerprint,
        steps: Vec::new(),
    });

    let mut frontier = VecDeque::from([0usize]);
    while let Some(position) = frontier.pop_front() {
        let current = plans.at(position).clone();
        for (_, event) in options.candidates(&current.state) {
            let next = machine.transition(&current.state, event.clone())?;
            let fingerprint = options.state_fingerprint(&next);
            if plans.contains(&fingerprint) {
                continue;
            }
            check_limit(options, plans.len())?;

            let mut steps = current.steps.clone();
            steps.push(Step {
                event,
                state: next.clone(),
                fingerprint: fingerprint.clone(),
            });
            plans.insert(Plan {
                state: next,
                fingerprint,
                steps,
            });
            frontier.push_back(plans.len() - 1);
        }
    }

    tracing::debug!(
        machine = machine.id(),
        states = plans.len(),
        "Shortest plan search complete"
    );
    Ok(plans)
}

/// Shortest plans to the reachable states satisfying `predicate`. Empty
/// when none is reachable.
pub fn shortest_plans_to<C, P>(
    machine: &Machine<C>,
    options: &SearchOptions<C>,
    predicate: P,
) -> Result<Vec<Plan<C>>, SearchError>
where
    C: Context,
    P: Fn(&State<C>) -> bool,
{
    Ok(shortest_plans(machine, options)?
        .into_iter()
        .filter(|plan| predicate(&plan.state))
        .collect())
}

/// Outgoing edges of every reachable state: state fingerprint, then event
/// fingerprint, then the fingerprint of the state it leads to.
pub fn adjacency_map<C: Context>(
    machine: &Machine<C>,
    options: &SearchOptions<C>,
) -> Result<BTreeMap<String, BTreeMap<String, String>>, SearchError> {
    let initial = machine.initial_state()?;
    let mut visited = HashSet::from([options.state_fingerprint(&initial)]);
    let mut frontier = VecDeque::from([initial]);
    let mut adjacency = BTreeMap::new();

    while let Some(state) = frontier.pop_front() {
        let mut edges = BTreeMap::new();
        for (event_fingerprint, event) in options.candidates(&state) {
            let next = machine.transition(&state, event)?;
            let next_fingerprint = options.state_fingerprint(&next);
            if visited.insert(next_fingerprint.clone()) {
                check_limit(options, visited.len() - 1)?;
                frontier.push_back(next);
            }
            edges.insert(event_fingerprint, next_fingerprint);
        }
        adjacency.insert(options.state_fingerprint(&state), edges);
    }
    Ok(adjacency)
}

/// Every simple path from the initial state to each reachable state: no
/// fingerprint appears twice within one plan. Depth-first, so plans come
/// grouped by their first diverging event.
pub fn simple_plans<C: Context>(
    machine: &Machine<C>,
    options: &SearchOptions<C>,
) -> Result<Vec<Plan<C>>, SearchError> {
    let initial = machine.initial_state()?;
    let fingerprint = options.state_fingerprint(&initial);
    let mut search = SimpleSearch {
        machine,
        options,
        on_path: HashSet::from([fingerprint.clone()]),
        plans: vec![Plan {
            state: initial.clone(),
            fingerprint,
            steps: Vec::new(),
        }],
    };
    search.visit(&initial, &mut Vec::new())?;
    Ok(search.plans)
}

struct SimpleSearch<'a, C: Context> {
    machine: &'a Machine<C>,
    options: &'a SearchOptions<C>,
    on_path: HashSet<String>,
    plans: Vec<Plan<C>>,
}

impl<C: Context> SimpleSearch<'_, C> {
    fn visit(&mut self, state: &State<C>, path: &mut Vec<Step<C>>) -> Result<(), SearchError> {
        for (_, event) in self.options.candidates(state) {
            let next = self.machine.transition(state, event.clone())?;
            let fingerprint = self.options.state_fingerprint(&next);
            if self.on_path.contains(&fingerprint) {
                continue;
            }
            check_limit(self.options, self.plans.len())?;

            path.push(Step {
                event,
                state: next.clone(),
                fingerprint: fingerprint.clone(),
            });
            self.plans.push(Plan {
                state: next.clone(),
                fingerprint: fingerprint.clone(),
                steps: path.clone(),
            });

            self.on_path.insert(fingerprint.clone());
            let visited = self.visit(&next, path);
            self.on_path.remove(&fingerprint);
            path.pop();
            visited?;
        }
        Ok(())
    }
}

fn check_limit<C: Context>(options: &SearchOptions<C>, found: usize) -> Result<(), SearchError> {
    match options.max() {
        Some(limit) if found >= limit => {
            tracing::warn!(limit, "Plan search limit exceeded");
            Err(SearchError::LimitExceeded { limit })
        }
        _ => Ok(()),
    }
}
