//! Plans: event sequences leading from the initial state to a target.

use crate::core::{Context, Event, State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One event of a plan and the state it leads to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Step<C: Context> {
    pub event: Event,
    pub state: State<C>,
    pub fingerprint: String,
}

/// An ordered event sequence from the initial state to `state`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Plan<C: Context> {
    /// The state the plan reaches.
    pub state: State<C>,
    pub fingerprint: String,
    pub steps: Vec<Step<C>>,
}

impl<C: Context> Plan<C> {
    /// Number of events in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for the plan of the initial state.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.steps.iter().map(|step| &step.event)
    }

    /// Event types in order, handy for assertions and reports.
    pub fn event_types(&self) -> Vec<&str> {
        self.events().map(Event::event_type).collect()
    }
}

/// Shortest plans, one per reachable fingerprint, in discovery order.
#[derive(Clone, Debug)]
pub struct Plans<C: Context> {
    plans: Vec<Plan<C>>,
    index: HashMap<String, usize>,
}

impl<C: Context> Plans<C> {
    pub(crate) fn new() -> Self {
        Self {
            plans: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns false if a plan for the fingerprint is already present.
    pub(crate) fn insert(&mut self, plan: Plan<C>) -> bool {
        if self.index.contains_key(&plan.fingerprint) {
            return false;
        }
        self.index.insert(plan.fingerprint.clone(), self.plans.len());
        self.plans.push(plan);
        true
    }

    pub(crate) fn at(&self, position: usize) -> &Plan<C> {
        &self.plans[position]
    }

    pub fn get(&self, fingerprint: &str) -> Option<&Plan<C>> {
        self.index.get(fingerprint).map(|position| &self.plans[*position])
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.index.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plan<C>> {
        self.plans.iter()
    }

    pub fn into_vec(self) -> Vec<Plan<C>> {
        self.plans
    }
}

impl<C: Context> IntoIterator for Plans<C> {
    type Item = Plan<C>;
    type IntoIter = std::vec::IntoIter<Plan<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.into_iter()
    }
}

impl<'a, C: Context> IntoIterator for &'a Plans<C> {
    type Item = &'a Plan<C>;
    type IntoIter = std::slice::Iter<'a, Plan<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.iter()
    }
}
