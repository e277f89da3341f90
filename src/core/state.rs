//! Immutable machine snapshots.
//!
//! Every macrostep produces a new [`State`]; published snapshots are never
//! mutated, so any holder of an older snapshot keeps a consistent value.

use super::context::Context;
use super::event::Event;
use super::node::NodeId;
use super::tree::StateTree;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Nested rendering of a configuration.
///
/// A compound node whose active child is atomic renders as the child's key;
/// otherwise it renders as a one-entry map. A parallel node renders as a map
/// with one entry per region, atomic regions being empty maps.
///
/// # Example
///
/// ```rust
/// use statecraft::core::StateValue;
///
/// let value: StateValue = serde_json::from_str(r#"{"red":"walk"}"#).unwrap();
/// assert!(value.matches("red"));
/// assert!(value.matches("red.walk"));
/// assert!(!value.matches("red.wait"));
/// assert_eq!(value.to_string(), r#"{"red":"walk"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Leaf(String),
    Branch(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Build the value of `node` within `configuration`.
    pub fn from_configuration(
        tree: &StateTree,
        node: NodeId,
        configuration: &BTreeSet<NodeId>,
    ) -> Self {
        let state = tree.node(node);
        if state.is_parallel() {
            let regions = tree
                .active_children(node, configuration)
                .map(|region| {
                    let child = tree.node(region);
                    let value = if child.is_atomic() {
                        StateValue::Branch(BTreeMap::new())
                    } else {
                        Self::from_configuration(tree, region, configuration)
                    };
                    (child.key().to_string(), value)
                })
                .collect();
            return StateValue::Branch(regions);
        }

        match tree.active_children(node, configuration).next() {
            Some(child) if tree.node(child).is_atomic() => {
                StateValue::Leaf(tree.node(child).key().to_string())
            }
            Some(child) => {
                let mut branch = BTreeMap::new();
                branch.insert(
                    tree.node(child).key().to_string(),
                    Self::from_configuration(tree, child, configuration),
                );
                StateValue::Branch(branch)
            }
            None => StateValue::Branch(BTreeMap::new()),
        }
    }

    /// Check whether a dotted path of keys (e.g. `"red.wait"`) is active.
    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        self.matches_segments(&segments)
    }

    fn matches_segments(&self, segments: &[&str]) -> bool {
        let Some((head, rest)) = segments.split_first() else {
            return true;
        };
        match self {
            StateValue::Leaf(key) => rest.is_empty() && key == head,
            StateValue::Branch(children) => children
                .get(*head)
                .is_some_and(|child| child.matches_segments(rest)),
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// A snapshot of a running (or hypothetical) machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct State<C: Context> {
    pub(crate) value: StateValue,
    pub(crate) configuration: BTreeSet<NodeId>,
    pub(crate) context: C,
    pub(crate) history: BTreeMap<String, Vec<NodeId>>,
    pub(crate) event: Event,
    pub(crate) actions: Vec<String>,
    pub(crate) done: bool,
    pub(crate) changed: bool,
}

impl<C: Context> State<C> {
    pub fn value(&self) -> &StateValue {
        &self.value
    }

    /// Active nodes: every active leaf plus all of its ancestors.
    pub fn configuration(&self) -> &BTreeSet<NodeId> {
        &self.configuration
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Remembered configurations, keyed by history node id.
    pub fn history_value(&self) -> &BTreeMap<String, Vec<NodeId>> {
        &self.history
    }

    /// The event that produced this snapshot.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Labels of the actions executed while producing this snapshot, in
    /// execution order.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// True once the root reached a final configuration.
    pub fn done(&self) -> bool {
        self.done
    }

    /// False when the event selected no transition at all.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Shorthand for [`StateValue::matches`].
    pub fn matches(&self, path: &str) -> bool {
        self.value.matches(path)
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.configuration.contains(&node)
    }
}
