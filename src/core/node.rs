//! State nodes and transitions stored in a [`StateTree`](super::StateTree).

use super::event::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Index of a node inside its tree.
///
/// Indices are assigned in document order (pre-order, children in
/// declaration order), so comparing two ids compares document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a transition inside its tree, in document order of the source
/// node and then declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Atomic,
    Compound,
    Parallel,
    Final,
    History,
}

impl NodeKind {
    /// Atomic and final nodes have no children of their own.
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Atomic | NodeKind::Final)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Atomic => "atomic",
            NodeKind::Compound => "compound",
            NodeKind::Parallel => "parallel",
            NodeKind::Final => "final",
            NodeKind::History => "history",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    #[default]
    Shallow,
    Deep,
}

/// A resolved action reference.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionRef {
    /// A registered assign or effect implementation.
    Named(String),
    /// Put an event on the internal queue of the current macrostep.
    Raise(Event),
    /// Deliver an event to an invoked actor.
    SendTo { actor: String, event: Event },
}

impl ActionRef {
    /// Label recorded in [`State::actions`](super::State::actions).
    pub fn label(&self) -> String {
        match self {
            ActionRef::Named(name) => name.clone(),
            ActionRef::Raise(event) => format!("raise({event})"),
            ActionRef::SendTo { actor, event } => format!("send_to({actor}, {event})"),
        }
    }
}

/// A delayed transition declared with `after`.
#[derive(Clone, Debug, PartialEq)]
pub struct Delayed {
    pub delay: Duration,
    /// Synthetic event type the scheduled timer delivers.
    pub event_type: String,
}

/// An actor invocation declared with `invoke`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub id: String,
    pub src: String,
}

/// One node of the state hierarchy.
///
/// Nodes are immutable once the tree is built. The parent link is a plain
/// index; the tree owns every node.
#[derive(Clone, Debug)]
pub struct StateNode {
    pub(crate) index: NodeId,
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) initial: Option<NodeId>,
    pub(crate) history: Option<HistoryMode>,
    pub(crate) history_target: Vec<NodeId>,
    pub(crate) entry: Vec<ActionRef>,
    pub(crate) exit: Vec<ActionRef>,
    pub(crate) on: Vec<(String, Vec<TransitionId>)>,
    pub(crate) always: Vec<TransitionId>,
    pub(crate) after: Vec<Delayed>,
    pub(crate) invoke: Vec<Invocation>,
    pub(crate) depth: usize,
    /// One past the index of the last node in this subtree.
    pub(crate) subtree_end: usize,
}

impl StateNode {
    pub fn index(&self) -> NodeId {
        self.index
    }

    /// Unique id: the explicit `id` from the definition, or the dotted
    /// path of keys from the root.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key of the node inside its parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn initial(&self) -> Option<NodeId> {
        self.initial
    }

    pub fn history_mode(&self) -> Option<HistoryMode> {
        self.history
    }

    pub fn entry(&self) -> &[ActionRef] {
        &self.entry
    }

    pub fn exit(&self) -> &[ActionRef] {
        &self.exit
    }

    pub fn after(&self) -> &[Delayed] {
        &self.after
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invoke
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Candidate transitions for an event type, in declaration order.
    pub fn transitions_for(&self, event_type: &str) -> &[TransitionId] {
        self.on
            .iter()
            .find(|(event, _)| event == event_type)
            .map(|(_, transitions)| transitions.as_slice())
            .unwrap_or(&[])
    }

    pub fn always(&self) -> &[TransitionId] {
        &self.always
    }

    /// Event types this node declares handlers for, in declaration order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.on.iter().map(|(event, _)| event.as_str())
    }

    pub fn is_compound(&self) -> bool {
        self.kind == NodeKind::Compound
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == NodeKind::Parallel
    }

    pub fn is_final(&self) -> bool {
        self.kind == NodeKind::Final
    }

    pub fn is_history(&self) -> bool {
        self.kind == NodeKind::History
    }

    pub fn is_atomic(&self) -> bool {
        self.kind.is_leaf()
    }
}

/// A transition between nodes.
#[derive(Clone, Debug)]
pub struct Transition {
    pub(crate) index: TransitionId,
    pub(crate) source: NodeId,
    /// `None` for eventless (`always`) transitions.
    pub(crate) event: Option<String>,
    pub(crate) guard: Option<String>,
    pub(crate) actions: Vec<ActionRef>,
    pub(crate) targets: Vec<NodeId>,
    pub(crate) reenter: bool,
}

impl Transition {
    pub fn index(&self) -> TransitionId {
        self.index
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn guard(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    pub fn actions(&self) -> &[ActionRef] {
        &self.actions
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    /// Targetless transitions run their actions without exiting anything.
    pub fn is_targetless(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn reenter(&self) -> bool {
        self.reenter
    }
}
