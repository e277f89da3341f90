//! Immutable arena of state nodes.
//!
//! The tree is built once by [`MachineBuilder`](crate::builder::MachineBuilder)
//! and never mutated. All hierarchy queries (ancestors, descendants, least
//! common ancestors) are index arithmetic over the arena.

use super::node::{NodeId, StateNode, Transition, TransitionId};
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Debug)]
pub struct StateTree {
    pub(crate) nodes: Vec<StateNode>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) ids: HashMap<String, NodeId>,
}

impl StateTree {
    pub fn root(&self) -> &StateNode {
        &self.nodes[0]
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &StateNode {
        &self.nodes[id.0]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.0]
    }

    /// Look a node up by id. Both explicit ids and dotted paths resolve.
    pub fn find(&self, id: &str) -> Option<&StateNode> {
        let id = id.strip_prefix('#').unwrap_or(id);
        self.ids.get(id).map(|index| self.node(*index))
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &StateNode> {
        self.nodes.iter()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.node(id).parent,
        }
    }

    /// True when `node` is a proper descendant of `ancestor`.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let a = self.node(ancestor);
        node.0 > ancestor.0 && node.0 < a.subtree_end
    }

    /// Proper ancestors of `node` strictly below `stop`, nearest first.
    /// With `stop == None` the walk goes up to and including the root.
    pub fn ancestors_until(&self, node: NodeId, stop: Option<NodeId>) -> Vec<NodeId> {
        self.ancestors(node)
            .take_while(|candidate| Some(*candidate) != stop)
            .collect()
    }

    /// Least common compound ancestor: the nearest proper ancestor of the
    /// first node that is compound and contains every other node as a
    /// descendant. Parallel nodes are skipped so a transition between two
    /// regions exits and re-enters the whole parallel node. Falls back to
    /// the root.
    pub fn lcca(&self, nodes: &[NodeId]) -> NodeId {
        let Some((head, tail)) = nodes.split_first() else {
            return self.root_id();
        };
        self.ancestors(*head)
            .find(|candidate| {
                let node = self.node(*candidate);
                node.is_compound()
                    && tail.iter().all(|other| self.is_descendant(*other, *candidate))
            })
            .unwrap_or_else(|| self.root_id())
    }

    /// Active atomic nodes of a configuration, in document order.
    pub fn atomic_nodes<'a>(
        &'a self,
        configuration: &'a BTreeSet<NodeId>,
    ) -> impl Iterator<Item = NodeId> + 'a {
        configuration
            .iter()
            .copied()
            .filter(move |id| self.node(*id).is_atomic())
    }

    /// Direct children of `parent` present in `configuration`.
    pub fn active_children<'a>(
        &'a self,
        parent: NodeId,
        configuration: &'a BTreeSet<NodeId>,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.node(parent)
            .children
            .iter()
            .copied()
            .filter(move |child| configuration.contains(child))
    }

    /// Whether `node` is in a final configuration: a final node itself, a
    /// compound node whose active child is final, or a parallel node whose
    /// regions are all in final configurations.
    pub fn is_in_final_state(&self, node: NodeId, configuration: &BTreeSet<NodeId>) -> bool {
        let state = self.node(node);
        match state.kind {
            super::NodeKind::Final => true,
            super::NodeKind::Compound => self
                .active_children(node, configuration)
                .any(|child| self.node(child).is_final()),
            super::NodeKind::Parallel => state
                .children
                .iter()
                .filter(|child| !self.node(**child).is_history())
                .all(|child| self.is_in_final_state(*child, configuration)),
            _ => false,
        }
    }
}

/// Iterator over proper ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a StateTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{MachineBuilder, StateConfig};

    fn light_tree() -> crate::core::StateTree {
        let config = StateConfig::new("light")
            .initial("green")
            .state(StateConfig::new("green").on("TIMER", "yellow"))
            .state(StateConfig::new("yellow").on("TIMER", "red"))
            .state(
                StateConfig::new("red")
                    .initial("walk")
                    .state(StateConfig::new("walk"))
                    .state(StateConfig::new("wait")),
            );
        MachineBuilder::<()>::new(config).build().unwrap().tree().clone()
    }

    #[test]
    fn ids_are_dotted_paths_in_document_order() {
        let tree = light_tree();
        let ids: Vec<&str> = tree.nodes().map(|n| n.id()).collect();
        assert_eq!(
            ids,
            vec![
                "light",
                "light.green",
                "light.yellow",
                "light.red",
                "light.red.walk",
                "light.red.wait"
            ]
        );
    }

    #[test]
    fn descendant_check_uses_subtree_ranges() {
        let tree = light_tree();
        let red = tree.find("light.red").unwrap().index();
        let walk = tree.find("light.red.walk").unwrap().index();
        let green = tree.find("#light.green").unwrap().index();

        assert!(tree.is_descendant(walk, red));
        assert!(tree.is_descendant(walk, tree.root_id()));
        assert!(!tree.is_descendant(green, red));
        assert!(!tree.is_descendant(red, red));
    }

    #[test]
    fn ancestors_walk_to_root() {
        let tree = light_tree();
        let walk = tree.find("light.red.walk").unwrap().index();
        let ancestors: Vec<&str> = tree.ancestors(walk).map(|a| tree.node(a).id()).collect();
        assert_eq!(ancestors, vec!["light.red", "light"]);

        let red = tree.find("light.red").unwrap().index();
        assert_eq!(tree.ancestors_until(walk, Some(red)), Vec::new());
        assert_eq!(tree.ancestors_until(walk, None).len(), 2);
    }

    #[test]
    fn lcca_finds_nearest_common_compound() {
        let tree = light_tree();
        let walk = tree.find("light.red.walk").unwrap().index();
        let wait = tree.find("light.red.wait").unwrap().index();
        let green = tree.find("light.green").unwrap().index();
        let red = tree.find("light.red").unwrap().index();

        assert_eq!(tree.lcca(&[walk, wait]), red);
        assert_eq!(tree.lcca(&[walk, green]), tree.root_id());
        assert_eq!(tree.lcca(&[red, red]), tree.root_id());
    }

    #[test]
    fn lcca_skips_parallel_ancestors() {
        let config = StateConfig::new("m").initial("p").state(
            StateConfig::new("p")
                .parallel()
                .state(StateConfig::new("a").initial("a1").state(StateConfig::new("a1")))
                .state(StateConfig::new("b").initial("b1").state(StateConfig::new("b1"))),
        );
        let machine = MachineBuilder::<()>::new(config).build().unwrap();
        let tree = machine.tree();
        let a1 = tree.find("m.p.a.a1").unwrap().index();
        let b1 = tree.find("m.p.b.b1").unwrap().index();

        assert_eq!(tree.lcca(&[a1, b1]), tree.root_id());
    }
}
