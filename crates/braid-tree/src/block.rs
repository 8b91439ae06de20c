//! Blocks: compressed runs of unbranched, untouched nodes.

use braid_core::{clock_of, BlockId, LookupError, Neighbors, NodeId, Rounding, State};

use crate::tree::Tree;

/// A maximal chain of at least two nodes in which every member but the
/// last has exactly one child (the next member) and no member is touched.
///
/// Blocks own no nodes; they are derived structure over the tree's
/// parent/child links. Node ids increase along a chain, so membership
/// lookups bisect the id array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) nodes: Vec<NodeId>,
}

impl Block {
    /// This block's slot id.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Member nodes, oldest first.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of members; always at least two.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; blocks dissolve below two members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The oldest member.
    pub fn first(&self) -> NodeId {
        self.nodes[0]
    }

    /// The newest member.
    pub fn last(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Position of `node` within the block.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.binary_search(&node).ok()
    }

    /// Whether `node` is a member.
    pub fn contains(&self, node: NodeId) -> bool {
        self.index_of(node).is_some()
    }

    /// One member by a non-decreasing measure of its state.
    pub fn node_by_measure<S: State>(
        &self,
        tree: &Tree<S>,
        measure: impl Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, LookupError> {
        let found = braid_core::search(
            self.nodes.len(),
            |i| measure(tree.state_unchecked(self.nodes[i])),
            target,
            rounding,
        )?;
        Ok(found.map(|i| self.nodes[i]))
    }

    /// Both neighbouring members of `target` by a non-decreasing measure.
    pub fn nodes_by_measure<S: State>(
        &self,
        tree: &Tree<S>,
        measure: impl Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<NodeId>, LookupError> {
        let both = braid_core::search_both(
            self.nodes.len(),
            |i| measure(tree.state_unchecked(self.nodes[i])),
            target,
        )?;
        Ok(both.map(|i| self.nodes[i]))
    }

    /// One member by clock.
    pub fn node_by_clock<S: State>(
        &self,
        tree: &Tree<S>,
        clock: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, LookupError> {
        self.node_by_measure(tree, clock_of::<S>, clock, rounding)
    }
}
