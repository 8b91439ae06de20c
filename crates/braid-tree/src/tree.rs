//! The branching history tree.
//!
//! [`Tree`] is an arena: nodes live in one `Vec` addressed by [`NodeId`],
//! blocks in a second `Vec` of recyclable slots addressed by [`BlockId`].
//! Nodes are only ever appended. Block bookkeeping runs on every insert
//! and touches at most one block.

use std::sync::Arc;

use braid_core::{assign_clock, clock_of, BlockId, Neighbors, NodeId, Rounding, State};
use braid_step::StepProfile;

use crate::block::Block;
use crate::error::TreeError;
use crate::lineage::Lineage;
use crate::node::{End, Node};
use crate::path::Path;

/// A forest of states, each node linked to its parent and children.
///
/// # Block rule
///
/// The edge `p -> c` is a *link* when `p` has exactly one child `c` and
/// neither is touched. Blocks are the maximal chains of links with at
/// least two nodes. Adding a child therefore does exactly one thing to
/// the blocks, decided by how many children the parent had before:
///
/// - none: the new edge may be a link, extending the parent's block or
///   creating a two-node block;
/// - one: the old link (if any) breaks, splitting the block after the
///   parent and dissolving any part left with fewer than two nodes;
/// - more: nothing.
pub struct Tree<S> {
    nodes: Vec<Node<S>>,
    roots: Vec<NodeId>,
    blocks: Vec<Option<Block>>,
    free_blocks: Vec<BlockId>,
}

impl<S: State> Default for Tree<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Tree<S> {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            blocks: Vec::new(),
            free_blocks: Vec::new(),
        }
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parentless nodes in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node<S>, TreeError> {
        self.nodes
            .get(id.index())
            .ok_or(TreeError::UnknownNode { node: id })
    }

    /// Node by id, if present.
    pub fn get(&self, id: NodeId) -> Option<&Node<S>> {
        self.nodes.get(id.index())
    }

    /// State of a node.
    pub fn state(&self, id: NodeId) -> Result<&Arc<S>, TreeError> {
        Ok(self.node(id)?.state())
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<S>> {
        self.nodes.iter()
    }

    /// Block in slot `id`, if live.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index()).and_then(Option::as_ref)
    }

    /// All live blocks.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().flatten()
    }

    /// The block `node` belongs to.
    pub fn block_of(&self, node: NodeId) -> Option<&Block> {
        self.get(node)?.block.and_then(|b| self.block(b))
    }

    pub(crate) fn node_unchecked(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.index()]
    }

    pub(crate) fn state_unchecked(&self, id: NodeId) -> &S {
        &self.nodes[id.index()].state
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<S>, TreeError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(TreeError::UnknownNode { node: id })
    }

    // ── insertion ──────────────────────────────────────────────

    /// Add an untouched state under `parent`, or as a new root.
    ///
    /// A state without a clock gets the parent's clock plus one (zero for
    /// a root). A clock already set is kept as is.
    pub fn add_state(
        &mut self,
        state: impl Into<Arc<S>>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        self.insert(state.into(), parent, false, false, None)
    }

    /// Add a state produced by stepping `parent` with `step_profile`.
    pub fn add_stepped_state(
        &mut self,
        state: impl Into<Arc<S>>,
        parent: NodeId,
        step_profile: StepProfile<S>,
    ) -> Result<NodeId, TreeError> {
        self.insert(state.into(), Some(parent), false, false, Some(step_profile))
    }

    /// Add a state that came from an edit rather than from stepping.
    ///
    /// Touched nodes never join blocks. While `still_in_editing` is set,
    /// the state may be changed with [`Tree::edit_state`] and nothing
    /// crunches from the node.
    pub fn add_touched_state(
        &mut self,
        state: impl Into<Arc<S>>,
        parent: Option<NodeId>,
        still_in_editing: bool,
    ) -> Result<NodeId, TreeError> {
        self.insert(state.into(), parent, true, still_in_editing, None)
    }

    fn insert(
        &mut self,
        mut state: Arc<S>,
        parent: Option<NodeId>,
        touched: bool,
        still_in_editing: bool,
        step_profile: Option<StepProfile<S>>,
    ) -> Result<NodeId, TreeError> {
        let parent_clock = match parent {
            Some(p) => Some(self.node(p)?.clock()),
            None => None,
        };
        if state.clock().is_none() {
            assign_clock(Arc::make_mut(&mut state), parent_clock);
        }

        debug_assert!(self.nodes.len() < u32::MAX as usize, "node arena exhausted");
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            state,
            parent,
            children: Default::default(),
            block: None,
            touched,
            still_in_editing,
            step_profile,
            ends: Vec::new(),
        });

        match parent {
            None => self.roots.push(id),
            Some(p) => {
                let siblings = self.nodes[p.index()].children.len();
                self.nodes[p.index()].children.push(id);
                match siblings {
                    0 => self.extend_block(p, id),
                    1 => self.split_block_after(p),
                    _ => {}
                }
            }
        }
        Ok(id)
    }

    /// `parent` just got its first child.
    fn extend_block(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes[parent.index()].touched || self.nodes[child.index()].touched {
            return;
        }
        // A childless parent is always the last member of its block.
        let block = match self.nodes[parent.index()].block {
            Some(b) => {
                if let Some(block) = self.blocks[b.index()].as_mut() {
                    block.nodes.push(child);
                }
                b
            }
            None => {
                let b = self.alloc_block(vec![parent, child]);
                self.nodes[parent.index()].block = Some(b);
                b
            }
        };
        self.nodes[child.index()].block = Some(block);
    }

    /// `parent` just got its second child; its link to the first breaks.
    fn split_block_after(&mut self, parent: NodeId) {
        let Some(b) = self.nodes[parent.index()].block else {
            return;
        };
        let first_child = self.nodes[parent.index()].children[0];
        if self.nodes[first_child.index()].block != Some(b) {
            return;
        }
        let Some(block) = self.blocks[b.index()].as_mut() else {
            return;
        };
        let Some(at) = block.index_of(parent) else {
            return;
        };
        let tail = block.nodes.split_off(at + 1);
        if block.nodes.len() < 2 {
            self.free_block(b);
            self.nodes[parent.index()].block = None;
        }
        if tail.len() >= 2 {
            let nb = self.alloc_block(tail.clone());
            for n in tail {
                self.nodes[n.index()].block = Some(nb);
            }
        } else {
            for n in tail {
                self.nodes[n.index()].block = None;
            }
        }
    }

    fn alloc_block(&mut self, nodes: Vec<NodeId>) -> BlockId {
        match self.free_blocks.pop() {
            Some(id) => {
                self.blocks[id.index()] = Some(Block { id, nodes });
                id
            }
            None => {
                let id = BlockId(self.blocks.len() as u32);
                self.blocks.push(Some(Block { id, nodes }));
                id
            }
        }
    }

    fn free_block(&mut self, id: BlockId) {
        self.blocks[id.index()] = None;
        self.free_blocks.push(id);
    }

    // ── node mutation ──────────────────────────────────────────

    /// Record that the world ended at `node` under `step_profile`.
    ///
    /// Returns `false` if that end was already recorded.
    pub fn make_end(
        &mut self,
        node: NodeId,
        step_profile: StepProfile<S>,
    ) -> Result<bool, TreeError> {
        let n = self.node_mut(node)?;
        if n.has_end_for(&step_profile) {
            return Ok(false);
        }
        n.ends.push(End::new(step_profile));
        Ok(true)
    }

    /// Change the state of a node that is still in editing.
    pub fn edit_state(&mut self, node: NodeId, f: impl FnOnce(&mut S)) -> Result<(), TreeError> {
        let n = self.node_mut(node)?;
        if !n.still_in_editing {
            return Err(TreeError::NotEditable { node });
        }
        f(Arc::make_mut(&mut n.state));
        Ok(())
    }

    /// Mark an edited node as final. A no-op on nodes not in editing.
    pub fn finalize(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.node_mut(node)?.still_in_editing = false;
        Ok(())
    }

    // ── invariants ─────────────────────────────────────────────

    /// The child `node` links to, per the block rule.
    fn link_from(&self, node: &Node<S>) -> Option<NodeId> {
        match node.children.as_slice() {
            [only] if !node.touched && !self.nodes[only.index()].touched => Some(*only),
            _ => None,
        }
    }

    /// Rebuild blocks from the parent/child graph and compare.
    pub fn check_blocks(&self) -> Result<(), TreeError> {
        let mut expected: Vec<Vec<NodeId>> = Vec::new();
        for node in &self.nodes {
            let continues = node
                .parent
                .is_some_and(|p| self.link_from(&self.nodes[p.index()]) == Some(node.id));
            if continues {
                continue;
            }
            let mut chain = vec![node.id];
            let mut cursor = node;
            while let Some(next) = self.link_from(cursor) {
                chain.push(next);
                cursor = &self.nodes[next.index()];
            }
            if chain.len() >= 2 {
                expected.push(chain);
            }
        }

        let mut actual: Vec<Vec<NodeId>> = Vec::new();
        for block in self.blocks() {
            for &n in &block.nodes {
                if self.nodes[n.index()].block != Some(block.id) {
                    return Err(TreeError::BlockInvariant {
                        reason: format!("node {n} is listed in block {} but points elsewhere", block.id),
                    });
                }
            }
            actual.push(block.nodes.clone());
        }
        for node in &self.nodes {
            if let Some(b) = node.block {
                if !self.block(b).is_some_and(|block| block.contains(node.id)) {
                    return Err(TreeError::BlockInvariant {
                        reason: format!("node {} points to block {b} which does not list it", node.id),
                    });
                }
            }
        }

        expected.sort();
        actual.sort();
        if expected != actual {
            return Err(TreeError::BlockInvariant {
                reason: format!("expected blocks {expected:?}, found {actual:?}"),
            });
        }
        Ok(())
    }

    // ── navigation ─────────────────────────────────────────────

    /// The root `node` descends from.
    pub fn root_of(&self, node: NodeId) -> Result<NodeId, TreeError> {
        let mut n = self.node(node)?.id;
        loop {
            if let Some(block) = self.block_of(n) {
                n = block.first();
            }
            match self.nodes[n.index()].parent {
                Some(p) => n = p,
                None => return Ok(n),
            }
        }
    }

    /// The node `generations` steps above `node`; `None` past the root.
    pub fn ancestor(&self, node: NodeId, generations: usize) -> Result<Option<NodeId>, TreeError> {
        self.node(node)?;
        let mut n = node;
        let mut remaining = generations;
        loop {
            if remaining == 0 {
                return Ok(Some(n));
            }
            if let Some(block) = self.block_of(n) {
                if let Some(at) = block.index_of(n) {
                    if remaining <= at {
                        return Ok(Some(block.nodes[at - remaining]));
                    }
                    remaining -= at;
                    n = block.first();
                }
            }
            match self.nodes[n.index()].parent {
                Some(p) => {
                    n = p;
                    remaining -= 1;
                }
                None => return Ok(None),
            }
        }
    }

    /// Number of ancestors above `node`; zero for a root.
    pub fn depth(&self, node: NodeId) -> Result<usize, TreeError> {
        self.node(node)?;
        let mut depth = 0;
        let mut n = node;
        loop {
            if let Some(block) = self.block_of(n) {
                if let Some(at) = block.index_of(n) {
                    depth += at;
                    n = block.first();
                }
            }
            match self.nodes[n.index()].parent {
                Some(p) => {
                    depth += 1;
                    n = p;
                }
                None => return Ok(depth),
            }
        }
    }

    /// The lineage from `node`'s root down to `node`, one run per block.
    pub fn lineage(&self, node: NodeId) -> Result<Lineage<'_, S>, TreeError> {
        self.node(node)?;
        let mut runs: Vec<&[NodeId]> = Vec::new();
        let mut n = node;
        loop {
            match self.block_of(n).and_then(|b| Some((b, b.index_of(n)?))) {
                Some((block, at)) => {
                    runs.push(&block.nodes[..=at]);
                    n = block.first();
                }
                None => runs.push(std::slice::from_ref(&self.nodes[n.index()].id)),
            }
            match self.nodes[n.index()].parent {
                Some(p) => n = p,
                None => break,
            }
        }
        let mut lineage = Lineage::new(self);
        for run in runs.into_iter().rev() {
            lineage.push_run(run);
        }
        Ok(lineage)
    }

    /// Every node from the root down to `node`, inclusive.
    pub fn path_to(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        Ok(self.lineage(node)?.nodes())
    }

    /// One node of the lineage ending at `node`, by a non-decreasing
    /// measure with rounding.
    pub fn node_by_measure(
        &self,
        node: NodeId,
        measure: impl Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, TreeError> {
        Ok(self.lineage(node)?.node_by_measure(measure, target, rounding)?)
    }

    /// Both neighbours of `target` in the lineage ending at `node`.
    pub fn nodes_by_measure(
        &self,
        node: NodeId,
        measure: impl Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<NodeId>, TreeError> {
        Ok(self.lineage(node)?.nodes_by_measure(measure, target)?)
    }

    /// One node of the lineage ending at `node`, by clock.
    pub fn node_by_clock(
        &self,
        node: NodeId,
        clock: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, TreeError> {
        self.node_by_measure(node, clock_of::<S>, clock, rounding)
    }

    /// Both neighbours of `clock` in the lineage ending at `node`.
    pub fn nodes_by_clock(&self, node: NodeId, clock: f64) -> Result<Neighbors<NodeId>, TreeError> {
        self.nodes_by_measure(node, clock_of::<S>, clock)
    }

    /// Leaves descending from `node` (itself included) whose clock is at
    /// most `max_clock_distance` past `node`'s clock.
    ///
    /// Blocks are crossed in one hop.
    pub fn leaves_within(
        &self,
        node: NodeId,
        max_clock_distance: f64,
    ) -> Result<Vec<NodeId>, TreeError> {
        let limit = self.node(node)?.clock() + max_clock_distance;
        let mut leaves = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let hop = self.block_of(n).map_or(n, Block::last);
            let current = &self.nodes[hop.index()];
            if current.is_leaf() {
                if current.clock() <= limit {
                    leaves.push(hop);
                }
            } else {
                stack.extend(current.children.iter().rev());
            }
        }
        Ok(leaves)
    }

    /// Every leaf in the tree, in insertion order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    /// One path per leaf.
    pub fn all_possible_paths(&self) -> Vec<Path> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| self.make_containing_path(leaf).ok())
            .collect()
    }

    /// A path from `node`'s root that passes through `node`.
    pub fn make_containing_path(&self, node: NodeId) -> Result<Path, TreeError> {
        let mut path = Path::new(self.root_of(node)?);
        path.modify_to_include_node(self, node)?;
        Ok(path)
    }
}

impl<S: State> std::fmt::Debug for Tree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots)
            .field("blocks", &self.blocks().count())
            .finish()
    }
}
