//! Lineages: one root-to-node route resolved into contiguous runs.
//!
//! A lineage is built by hopping whole blocks, so its cost is the number
//! of runs on the route rather than the number of nodes. Positional access
//! bisects the run offsets, and measure lookups bisect the positions, so a
//! lookup over a long unbranched history touches O(log n) nodes.

use std::sync::Arc;

use braid_core::{clock_of, LookupError, Neighbors, NodeId, Rounding, State};

use crate::tree::Tree;

/// A sequence of nodes from a root downwards, stored as borrowed runs.
///
/// Runs are either a block's members or a single unblocked node.
pub struct Lineage<'t, S> {
    tree: &'t Tree<S>,
    runs: Vec<&'t [NodeId]>,
    offsets: Vec<usize>,
    len: usize,
}

impl<'t, S: State> Lineage<'t, S> {
    pub(crate) fn new(tree: &'t Tree<S>) -> Self {
        Self {
            tree,
            runs: Vec::new(),
            offsets: Vec::new(),
            len: 0,
        }
    }

    /// Append a run below the current end.
    pub(crate) fn push_run(&mut self, run: &'t [NodeId]) {
        self.offsets.push(self.len);
        self.len += run.len();
        self.runs.push(run);
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the lineage has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The contiguous runs, oldest first.
    pub fn runs(&self) -> &[&'t [NodeId]] {
        &self.runs
    }

    /// Node at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<NodeId> {
        (index < self.len).then(|| self.node_at(index))
    }

    /// Node at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= self.len()`.
    pub fn node_at(&self, index: usize) -> NodeId {
        let run = self.offsets.partition_point(|&o| o <= index) - 1;
        self.runs[run][index - self.offsets[run]]
    }

    /// State at `index`.
    ///
    /// # Panics
    ///
    /// If `index >= self.len()`.
    pub fn state_at(&self, index: usize) -> &'t Arc<S> {
        &self.tree.node_unchecked(self.node_at(index)).state
    }

    /// The deepest node.
    pub fn last(&self) -> Option<NodeId> {
        self.runs.last().and_then(|r| r.last()).copied()
    }

    /// All nodes, oldest first.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.iter().collect()
    }

    /// Walk the nodes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.runs.iter().flat_map(|r| r.iter().copied())
    }

    /// One node by a non-decreasing measure, with rounding.
    pub fn node_by_measure(
        &self,
        measure: impl Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, LookupError> {
        let found = braid_core::search(
            self.len,
            |i| measure(self.state_at(i)),
            target,
            rounding,
        )?;
        Ok(found.map(|i| self.node_at(i)))
    }

    /// Both neighbours of `target` by a non-decreasing measure.
    pub fn nodes_by_measure(
        &self,
        measure: impl Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<NodeId>, LookupError> {
        let both = braid_core::search_both(self.len, |i| measure(self.state_at(i)), target)?;
        Ok(both.map(|i| self.node_at(i)))
    }

    /// One node by clock, with rounding.
    pub fn node_by_clock(
        &self,
        clock: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, LookupError> {
        self.node_by_measure(clock_of::<S>, clock, rounding)
    }

    /// Both neighbours of `clock`.
    pub fn nodes_by_clock(&self, clock: f64) -> Result<Neighbors<NodeId>, LookupError> {
        self.nodes_by_measure(clock_of::<S>, clock)
    }
}

impl<S> std::fmt::Debug for Lineage<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lineage")
            .field("runs", &self.runs)
            .field("len", &self.len)
            .finish()
    }
}
