//! Test utilities and fixture simpacks for braid development.
//!
//! Provides a minimal [`TestState`], tree builders, invariant assertions,
//! and a polling helper for tests that wait on background crunchers.
//! Fixture simpacks live in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::thread;
use std::time::{Duration, Instant};

use braid_core::{NodeId, State};
use braid_tree::Tree;

/// An integer counter with an optional clock.
#[derive(Clone, Debug, PartialEq)]
pub struct TestState {
    pub n: i64,
    pub clock: Option<f64>,
}

impl TestState {
    /// A state without a clock; the tree assigns one on insertion.
    pub fn new(n: i64) -> Self {
        Self { n, clock: None }
    }

    /// A state with an explicit clock.
    pub fn at(n: i64, clock: f64) -> Self {
        Self {
            n,
            clock: Some(clock),
        }
    }

    /// The successor state, clock left for the tree to assign.
    pub fn next(&self) -> Self {
        Self::new(self.n + 1)
    }
}

impl State for TestState {
    fn clock(&self) -> Option<f64> {
        self.clock
    }

    fn set_clock(&mut self, clock: f64) {
        self.clock = Some(clock);
    }
}

// ── Tree builders ─────────────────────────────────────────────────

/// Append `count` untouched states under `parent`, each one more than
/// the last. Returns the new nodes in order.
pub fn extend_chain(tree: &mut Tree<TestState>, parent: NodeId, count: usize) -> Vec<NodeId> {
    let mut nodes = Vec::with_capacity(count);
    let mut current = parent;
    for _ in 0..count {
        let next = tree
            .state(current)
            .map(|s| s.next())
            .expect("parent must exist");
        current = tree.add_state(next, Some(current)).expect("parent must exist");
        nodes.push(current);
    }
    nodes
}

/// A tree holding one unbranched chain of `len` nodes, `n = 0..len`.
pub fn linear_tree(len: usize) -> (Tree<TestState>, Vec<NodeId>) {
    assert!(len > 0, "a linear tree needs at least a root");
    let mut tree = Tree::new();
    let root = tree
        .add_state(TestState::new(0), None)
        .expect("roots always insert");
    let mut nodes = vec![root];
    nodes.extend(extend_chain(&mut tree, root, len - 1));
    (tree, nodes)
}

/// A root chain of `trunk` nodes with two branches of `branch` nodes
/// forking off its last node. Returns the tree, the fork node, and the
/// two branch tips.
pub fn forked_tree(trunk: usize, branch: usize) -> (Tree<TestState>, NodeId, [NodeId; 2]) {
    let (mut tree, nodes) = linear_tree(trunk);
    let fork = *nodes.last().expect("trunk is non-empty");
    let left = extend_chain(&mut tree, fork, branch);
    let right = extend_chain(&mut tree, fork, branch);
    let tip = |v: &[NodeId]| *v.last().unwrap_or(&fork);
    (tree, fork, [tip(&left), tip(&right)])
}

// ── Assertions ────────────────────────────────────────────────────

/// Panic unless the tree's blocks match a from-scratch reconstruction.
pub fn assert_blocks_consistent<S: State>(tree: &Tree<S>) {
    if let Err(e) = tree.check_blocks() {
        panic!("block invariant violated: {e}");
    }
}

/// Poll `cond` every millisecond until it holds or `timeout` passes.
/// Returns whether it held.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
