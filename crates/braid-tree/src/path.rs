//! Paths: deterministic routes through a tree's forks.

use indexmap::IndexMap;

use braid_core::{clock_of, resolve_index, Neighbors, NodeId, Rounding, State};

use crate::error::TreeError;
use crate::lineage::Lineage;
use crate::tree::Tree;

/// A route from a root through the tree, choosing one child at each fork.
///
/// A path owns no nodes, only its start and a map of fork decisions.
/// The first time it passes an undecided fork it takes the newest child
/// and remembers that choice; later traversals through the same fork
/// always agree until [`Path::modify_to_include_node`] retargets it.
/// Because decisions are filled in lazily, reads take `&mut self`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    root: NodeId,
    decisions: IndexMap<NodeId, NodeId>,
}

impl Path {
    /// A path starting at `root` with no decisions yet.
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            decisions: IndexMap::new(),
        }
    }

    /// The node the path starts at.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Fork decisions made so far, in the order they were made.
    pub fn decisions(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.decisions.iter().map(|(&fork, &child)| (fork, child))
    }

    /// The node after `node` on this path, deciding forks as needed.
    pub fn next_node<S: State>(&mut self, tree: &Tree<S>, node: NodeId) -> Option<NodeId> {
        let current = tree.get(node)?;
        match current.children() {
            [] => None,
            [only] => Some(*only),
            children => {
                let newest = children[children.len() - 1];
                let decided = *self.decisions.entry(node).or_insert(newest);
                Some(decided)
            }
        }
    }

    /// Resolve the path into runs, deciding forks as needed.
    pub fn lineage<'t, S: State>(&mut self, tree: &'t Tree<S>) -> Lineage<'t, S> {
        let mut lineage = Lineage::new(tree);
        let mut cursor = tree.get(self.root).map(|n| n.id());
        while let Some(n) = cursor {
            let node = tree.node_unchecked(n);
            let (run, tail) = match tree.block_of(n).and_then(|b| Some((b, b.index_of(n)?))) {
                Some((block, at)) => (&block.nodes()[at..], block.last()),
                None => (std::slice::from_ref(&node.id), n),
            };
            lineage.push_run(run);
            cursor = self.next_node(tree, tail);
        }
        lineage
    }

    /// Number of nodes from the root to the end.
    pub fn len<S: State>(&mut self, tree: &Tree<S>) -> usize {
        self.lineage(tree).len()
    }

    /// Always false for a path whose root is in `tree`.
    pub fn is_empty<S: State>(&mut self, tree: &Tree<S>) -> bool {
        self.len(tree) == 0
    }

    /// All nodes from the root to the end.
    pub fn nodes<S: State>(&mut self, tree: &Tree<S>) -> Vec<NodeId> {
        self.lineage(tree).nodes()
    }

    /// Walk the path node by node.
    pub fn iter<'a, S: State>(&'a mut self, tree: &'a Tree<S>) -> PathIter<'a, S> {
        let next = tree.get(self.root).map(|n| n.id());
        PathIter {
            path: self,
            tree,
            next,
        }
    }

    /// Node at `index`; negative indices count from the end.
    pub fn get<S: State>(&mut self, tree: &Tree<S>, index: isize) -> Result<NodeId, TreeError> {
        let lineage = self.lineage(tree);
        let i = resolve_index(index, lineage.len())?;
        Ok(lineage.node_at(i))
    }

    /// The final node (a leaf).
    pub fn last_node<S: State>(&mut self, tree: &Tree<S>) -> Result<NodeId, TreeError> {
        self.get(tree, -1)
    }

    /// Whether the path passes through `node`.
    pub fn contains<S: State>(&mut self, tree: &Tree<S>, node: NodeId) -> bool {
        let Ok(lineage) = tree.path_to(node) else {
            return false;
        };
        let Some(start) = lineage.iter().position(|&n| n == self.root) else {
            return false;
        };
        lineage[start..]
            .windows(2)
            .all(|pair| self.next_node(tree, pair[0]) == Some(pair[1]))
    }

    /// Position of `node` along the path.
    pub fn index_of<S: State>(&mut self, tree: &Tree<S>, node: NodeId) -> Result<usize, TreeError> {
        if !self.contains(tree, node) {
            tree.node(node)?;
            return Err(TreeError::NotOnPath { node });
        }
        let lineage = tree.path_to(node)?;
        let start = lineage.iter().position(|&n| n == self.root).unwrap_or(0);
        Ok(lineage.len() - 1 - start)
    }

    /// Retarget fork decisions so the path passes through `node`.
    ///
    /// If `node` lies under a different root, the path moves there.
    pub fn modify_to_include_node<S: State>(
        &mut self,
        tree: &Tree<S>,
        node: NodeId,
    ) -> Result<(), TreeError> {
        let lineage = tree.path_to(node)?;
        let start = match lineage.iter().position(|&n| n == self.root) {
            Some(start) => start,
            None => {
                self.root = lineage[0];
                0
            }
        };
        for pair in lineage[start..].windows(2) {
            if tree.node_unchecked(pair[0]).is_fork() {
                self.decisions.insert(pair[0], pair[1]);
            }
        }
        Ok(())
    }

    /// One node by a non-decreasing measure, with rounding.
    pub fn node_by_measure<S: State>(
        &mut self,
        tree: &Tree<S>,
        measure: impl Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, TreeError> {
        Ok(self.lineage(tree).node_by_measure(measure, target, rounding)?)
    }

    /// Both neighbours of `target` by a non-decreasing measure.
    pub fn nodes_by_measure<S: State>(
        &mut self,
        tree: &Tree<S>,
        measure: impl Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<NodeId>, TreeError> {
        Ok(self.lineage(tree).nodes_by_measure(measure, target)?)
    }

    /// One node by clock, with rounding.
    pub fn node_by_clock<S: State>(
        &mut self,
        tree: &Tree<S>,
        clock: f64,
        rounding: Rounding,
    ) -> Result<Option<NodeId>, TreeError> {
        self.node_by_measure(tree, clock_of::<S>, clock, rounding)
    }

    /// Both neighbours of `clock`.
    pub fn nodes_by_clock<S: State>(
        &mut self,
        tree: &Tree<S>,
        clock: f64,
    ) -> Result<Neighbors<NodeId>, TreeError> {
        self.nodes_by_measure(tree, clock_of::<S>, clock)
    }
}

/// Node-by-node walk along a [`Path`], deciding forks as it goes.
pub struct PathIter<'a, S> {
    path: &'a mut Path,
    tree: &'a Tree<S>,
    next: Option<NodeId>,
}

impl<S: State> Iterator for PathIter<'_, S> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.path.next_node(self.tree, current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    struct Tick(Option<f64>);

    impl State for Tick {
        fn clock(&self) -> Option<f64> {
            self.0
        }
        fn set_clock(&mut self, clock: f64) {
            self.0 = Some(clock);
        }
    }

    fn grow(tree: &mut Tree<Tick>, from: NodeId, len: usize) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut parent = from;
        for _ in 0..len {
            parent = tree.add_state(Tick(None), Some(parent)).unwrap();
            ids.push(parent);
        }
        ids
    }

    /// root -> a0..a5, with a fork at a1 into b0..b2.
    fn forked() -> (Tree<Tick>, NodeId, Vec<NodeId>, Vec<NodeId>) {
        let mut tree = Tree::new();
        let root = tree.add_state(Tick(None), None).unwrap();
        let a = grow(&mut tree, root, 6);
        let b = grow(&mut tree, a[1], 3);
        (tree, root, a, b)
    }

    #[test]
    fn undecided_fork_takes_newest_child() {
        let (tree, root, a, b) = forked();
        let mut path = Path::new(root);
        let mut expected = vec![root, a[0], a[1]];
        expected.extend(&b);
        assert_eq!(path.nodes(&tree), expected);
        assert_eq!(path.decisions().collect::<Vec<_>>(), vec![(a[1], b[0])]);
    }

    #[test]
    fn decisions_are_stable_after_new_children() {
        let (mut tree, root, a, b) = forked();
        let mut path = Path::new(root);
        let before = path.nodes(&tree);
        grow(&mut tree, a[1], 2);
        assert_eq!(path.nodes(&tree), before);
        assert_eq!(path.last_node(&tree).unwrap(), b[2]);
    }

    #[test]
    fn retarget_includes_node() {
        let (tree, root, a, _) = forked();
        let mut path = Path::new(root);
        path.modify_to_include_node(&tree, a[4]).unwrap();
        assert!(path.contains(&tree, a[4]));
        assert_eq!(path.last_node(&tree).unwrap(), a[5]);
        assert_eq!(path.len(&tree), 7);
        assert_eq!(path.index_of(&tree, a[4]).unwrap(), 5);
    }

    #[test]
    fn indexing_and_iteration_agree() {
        let (tree, root, _, _) = forked();
        let mut path = Path::new(root);
        let walked: Vec<NodeId> = path.iter(&tree).collect();
        assert_eq!(walked, path.nodes(&tree));
        let len = path.len(&tree) as isize;
        for i in 0..len {
            assert_eq!(path.get(&tree, i).unwrap(), walked[i as usize]);
            assert_eq!(path.get(&tree, i - len).unwrap(), walked[i as usize]);
        }
        assert!(matches!(
            path.get(&tree, len),
            Err(TreeError::OutOfRange(_))
        ));
    }

    #[test]
    fn off_path_node_is_reported() {
        let (tree, root, a, _) = forked();
        let mut path = Path::new(root);
        assert!(!path.contains(&tree, a[3]));
        assert_eq!(
            path.index_of(&tree, a[3]),
            Err(TreeError::NotOnPath { node: a[3] })
        );
    }

    #[test]
    fn clock_lookup_spans_blocks() {
        let (tree, root, a, b) = forked();
        let mut path = Path::new(root);
        assert_eq!(path.node_by_clock(&tree, 3.0, Rounding::Exact).unwrap(), Some(b[0]));
        assert_eq!(
            path.node_by_clock(&tree, 2.5, Rounding::Low).unwrap(),
            Some(a[1])
        );
        let both = path.nodes_by_clock(&tree, 9.0).unwrap();
        assert_eq!(both, Neighbors { low: Some(b[2]), high: None });
        assert!(path.node_by_clock(&tree, f64::NAN, Rounding::Low).is_err());
    }

    #[test]
    fn all_possible_paths_reach_every_leaf() {
        let (tree, _, a, b) = forked();
        let mut ends: Vec<NodeId> = tree
            .all_possible_paths()
            .into_iter()
            .map(|mut p| p.last_node(&tree).unwrap())
            .collect();
        ends.sort();
        assert_eq!(ends, vec![a[5], b[2]]);
    }

    proptest! {
        #[test]
        fn lineage_matches_node_walk(
            ops in proptest::collection::vec(any::<prop::sample::Index>(), 0..80),
        ) {
            let mut tree = Tree::new();
            let root = tree.add_state(Tick(None), None).unwrap();
            for pick in ops {
                let parent = NodeId(pick.index(tree.len()) as u32);
                tree.add_state(Tick(None), Some(parent)).unwrap();
            }
            let mut path = Path::new(root);
            let walked: Vec<NodeId> = path.iter(&tree).collect();
            prop_assert_eq!(path.nodes(&tree), walked.clone());
            for (i, &n) in walked.iter().enumerate() {
                prop_assert_eq!(path.get(&tree, i as isize).unwrap(), n);
                prop_assert!(path.contains(&tree, n));
            }
        }

        #[test]
        fn decided_forks_survive_growth(
            ops in proptest::collection::vec(any::<prop::sample::Index>(), 1..60),
            growth in proptest::collection::vec(any::<prop::sample::Index>(), 1..60),
        ) {
            let mut tree = Tree::new();
            let root = tree.add_state(Tick(None), None).unwrap();
            for pick in ops {
                let parent = NodeId(pick.index(tree.len()) as u32);
                tree.add_state(Tick(None), Some(parent)).unwrap();
            }
            let mut path = Path::new(root);
            path.nodes(&tree);
            let decided: Vec<(NodeId, NodeId)> = path.decisions().collect();

            for pick in growth {
                let parent = NodeId(pick.index(tree.len()) as u32);
                tree.add_state(Tick(None), Some(parent)).unwrap();
            }
            let walked = path.nodes(&tree);
            for (fork, child) in decided {
                prop_assert_eq!(path.next_node(&tree, fork), Some(child));
                if walked.contains(&fork) {
                    prop_assert!(walked.contains(&child));
                }
            }
            prop_assert!(tree.get(walked[walked.len() - 1]).unwrap().is_leaf());
        }
    }
}
