//! [`HistoryBrowser`]: the history a history-dependent step reads.
//!
//! The visible sequence is the tree path from the root down to the
//! browser's anchor node, followed by the states still waiting in its
//! cruncher's work queue. Every read takes the tree's read lock for the
//! whole call and, inside it, the queue's lock. Merges take the same
//! locks in the same order, so a read never sees a state both in the
//! tree and in the queue, or in neither.

use std::collections::VecDeque;
use std::sync::Arc;

use braid_core::{resolve_index, LookupError, Neighbors, NodeId, PathOutOfRange, Rounding, State};
use braid_step::History;
use braid_tree::Lineage;

use crate::queue::{Anchor, WorkQueue};
use crate::SharedTree;

/// A read-only view over committed and unmerged history of one lineage.
pub struct HistoryBrowser<S: State> {
    tree: SharedTree<S>,
    anchor: Arc<Anchor>,
    work: Option<Arc<WorkQueue<S>>>,
}

impl<S: State> HistoryBrowser<S> {
    /// Browse the committed history ending at `node`.
    pub fn new(tree: SharedTree<S>, node: NodeId) -> Self {
        Self {
            tree,
            anchor: Anchor::new(node),
            work: None,
        }
    }

    pub(crate) fn with_anchor(
        tree: SharedTree<S>,
        anchor: Arc<Anchor>,
        work: Option<Arc<WorkQueue<S>>>,
    ) -> Self {
        Self { tree, anchor, work }
    }

    /// The tree node the committed part ends at.
    pub fn anchor(&self) -> NodeId {
        self.anchor.get()
    }

    /// Run `f` over the committed lineage and the queued states while
    /// holding both locks.
    fn read<R>(&self, f: impl FnOnce(Combined<'_, S>) -> R) -> R {
        let tree = self.tree.read();
        let committed = tree.lineage(self.anchor.get()).ok();
        match &self.work {
            Some(work) => work.with_states(|queued| f(Combined { committed, queued })),
            None => f(Combined {
                committed,
                queued: &VecDeque::new(),
            }),
        }
    }
}

/// Committed lineage plus queued states as one indexable sequence.
///
/// Neither part is copied: the lineage is a handful of borrowed runs and
/// the queue is indexed in place.
struct Combined<'a, S> {
    committed: Option<Lineage<'a, S>>,
    queued: &'a VecDeque<Arc<S>>,
}

impl<'a, S: State> Combined<'a, S> {
    fn committed_len(&self) -> usize {
        self.committed.as_ref().map_or(0, Lineage::len)
    }

    fn len(&self) -> usize {
        self.committed_len() + self.queued.len()
    }

    fn at(&self, i: usize) -> &'a Arc<S> {
        match &self.committed {
            Some(lineage) if i < lineage.len() => lineage.state_at(i),
            _ => &self.queued[i - self.committed_len()],
        }
    }
}

impl<S: State> History<S> for HistoryBrowser<S> {
    fn len(&self) -> usize {
        self.read(|seq| seq.len())
    }

    fn last_state(&self) -> Result<Arc<S>, PathOutOfRange> {
        self.read(|seq| match seq.len() {
            0 => Err(PathOutOfRange { index: -1, len: 0 }),
            len => Ok(Arc::clone(seq.at(len - 1))),
        })
    }

    fn get(&self, index: isize) -> Result<Arc<S>, PathOutOfRange> {
        self.read(|seq| {
            let i = resolve_index(index, seq.len())?;
            Ok(Arc::clone(seq.at(i)))
        })
    }

    fn state_by_measure(
        &self,
        measure: &dyn Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<Arc<S>>, LookupError> {
        self.read(|seq| {
            let found = braid_core::search(seq.len(), |i| measure(seq.at(i)), target, rounding)?;
            Ok(found.map(|i| Arc::clone(seq.at(i))))
        })
    }

    fn states_by_measure_both(
        &self,
        measure: &dyn Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<Arc<S>>, LookupError> {
        self.read(|seq| {
            let both = braid_core::search_both(seq.len(), |i| measure(seq.at(i)), target)?;
            Ok(both.map(|i| Arc::clone(seq.at(i))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use braid_tree::Tree;
    use parking_lot::RwLock;

    use crate::queue::WorkItem;

    #[derive(Clone, Debug, PartialEq)]
    struct Tick {
        n: i64,
        clock: Option<f64>,
    }

    impl State for Tick {
        fn clock(&self) -> Option<f64> {
            self.clock
        }
        fn set_clock(&mut self, clock: f64) {
            self.clock = Some(clock);
        }
    }

    fn tick(n: i64, clock: f64) -> Tick {
        Tick {
            n,
            clock: Some(clock),
        }
    }

    /// Tree holds clocks 0..=3; the queue holds 4 and 5.
    fn fixture() -> (HistoryBrowser<Tick>, NodeId) {
        let mut tree = Tree::new();
        let mut node = tree.add_state(tick(0, 0.0), None).unwrap();
        for i in 1..=3 {
            node = tree.add_state(tick(i, i as f64), Some(node)).unwrap();
        }
        let work = Arc::new(WorkQueue::new());
        work.push(WorkItem::State(Arc::new(tick(4, 4.0))));
        work.push(WorkItem::State(Arc::new(tick(5, 5.0))));
        let browser = HistoryBrowser::with_anchor(
            Arc::new(RwLock::new(tree)),
            Anchor::new(node),
            Some(work),
        );
        (browser, node)
    }

    #[test]
    fn spans_tree_and_queue() {
        let (browser, _) = fixture();
        assert_eq!(browser.len(), 6);
        assert_eq!(browser.last_state().unwrap().n, 5);
        assert_eq!(browser.get(0).unwrap().n, 0);
        assert_eq!(browser.get(3).unwrap().n, 3);
        assert_eq!(browser.get(4).unwrap().n, 4);
        assert_eq!(browser.get(-1).unwrap().n, 5);
        assert_eq!(browser.get(-6).unwrap().n, 0);
        assert_eq!(
            browser.get(6).unwrap_err(),
            PathOutOfRange { index: 6, len: 6 }
        );
    }

    #[test]
    fn neighbours_straddle_the_boundary() {
        let (browser, _) = fixture();
        let both = browser.states_by_clock_both(3.5).unwrap();
        assert_eq!(both.low.unwrap().n, 3);
        assert_eq!(both.high.unwrap().n, 4);
        let closest = browser.state_by_clock(3.6, Rounding::Closest).unwrap();
        assert_eq!(closest.unwrap().n, 4);
        assert!(browser.state_by_clock(9.0, Rounding::High).unwrap().is_none());
    }

    #[test]
    fn without_queue_reads_committed_history_only() {
        let (browser, node) = fixture();
        let plain = HistoryBrowser::new(Arc::clone(&browser.tree), node);
        assert_eq!(plain.len(), 4);
        assert_eq!(plain.last_state().unwrap().n, 3);
        let measured = plain
            .state_by_measure(&|s: &Tick| s.n as f64 * 10.0, 20.0, Rounding::Exact)
            .unwrap();
        assert_eq!(measured.unwrap().n, 2);
    }

    #[test]
    fn lookups_over_long_history_stay_logarithmic() {
        let mut tree = Tree::new();
        let mut node = tree.add_state(tick(0, 0.0), None).unwrap();
        for i in 1..(1 << 16) {
            node = tree.add_state(tick(i, i as f64), Some(node)).unwrap();
        }
        assert_eq!(tree.lineage(node).unwrap().runs().len(), 1);
        let work = Arc::new(WorkQueue::new());
        work.push(WorkItem::State(Arc::new(tick(1 << 16, 65_536.0))));
        work.push(WorkItem::State(Arc::new(tick((1 << 16) + 1, 65_537.0))));
        let browser = HistoryBrowser::with_anchor(
            Arc::new(RwLock::new(tree)),
            Anchor::new(node),
            Some(work),
        );

        let calls = Cell::new(0);
        let counted = |s: &Tick| {
            calls.set(calls.get() + 1);
            s.clock.unwrap_or(f64::NAN)
        };
        let found = browser
            .state_by_measure(&counted, 40_000.5, Rounding::Low)
            .unwrap();
        assert_eq!(found.unwrap().n, 40_000);
        assert!(calls.get() <= 2 + 17, "measured {} states", calls.get());

        calls.set(0);
        let both = browser.states_by_measure_both(&counted, 65_536.5).unwrap();
        assert_eq!(both.low.unwrap().n, 1 << 16);
        assert_eq!(both.high.unwrap().n, (1 << 16) + 1);
        assert!(calls.get() <= 2 + 17, "measured {} states", calls.get());
        assert_eq!(browser.get(-3).unwrap().n, (1 << 16) - 1);
    }
}
