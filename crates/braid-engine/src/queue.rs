//! The channels between a cruncher and its manager.
//!
//! Output travels through a [`WorkQueue`]: the cruncher pushes, the
//! manager drains under the tree's write lock, and a history browser
//! reads it in place. Orders travel the other way over a crossbeam
//! channel that the cruncher polls without blocking.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use braid_core::NodeId;
use braid_step::CrunchingProfile;

/// One item of cruncher output.
pub enum WorkItem<S> {
    /// The next state in the lineage.
    State(Arc<S>),
    /// The world ended; nothing follows.
    End,
}

impl<S> WorkItem<S> {
    /// The state, unless this is the end marker.
    pub fn state(&self) -> Option<&Arc<S>> {
        match self {
            Self::State(s) => Some(s),
            Self::End => None,
        }
    }
}

/// A cruncher's outgoing queue of unmerged output.
///
/// Single producer (the cruncher), single consumer (the manager). The
/// end marker is kept as a flag beside the states, so it always drains
/// last and readers index the states directly.
pub struct WorkQueue<S> {
    pending: Mutex<Pending<S>>,
}

struct Pending<S> {
    states: VecDeque<Arc<S>>,
    ended: bool,
}

impl<S> Default for WorkQueue<S> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(Pending {
                states: VecDeque::new(),
                ended: false,
            }),
        }
    }
}

impl<S> WorkQueue<S> {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn push(&self, item: WorkItem<S>) {
        let mut pending = self.pending.lock();
        match item {
            WorkItem::State(state) => pending.states.push_back(state),
            WorkItem::End => pending.ended = true,
        }
    }

    /// Take every queued item, oldest first.
    pub fn drain(&self) -> Vec<WorkItem<S>> {
        let mut pending = self.pending.lock();
        let mut items: Vec<WorkItem<S>> = pending.states.drain(..).map(WorkItem::State).collect();
        if std::mem::take(&mut pending.ended) {
            items.push(WorkItem::End);
        }
        items
    }

    /// Number of queued items, end marker included.
    pub fn len(&self) -> usize {
        let pending = self.pending.lock();
        pending.states.len() + usize::from(pending.ended)
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the queued states in place while holding the lock.
    pub fn with_states<R>(&self, f: impl FnOnce(&VecDeque<Arc<S>>) -> R) -> R {
        f(&self.pending.lock().states)
    }
}

/// Orders a manager sends to its cruncher.
pub enum Order<S> {
    /// Stop after the current step, discarding its result.
    Retire,
    /// Switch to a new crunching profile. A different step profile
    /// cannot be applied in place and makes the cruncher retire.
    UpdateProfile(CrunchingProfile<S>),
}

/// The tree node a cruncher's output continues from.
///
/// Written only while holding the tree's write lock, so a reader holding
/// the read lock sees an anchor consistent with the queue contents.
#[derive(Debug)]
pub(crate) struct Anchor(AtomicU32);

impl Anchor {
    pub(crate) fn new(node: NodeId) -> Arc<Self> {
        Arc::new(Self(AtomicU32::new(node.0)))
    }

    pub(crate) fn get(&self) -> NodeId {
        NodeId(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, node: NodeId) {
        self.0.store(node.0, Ordering::Release);
    }
}
