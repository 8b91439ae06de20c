//! Tree nodes and lineage end markers.

use std::sync::Arc;

use smallvec::SmallVec;

use braid_core::{clock_of, BlockId, NodeId, State};
use braid_step::StepProfile;

/// Marks that a lineage cannot advance past a node under one step profile.
///
/// Recorded when a step function signals the world has ended. Another
/// step profile may still continue from the same node.
pub struct End<S> {
    step_profile: StepProfile<S>,
}

impl<S> End<S> {
    pub(crate) fn new(step_profile: StepProfile<S>) -> Self {
        Self { step_profile }
    }

    /// The step profile under which the world ended.
    pub fn step_profile(&self) -> &StepProfile<S> {
        &self.step_profile
    }
}

impl<S> Clone for End<S> {
    fn clone(&self) -> Self {
        Self {
            step_profile: self.step_profile.clone(),
        }
    }
}

impl<S> std::fmt::Debug for End<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "End({})", self.step_profile)
    }
}

/// One state in the tree plus its links.
///
/// Nodes are owned by their [`crate::Tree`] and addressed by [`NodeId`];
/// parent, children, and block are indices into the same tree.
pub struct Node<S> {
    pub(crate) id: NodeId,
    pub(crate) state: Arc<S>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 2]>,
    pub(crate) block: Option<BlockId>,
    pub(crate) touched: bool,
    pub(crate) still_in_editing: bool,
    pub(crate) step_profile: Option<StepProfile<S>>,
    pub(crate) ends: Vec<End<S>>,
}

impl<S: State> Node<S> {
    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The wrapped state.
    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    /// Clock of the wrapped state.
    pub fn clock(&self) -> f64 {
        clock_of(&*self.state)
    }

    /// Parent node; `None` for a root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order; the newest is last.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The block this node belongs to, if any.
    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    /// Whether the state came from an edit rather than from stepping.
    pub fn touched(&self) -> bool {
        self.touched
    }

    /// Whether the node is an unfinished edit. Never crunched from.
    pub fn still_in_editing(&self) -> bool {
        self.still_in_editing
    }

    /// The step profile that produced this node; `None` for roots and
    /// touched nodes.
    pub fn step_profile(&self) -> Option<&StepProfile<S>> {
        self.step_profile.as_ref()
    }

    /// Lineage ends recorded at this node.
    pub fn ends(&self) -> &[End<S>] {
        &self.ends
    }

    /// Whether the world ended here under `step_profile`.
    pub fn has_end_for(&self, step_profile: &StepProfile<S>) -> bool {
        self.ends.iter().any(|e| e.step_profile() == step_profile)
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether this node has more than one child.
    pub fn is_fork(&self) -> bool {
        self.children.len() > 1
    }

    /// The child added most recently.
    pub fn newest_child(&self) -> Option<NodeId> {
        self.children.last().copied()
    }
}

impl<S: State> std::fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("clock", &self.clock())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("block", &self.block)
            .field("touched", &self.touched)
            .field("still_in_editing", &self.still_in_editing)
            .finish()
    }
}
