//! Errors raised by tree and path operations.

use thiserror::Error;

use braid_core::{BlockId, LookupError, NodeId, PathOutOfRange};

/// Errors from [`crate::Tree`] and [`crate::Path`] operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TreeError {
    /// No node with this id exists in the tree.
    #[error("node {node} is not in the tree")]
    UnknownNode {
        /// The missing node.
        node: NodeId,
    },
    /// No live block occupies this slot.
    #[error("block {block} is not in the tree")]
    UnknownBlock {
        /// The missing block.
        block: BlockId,
    },
    /// The node's state may only change while it is still in editing.
    #[error("node {node} is not in editing")]
    NotEditable {
        /// The finalized node.
        node: NodeId,
    },
    /// The node exists but the path does not pass through it.
    #[error("node {node} is not on the path")]
    NotOnPath {
        /// The off-path node.
        node: NodeId,
    },
    /// The attached blocks differ from a from-scratch reconstruction.
    #[error("block invariant violated: {reason}")]
    BlockInvariant {
        /// What differed.
        reason: String,
    },
    /// A lookup was given an unusable target.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// A positional lookup ran past the end.
    #[error(transparent)]
    OutOfRange(#[from] PathOutOfRange),
}
