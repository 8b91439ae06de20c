//! Branching history storage for braid simulations.
//!
//! A [`Tree`] owns every simulated state as a [`Node`]. Unbranched runs of
//! untouched nodes are compressed into [`Block`]s so that walking a long
//! history hops whole runs at a time. A [`Path`] picks one route through
//! the forks and supports positional and clock lookups along it; a
//! [`Lineage`] is the same view for the single route up from one node.
//!
//! The tree itself is single-threaded; the engine wraps it in a
//! reader/writer lock for concurrent access.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod error;
pub mod lineage;
pub mod node;
pub mod path;
pub mod tree;

pub use block::Block;
pub use error::TreeError;
pub use lineage::Lineage;
pub use node::{End, Node};
pub use path::{Path, PathIter};
pub use tree::Tree;
