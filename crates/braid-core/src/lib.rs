//! Core types and traits for the braid simulation framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the braid workspace:
//! the [`State`] trait and its clock, typed identifiers, the error
//! taxonomy shared by every layer, and the rounding binary search used
//! for clock lookups on trees, paths, blocks, and history browsers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod search;
pub mod state;

pub use error::{LookupError, PathOutOfRange, StepError};
pub use id::{BlockId, JobId, NodeId};
pub use search::{resolve_index, search, search_both, Bracket, Neighbors, Rounding};
pub use state::{assign_clock, clock_of, State};
