//! Reference simulation packages for the braid simulation framework.
//!
//! - [`CounterSimpack`]: an integer counter written in all four
//!   single-state step styles.
//! - [`RandomWalkSimpack`]: a reproducible seeded random walk.
//! - [`FibonacciSimpack`]: a history-dependent sequence; its steps read
//!   the lineage's history instead of a single state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod counter;
pub mod fibonacci;
pub mod random_walk;

pub use counter::{Counter, CounterSimpack};
pub use fibonacci::{FibonacciSimpack, Term};
pub use random_walk::{RandomWalkSimpack, Walker};
