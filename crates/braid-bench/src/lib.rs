//! Benchmark fixtures for the braid simulation framework.
//!
//! Provides pre-built trees for benchmarking tree, path, and search
//! operations:
//!
//! - [`linear_tree`]: one unbranched lineage, a single block
//! - [`bushy_tree`]: a trunk that forks at a fixed interval
//! - [`counter_profile`]: the counter simpack's default step profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use braid_core::NodeId;
use braid_simpacks::{Counter, CounterSimpack};
use braid_step::{SimpackMeta, StepProfile};
use braid_tree::{Tree, TreeError};

/// The counter simpack's default step profile.
pub fn counter_profile() -> StepProfile<Counter> {
    match SimpackMeta::inspect(&CounterSimpack) {
        Ok(meta) => StepProfile::bare(meta.default_step_function().clone()),
        Err(e) => panic!("counter simpack is valid: {e}"),
    }
}

/// One lineage of `len` stepped nodes under a root. Returns the tree and
/// its leaf.
pub fn linear_tree(len: usize) -> Result<(Tree<Counter>, NodeId), TreeError> {
    let profile = counter_profile();
    let mut tree = Tree::new();
    let mut leaf = tree.add_state(Counter::new(0), None)?;
    for i in 1..len as i64 {
        leaf = tree.add_stepped_state(Counter::new(i), leaf, profile.clone())?;
    }
    Ok((tree, leaf))
}

/// A trunk of `len` nodes where every `fork_every`-th node also gets a
/// short side branch of `branch_len` nodes. Returns the tree and the
/// trunk's leaf.
pub fn bushy_tree(
    len: usize,
    fork_every: usize,
    branch_len: usize,
) -> Result<(Tree<Counter>, NodeId), TreeError> {
    let profile = counter_profile();
    let mut tree = Tree::new();
    let mut leaf = tree.add_state(Counter::new(0), None)?;
    for i in 1..len as i64 {
        let next = tree.add_stepped_state(Counter::new(i), leaf, profile.clone())?;
        if fork_every > 0 && i as usize % fork_every == 0 {
            let mut side = leaf;
            for j in 0..branch_len as i64 {
                side = tree.add_stepped_state(Counter::new(-j), side, profile.clone())?;
            }
        }
        leaf = next;
    }
    Ok((tree, leaf))
}
