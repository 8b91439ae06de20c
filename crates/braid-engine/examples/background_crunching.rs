//! Braid background crunching: a branching history grown off-thread.
//!
//! Demonstrates:
//!   1. Creating a project from a simpack and adding a root
//!   2. Advancing synchronously with `simulate`
//!   3. Forking an edited state and finalizing it
//!   4. Crunching every leaf in the background and syncing the output
//!   5. Reading a path by clock
//!
//! Run with:
//!   cargo run -p braid-engine --example background_crunching
//!
//! Set `RUST_LOG=braid_engine=debug` to watch crunchers spawn and retire.

use std::thread;
use std::time::Duration;

use braid_core::Rounding;
use braid_engine::{Project, ProjectConfig};
use braid_simpacks::CounterSimpack;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // ─── Project and root ───────────────────────────────────────

    let config = ProjectConfig {
        default_clock_buffer: 50.0,
        ..ProjectConfig::default()
    };
    let mut project = Project::with_config(CounterSimpack, config)?;
    let root = project.make_plain_root()?;
    let trunk = project.simulate(root, 10)?;
    println!("simulated to {trunk} synchronously");

    // ─── An edited fork ─────────────────────────────────────────

    let fork = project.fork_to_edit(trunk)?;
    project.edit_state(fork, |s| s.value = 1_000)?;
    project.finalize(fork)?;

    // ─── Background crunching ───────────────────────────────────

    let jobs = project.crunch_from(root)?;
    println!("started {jobs} jobs");
    let mut total = 0;
    while !project.crunching_manager().jobs().is_empty() {
        total += project.sync_crunchers()?;
        thread::sleep(Duration::from_millis(5));
    }
    println!("merged {total} states");

    // ─── Reading the result ─────────────────────────────────────

    let tree = project.tree().read();
    for mut path in tree.all_possible_paths() {
        let len = path.len(&tree);
        let halfway = path.node_by_clock(&tree, 25.0, Rounding::Closest)?;
        let last = path.last_node(&tree)?;
        println!(
            "path of {len} nodes: value {} at clock 25, value {} at clock {}",
            halfway.map_or(0, |n| tree.state(n).map_or(0, |s| s.value)),
            tree.state(last)?.value,
            tree.node(last)?.clock(),
        );
    }
    Ok(())
}
