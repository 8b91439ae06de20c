//! Braid: branching simulation history with background crunching.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! braid sub-crates. For most users, adding `braid` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use braid::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! struct Ticks {
//!     n: u32,
//!     clock: Option<f64>,
//! }
//!
//! impl State for Ticks {
//!     fn clock(&self) -> Option<f64> { self.clock }
//!     fn set_clock(&mut self, clock: f64) { self.clock = Some(clock); }
//! }
//!
//! struct TickPack;
//!
//! impl Simpack for TickPack {
//!     type State = Ticks;
//!     fn name(&self) -> &str { "ticks" }
//!     fn step_functions(&self) -> Vec<StepFunction<Ticks>> {
//!         vec![StepFunction::simple("tick", |s: &Ticks, _: &StepArgs| {
//!             Ok(Ticks { n: s.n + 1, clock: None })
//!         })]
//!     }
//! }
//!
//! let project = Project::new(TickPack).unwrap();
//! let root = project.root_this_state(Ticks { n: 0, clock: None }).unwrap();
//! let leaf = project.simulate(root, 3).unwrap();
//!
//! let tree = project.tree().read();
//! assert_eq!(tree.state(leaf).unwrap().n, 3);
//! assert_eq!(tree.node(leaf).unwrap().clock(), 3.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `braid-core` | `State`, ids, errors, rounding search |
//! | [`step`] | `braid-step` | Step functions, profiles, `History`, `Simpack` |
//! | [`tree`] | `braid-tree` | `Tree`, `Node`, `Block`, `Path` |
//! | [`engine`] | `braid-engine` | Crunchers, `HistoryBrowser`, `CrunchingManager`, `Project` |
//! | [`simpacks`] | `braid-simpacks` | Reference simpacks (counter, random walk, Fibonacci) |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`braid-core`).
///
/// Contains the [`types::State`] trait, node and job identifiers, the
/// error taxonomy, and the rounding binary search.
pub use braid_core as types;

/// Step functions and profiles (`braid-step`).
///
/// The [`step::Simpack`] trait is the main extension point for
/// user-defined simulations.
pub use braid_step as step;

/// Branching history storage (`braid-tree`).
pub use braid_tree as tree;

/// Background crunching and the project facade (`braid-engine`).
///
/// [`engine::Project`] is where most applications start.
pub use braid_engine as engine;

/// Reference simpacks (`braid-simpacks`).
pub use braid_simpacks as simpacks;

/// Common imports for typical braid usage.
///
/// ```rust
/// use braid::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use braid_core::{JobId, NodeId, Rounding, State};

    // Errors
    pub use braid_core::{LookupError, PathOutOfRange, StepError};
    pub use braid_engine::{ConfigError, ProjectError};
    pub use braid_step::SimpackError;
    pub use braid_tree::TreeError;

    // Step functions
    pub use braid_step::{
        ArgValue, CrunchingProfile, History, Simpack, StepArgs, StepFunction, StepProfile,
    };

    // Tree
    pub use braid_tree::{Node, Path, Tree};

    // Engine
    pub use braid_engine::{
        CruncherStatus, CrunchingConfig, CrunchingManager, HistoryBrowser, Job, Project,
        ProjectConfig,
    };
}
