//! Step functions, profiles, and the simpack trait for braid simulations.
//!
//! A [`Simpack`] supplies named [`StepFunction`]s written in one of six
//! styles. Binding arguments gives a [`StepProfile`]; adding a clock
//! target gives a [`CrunchingProfile`]. [`StepIter`] turns any profile
//! into a lazy sequence of states, which is all a cruncher consumes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod args;
pub mod function;
pub mod history;
pub mod iter;
pub mod profile;
pub mod simpack;

pub use args::{ArgValue, StepArgs};
pub use function::{
    HistoryStepper, Mutator, StateStream, StepFunction, StepKind, StepStyle,
};
pub use history::{History, VecHistory};
pub use iter::{StepInput, StepIter};
pub use profile::{CrunchingProfile, StepProfile};
pub use simpack::{Simpack, SimpackError, SimpackMeta};
