//! The [`History`] read interface handed to history-dependent steps.

use std::sync::Arc;

use braid_core::{clock_of, LookupError, Neighbors, PathOutOfRange, Rounding, State};

/// Read-only view of every state simulated so far for one lineage.
///
/// The sequence runs from the lineage's root to its most recent state.
/// Implementations may grow between calls (a history browser sees its
/// cruncher's unmerged output), but a single call always observes a
/// consistent snapshot.
///
/// # Object safety
///
/// This trait is object-safe; step functions receive `&dyn History<S>`.
pub trait History<S: State>: Send {
    /// Number of states currently visible.
    fn len(&self) -> usize;

    /// Whether no state is visible.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent state.
    ///
    /// # Errors
    ///
    /// [`PathOutOfRange`] if the history is empty.
    fn last_state(&self) -> Result<Arc<S>, PathOutOfRange> {
        self.get(-1)
    }

    /// State at `index`; negative indices count from the end.
    fn get(&self, index: isize) -> Result<Arc<S>, PathOutOfRange>;

    /// One state by a non-decreasing measure, with rounding.
    fn state_by_measure(
        &self,
        measure: &dyn Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<Arc<S>>, LookupError>;

    /// Both neighbours of `target` by a non-decreasing measure.
    fn states_by_measure_both(
        &self,
        measure: &dyn Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<Arc<S>>, LookupError>;

    /// One state by clock, with rounding.
    fn state_by_clock(
        &self,
        clock: f64,
        rounding: Rounding,
    ) -> Result<Option<Arc<S>>, LookupError> {
        self.state_by_measure(&clock_of::<S>, clock, rounding)
    }

    /// Both neighbours of `clock`.
    fn states_by_clock_both(&self, clock: f64) -> Result<Neighbors<Arc<S>>, LookupError> {
        self.states_by_measure_both(&clock_of::<S>, clock)
    }
}

/// A fixed, in-memory history. Used for testing history-dependent steps.
#[derive(Clone, Debug)]
pub struct VecHistory<S> {
    states: Vec<Arc<S>>,
}

impl<S: State> VecHistory<S> {
    /// Wrap a sequence of states, oldest first.
    pub fn new(states: impl IntoIterator<Item = S>) -> Self {
        Self {
            states: states.into_iter().map(Arc::new).collect(),
        }
    }

    /// Append a state.
    pub fn push(&mut self, state: S) {
        self.states.push(Arc::new(state));
    }
}

impl<S: State> History<S> for VecHistory<S> {
    fn len(&self) -> usize {
        self.states.len()
    }

    fn get(&self, index: isize) -> Result<Arc<S>, PathOutOfRange> {
        let i = braid_core::resolve_index(index, self.states.len())?;
        Ok(Arc::clone(&self.states[i]))
    }

    fn state_by_measure(
        &self,
        measure: &dyn Fn(&S) -> f64,
        target: f64,
        rounding: Rounding,
    ) -> Result<Option<Arc<S>>, LookupError> {
        let found = braid_core::search(
            self.states.len(),
            |i| measure(&self.states[i]),
            target,
            rounding,
        )?;
        Ok(found.map(|i| Arc::clone(&self.states[i])))
    }

    fn states_by_measure_both(
        &self,
        measure: &dyn Fn(&S) -> f64,
        target: f64,
    ) -> Result<Neighbors<Arc<S>>, LookupError> {
        let both =
            braid_core::search_both(self.states.len(), |i| measure(&self.states[i]), target)?;
        Ok(both.map(|i| Arc::clone(&self.states[i])))
    }
}
