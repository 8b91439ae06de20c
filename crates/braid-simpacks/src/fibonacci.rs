//! A history-dependent Fibonacci sequence.
//!
//! The next value is the sum of the last two states in the lineage's
//! history, so the step cannot be computed from a single state. Overflow
//! ends the world.

use braid_core::{Rounding, State, StepError};
use braid_step::{History, Simpack, SimpackError, StepArgs, StepFunction};

/// One term of the sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    /// Value of this term.
    pub value: u64,
    /// Simulation clock.
    pub clock: Option<f64>,
}

impl Term {
    /// A term without a clock.
    pub fn new(value: u64) -> Self {
        Self { value, clock: None }
    }
}

impl State for Term {
    fn clock(&self) -> Option<f64> {
        self.clock
    }

    fn set_clock(&mut self, clock: f64) {
        self.clock = Some(clock);
    }
}

fn unreadable(e: impl std::fmt::Display) -> StepError {
    StepError::failed(format!("history unreadable: {e}"))
}

/// `last + second-to-last`; a one-term history continues with 1.
fn next_term(history: &dyn History<Term>) -> Result<Term, StepError> {
    let last = history.get(-1).map_err(unreadable)?;
    if history.len() < 2 {
        return Ok(Term::new(1));
    }
    let before = history.get(-2).map_err(unreadable)?;
    last.value
        .checked_add(before.value)
        .map(Term::new)
        .ok_or(StepError::WorldEnded)
}

/// Last value plus the value `lag` clock units earlier, rounding back in
/// time. Before the first term counts as the first term.
fn lagged_term(history: &dyn History<Term>, args: &StepArgs) -> Result<Term, StepError> {
    let lag = match args.lookup("lag", 0) {
        None => 2.0,
        Some(v) => v
            .as_float()
            .filter(|l| *l >= 0.0)
            .ok_or_else(|| StepError::failed(format!("`lag` must be non-negative, got {v}")))?,
    };
    let last = history.get(-1).map_err(unreadable)?;
    let now = last.clock.unwrap_or(0.0);
    let earlier = history
        .state_by_clock(now - lag, Rounding::LowOtherwiseHigh)
        .map_err(unreadable)?;
    let add = earlier.map_or(0, |t| t.value);
    last.value
        .checked_add(add)
        .map(Term::new)
        .ok_or(StepError::WorldEnded)
}

/// The Fibonacci simpack.
#[derive(Clone, Copy, Debug, Default)]
pub struct FibonacciSimpack;

impl Simpack for FibonacciSimpack {
    type State = Term;

    fn name(&self) -> &str {
        "fibonacci"
    }

    fn step_functions(&self) -> Vec<StepFunction<Term>> {
        vec![
            StepFunction::<Term>::history("next", |h: &dyn History<Term>, _: &StepArgs| {
                next_term(h)
            }),
            StepFunction::<Term>::history("lagged", lagged_term),
        ]
    }

    fn make_plain_state(&self) -> Result<Term, SimpackError> {
        Ok(Term::new(0))
    }
}
