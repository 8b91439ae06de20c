//! The [`State`] trait: an opaque world snapshot that carries a clock.

use std::fmt;

/// An immutable snapshot of the simulated world at one moment.
///
/// The framework treats states as black boxes except for the clock, a
/// totally-ordered simulation time. A state may leave its clock unset;
/// it is then assigned `previous clock + 1` (or `0` for a root) before
/// it is stored. Clocks set by application code are kept verbatim, even
/// if they repeat or decrease.
///
/// # Examples
///
/// ```
/// use braid_core::State;
///
/// #[derive(Clone, Debug)]
/// struct Counter {
///     n: i64,
///     clock: Option<f64>,
/// }
///
/// impl State for Counter {
///     fn clock(&self) -> Option<f64> { self.clock }
///     fn set_clock(&mut self, clock: f64) { self.clock = Some(clock); }
/// }
///
/// let mut s = Counter { n: 0, clock: None };
/// braid_core::assign_clock(&mut s, Some(4.0));
/// assert_eq!(s.clock(), Some(5.0));
/// ```
pub trait State: Clone + fmt::Debug + Send + Sync + 'static {
    /// Simulation time of this state, if one has been assigned.
    fn clock(&self) -> Option<f64>;

    /// Overwrite the simulation time.
    fn set_clock(&mut self, clock: f64);
}

/// Give `state` a clock if it has none: `previous + 1`, or `0` without
/// a predecessor. Returns the state's clock afterwards.
pub fn assign_clock<S: State>(state: &mut S, previous: Option<f64>) -> f64 {
    match state.clock() {
        Some(clock) => clock,
        None => {
            let clock = previous.map_or(0.0, |c| c + 1.0);
            state.set_clock(clock);
            clock
        }
    }
}

/// Clock of a stored state, used as the default lookup measure.
///
/// Stored states always carry a clock; an unset clock sorts first.
pub fn clock_of<S: State>(state: &S) -> f64 {
    state.clock().unwrap_or(f64::NEG_INFINITY)
}
