//! Step profiles and crunching profiles.

use std::fmt;

use braid_core::State;

use crate::args::StepArgs;
use crate::function::StepFunction;
use crate::iter::{StepInput, StepIter};

/// A step function together with the arguments to call it with.
///
/// Equality compares content: the function's name and style plus the
/// arguments. Two independently built profiles with the same content are
/// interchangeable, so a cruncher can keep running across an update that
/// only rebuilds the profile.
pub struct StepProfile<S> {
    function: StepFunction<S>,
    args: StepArgs,
}

impl<S> Clone for StepProfile<S> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            args: self.args.clone(),
        }
    }
}

impl<S: State> StepProfile<S> {
    /// Bind `args` to `function`.
    pub fn new(function: StepFunction<S>, args: StepArgs) -> Self {
        Self { function, args }
    }

    /// Bind no arguments to `function`.
    pub fn bare(function: StepFunction<S>) -> Self {
        Self::new(function, StepArgs::new())
    }

    /// Start stepping from `input`.
    pub fn iter_from(&self, input: StepInput<S>) -> StepIter<S> {
        StepIter::new(self.clone(), input)
    }
}

impl<S> StepProfile<S> {
    /// The step function.
    pub fn function(&self) -> &StepFunction<S> {
        &self.function
    }

    /// The bound arguments.
    pub fn args(&self) -> &StepArgs {
        &self.args
    }

    /// Whether the step reads a history rather than a single state.
    pub fn is_history_dependent(&self) -> bool {
        self.function.is_history_dependent()
    }
}

impl<S> PartialEq for StepProfile<S> {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function && self.args == other.args
    }
}

impl<S> fmt::Debug for StepProfile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepProfile")
            .field("function", &self.function)
            .field("args", &self.args)
            .finish()
    }
}

impl<S> fmt::Display for StepProfile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function.name(), self.args)
    }
}

/// What a cruncher should produce: a step profile and how far to run it.
///
/// A clock target of [`f64::INFINITY`] means "run forever" (until retired
/// or the world ends).
pub struct CrunchingProfile<S> {
    clock_target: f64,
    step_profile: StepProfile<S>,
}

impl<S> Clone for CrunchingProfile<S> {
    fn clone(&self) -> Self {
        Self {
            clock_target: self.clock_target,
            step_profile: self.step_profile.clone(),
        }
    }
}

impl<S> CrunchingProfile<S> {
    /// Crunch with `step_profile` until a state's clock reaches `clock_target`.
    pub fn new(step_profile: StepProfile<S>, clock_target: f64) -> Self {
        Self {
            clock_target,
            step_profile,
        }
    }

    /// Crunch with `step_profile` with no clock target.
    pub fn forever(step_profile: StepProfile<S>) -> Self {
        Self::new(step_profile, f64::INFINITY)
    }

    /// Target clock; infinite for "forever".
    pub fn clock_target(&self) -> f64 {
        self.clock_target
    }

    /// The step profile to crunch with.
    pub fn step_profile(&self) -> &StepProfile<S> {
        &self.step_profile
    }

    /// Whether the target is unbounded.
    pub fn is_forever(&self) -> bool {
        self.clock_target == f64::INFINITY
    }

    /// Whether a state at `clock` satisfies this profile.
    pub fn is_satisfied_by(&self, clock: f64) -> bool {
        clock >= self.clock_target
    }

    /// Raise the target to `clock_target` if that is further out.
    ///
    /// Returns whether the profile changed. Never lowers the target.
    pub fn raise_clock_target(&mut self, clock_target: f64) -> bool {
        if clock_target > self.clock_target {
            self.clock_target = clock_target;
            true
        } else {
            false
        }
    }

    /// Replace the target outright, up or down.
    pub fn set_clock_target(&mut self, clock_target: f64) {
        self.clock_target = clock_target;
    }
}

impl<S> PartialEq for CrunchingProfile<S> {
    fn eq(&self, other: &Self) -> bool {
        self.clock_target == other.clock_target && self.step_profile == other.step_profile
    }
}

impl<S> fmt::Debug for CrunchingProfile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrunchingProfile")
            .field("clock_target", &self.clock_target)
            .field("step_profile", &self.step_profile)
            .finish()
    }
}
