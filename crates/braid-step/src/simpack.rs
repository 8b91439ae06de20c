//! The [`Simpack`] trait: a pluggable simulation package.

use indexmap::IndexMap;
use thiserror::Error;

use braid_core::State;

use crate::function::StepFunction;

/// Errors raised by simpack factories or simpack inspection.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimpackError {
    /// The simpack does not provide the requested factory.
    #[error("simpack does not support {operation}")]
    Unsupported {
        /// The factory that was asked for.
        operation: &'static str,
    },
    /// A factory ran but failed.
    #[error("simpack factory failed: {reason}")]
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The simpack declares no step function.
    #[error("simpack '{simpack}' declares no step function")]
    NoStepFunctions {
        /// Simpack name.
        simpack: String,
    },
    /// Some step functions read a history and some do not.
    #[error("simpack '{simpack}' mixes history-dependent and plain step functions")]
    MixedHistoryDependence {
        /// Simpack name.
        simpack: String,
    },
    /// Two step functions share a name.
    #[error("simpack declares step function '{name}' more than once")]
    DuplicateStepFunction {
        /// The repeated name.
        name: String,
    },
}

/// A simulation package: a state type, its step functions, and factories
/// for initial states.
///
/// History dependence is a property of the whole simpack: either every
/// step function reads a history, or none does. [`SimpackMeta::inspect`]
/// checks this once, and the result is fixed for a project's lifetime.
pub trait Simpack: Send + Sync + 'static {
    /// The world state this simpack simulates.
    type State: State;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// All step functions; the first one is the default.
    fn step_functions(&self) -> Vec<StepFunction<Self::State>>;

    /// A canonical starting state.
    fn make_plain_state(&self) -> Result<Self::State, SimpackError> {
        Err(SimpackError::Unsupported {
            operation: "make_plain_state",
        })
    }

    /// A randomized starting state, reproducible from `seed`.
    fn make_random_state(&self, seed: u64) -> Result<Self::State, SimpackError> {
        let _ = seed;
        Err(SimpackError::Unsupported {
            operation: "make_random_state",
        })
    }
}

/// Facts about a simpack, gathered once when a project is created.
pub struct SimpackMeta<S> {
    name: String,
    step_functions: IndexMap<String, StepFunction<S>>,
    history_dependent: bool,
}

impl<S: State> SimpackMeta<S> {
    /// Inspect `simpack` and validate its step functions.
    pub fn inspect<P: Simpack<State = S>>(simpack: &P) -> Result<Self, SimpackError> {
        let name = simpack.name().to_owned();
        let mut step_functions = IndexMap::new();
        for function in simpack.step_functions() {
            let key = function.name().to_owned();
            if step_functions.contains_key(&key) {
                return Err(SimpackError::DuplicateStepFunction { name: key });
            }
            step_functions.insert(key, function);
        }
        let mut dependence = step_functions.values().map(StepFunction::is_history_dependent);
        let history_dependent = match dependence.next() {
            None => return Err(SimpackError::NoStepFunctions { simpack: name }),
            Some(first) => {
                if dependence.any(|d| d != first) {
                    return Err(SimpackError::MixedHistoryDependence { simpack: name });
                }
                first
            }
        };
        Ok(Self {
            name,
            step_functions,
            history_dependent,
        })
    }
}

impl<S> SimpackMeta<S> {
    /// Simpack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether stepping reads a history rather than a single state.
    pub fn is_history_dependent(&self) -> bool {
        self.history_dependent
    }

    /// The first declared step function.
    pub fn default_step_function(&self) -> &StepFunction<S> {
        // `inspect` rejects simpacks without step functions.
        &self.step_functions[0]
    }

    /// Step function by name.
    pub fn step_function(&self, name: &str) -> Option<&StepFunction<S>> {
        self.step_functions.get(name)
    }

    /// Names of all step functions, default first.
    pub fn step_function_names(&self) -> impl Iterator<Item = &str> {
        self.step_functions.keys().map(String::as_str)
    }
}
