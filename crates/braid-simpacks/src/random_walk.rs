//! A seeded one-dimensional random walk.
//!
//! Each state carries its own seed and step index, and every step draws
//! from a ChaCha8 RNG seeded with `seed ^ step`. Stepping the same state
//! twice therefore yields the same successor, which keeps forks that
//! re-crunch the same node reproducible.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use braid_core::{State, StepError};
use braid_step::{Simpack, SimpackError, StepArgs, StepFunction};

/// Walker state.
#[derive(Clone, Debug, PartialEq)]
pub struct Walker {
    /// Current position.
    pub position: f64,
    /// Number of steps taken.
    pub step: u64,
    /// Seed all future steps derive from.
    pub seed: u64,
    /// Simulation clock.
    pub clock: Option<f64>,
}

impl State for Walker {
    fn clock(&self) -> Option<f64> {
        self.clock
    }

    fn set_clock(&mut self, clock: f64) {
        self.clock = Some(clock);
    }
}

/// The random walk simpack.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomWalkSimpack;

fn stride(args: &StepArgs) -> Result<f64, StepError> {
    match args.lookup("stride", 0) {
        None => Ok(1.0),
        Some(v) => match v.as_float() {
            Some(s) if s.is_finite() && s > 0.0 => Ok(s),
            _ => Err(StepError::failed(format!(
                "`stride` must be a positive number, got {v}"
            ))),
        },
    }
}

impl Simpack for RandomWalkSimpack {
    type State = Walker;

    fn name(&self) -> &str {
        "random-walk"
    }

    fn step_functions(&self) -> Vec<StepFunction<Walker>> {
        vec![StepFunction::simple("walk", |w: &Walker, args: &StepArgs| {
            let stride = stride(args)?;
            let mut rng = ChaCha8Rng::seed_from_u64(w.seed ^ w.step);
            let delta = if rng.gen_bool(0.5) { stride } else { -stride };
            Ok(Walker {
                position: w.position + delta,
                step: w.step + 1,
                seed: w.seed,
                clock: None,
            })
        })]
    }

    fn make_plain_state(&self) -> Result<Walker, SimpackError> {
        self.make_random_state(0)
    }

    fn make_random_state(&self, seed: u64) -> Result<Walker, SimpackError> {
        Ok(Walker {
            position: 0.0,
            step: 0,
            seed,
            clock: None,
        })
    }
}
