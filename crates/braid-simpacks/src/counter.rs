//! An integer counter, written once in each single-state step style.
//!
//! All four step functions advance the counter by the `by` argument
//! (keyword `by` or first positional, default 1), so any of them can
//! replace another without changing the simulated lineage.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use braid_core::{State, StepError};
use braid_step::{Simpack, SimpackError, StepArgs, StepFunction};

/// Counter state.
#[derive(Clone, Debug, PartialEq)]
pub struct Counter {
    /// Current count.
    pub value: i64,
    /// Simulation clock; `None` until the tree assigns one.
    pub clock: Option<f64>,
}

impl Counter {
    /// A counter at `value` without a clock.
    pub fn new(value: i64) -> Self {
        Self { value, clock: None }
    }
}

impl State for Counter {
    fn clock(&self) -> Option<f64> {
        self.clock
    }

    fn set_clock(&mut self, clock: f64) {
        self.clock = Some(clock);
    }
}

/// Step width from the `by` argument.
fn step_by(args: &StepArgs) -> Result<i64, StepError> {
    match args.lookup("by", 0) {
        None => Ok(1),
        Some(v) => v
            .as_int()
            .ok_or_else(|| StepError::failed(format!("`by` must be an integer, got {v}"))),
    }
}

fn advance(value: i64, by: i64) -> Result<i64, StepError> {
    value.checked_add(by).ok_or(StepError::WorldEnded)
}

/// The counter simpack.
#[derive(Clone, Copy, Debug, Default)]
pub struct CounterSimpack;

impl Simpack for CounterSimpack {
    type State = Counter;

    fn name(&self) -> &str {
        "counter"
    }

    fn step_functions(&self) -> Vec<StepFunction<Counter>> {
        vec![
            StepFunction::simple("step", |s: &Counter, args: &StepArgs| {
                Ok(Counter::new(advance(s.value, step_by(args)?)?))
            }),
            StepFunction::<Counter>::generator("step_generator", |s: Counter, args: &StepArgs| {
                let by = step_by(args);
                let mut value = s.value;
                Box::new(std::iter::from_fn(move || {
                    let next = by.clone().and_then(|by| advance(value, by));
                    if let Ok(v) = next {
                        value = v;
                    }
                    Some(next.map(Counter::new))
                }))
            }),
            StepFunction::in_place("step_in_place", |s: &mut Counter, args: &StepArgs| {
                s.value = advance(s.value, step_by(args)?)?;
                Ok(())
            }),
            StepFunction::<Counter>::in_place_generator(
                "step_in_place_generator",
                |_: &Counter, args: &StepArgs| {
                    let by = step_by(args);
                    Box::new(move |s: &mut Counter| {
                        s.value = advance(s.value, by.clone()?)?;
                        Ok(())
                    })
                },
            ),
        ]
    }

    fn make_plain_state(&self) -> Result<Counter, SimpackError> {
        Ok(Counter::new(0))
    }

    fn make_random_state(&self, seed: u64) -> Result<Counter, SimpackError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Ok(Counter::new(rng.gen_range(0..1000)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_step::{SimpackMeta, StepInput, StepProfile};

    fn run(name: &str, args: StepArgs, steps: usize) -> Vec<(i64, f64)> {
        let meta = SimpackMeta::inspect(&CounterSimpack).unwrap();
        let profile = StepProfile::new(meta.step_function(name).unwrap().clone(), args);
        profile
            .iter_from(StepInput::Direct(Counter {
                value: 10,
                clock: Some(0.0),
            }))
            .take(steps)
            .map(|r| {
                let s = r.unwrap();
                (s.value, s.clock.unwrap())
            })
            .collect()
    }

    #[test]
    fn every_style_counts_the_same() {
        let expected = vec![(13, 1.0), (16, 2.0), (19, 3.0)];
        for name in [
            "step",
            "step_generator",
            "step_in_place",
            "step_in_place_generator",
        ] {
            assert_eq!(run(name, StepArgs::new().kwarg("by", 3), 3), expected, "{name}");
            assert_eq!(run(name, StepArgs::new().arg(3), 3), expected, "{name}");
        }
    }

    #[test]
    fn default_step_is_one() {
        assert_eq!(run("step", StepArgs::new(), 2), vec![(11, 1.0), (12, 2.0)]);
    }

    #[test]
    fn bad_argument_fails() {
        let meta = SimpackMeta::inspect(&CounterSimpack).unwrap();
        let profile = StepProfile::new(
            meta.default_step_function().clone(),
            StepArgs::new().kwarg("by", "two"),
        );
        let first = profile
            .iter_from(StepInput::Direct(Counter::new(0)))
            .next()
            .unwrap();
        assert!(matches!(first, Err(StepError::Failed { .. })));
    }

    #[test]
    fn overflow_ends_the_world() {
        let meta = SimpackMeta::inspect(&CounterSimpack).unwrap();
        let profile = StepProfile::bare(meta.default_step_function().clone());
        let mut steps = profile.iter_from(StepInput::Direct(Counter::new(i64::MAX)));
        assert_eq!(steps.next(), Some(Err(StepError::WorldEnded)));
        assert_eq!(steps.next(), None);
    }

    #[test]
    fn random_state_is_reproducible() {
        let a = CounterSimpack.make_random_state(7).unwrap();
        let b = CounterSimpack.make_random_state(7).unwrap();
        assert_eq!(a, b);
        assert!((0..1000).contains(&a.value));
    }
}
