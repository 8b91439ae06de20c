//! Reusable simpack fixtures.
//!
//! - [`CountingSimpack`]: adds one per step, forever.
//! - [`EndingSimpack`]: ends the world at a fixed count.
//! - [`FailingSimpack`]: returns a step error at a fixed count.
//! - [`PanickingSimpack`]: panics at a fixed count.
//! - [`SlowSimpack`]: sleeps before every step.
//! - [`HistoryProbeSimpack`]: history-dependent; each state records how
//!   much history its step saw.

use std::thread;
use std::time::Duration;

use braid_core::StepError;
use braid_step::{History, Simpack, SimpackError, StepArgs, StepFunction};

use crate::TestState;

/// Adds one per step. Plain state is `n = 0`; random state is `n = seed`.
pub struct CountingSimpack;

impl Simpack for CountingSimpack {
    type State = TestState;

    fn name(&self) -> &str {
        "counting"
    }

    fn step_functions(&self) -> Vec<StepFunction<TestState>> {
        vec![
            StepFunction::simple("increment", |s: &TestState, _| Ok(s.next())),
            StepFunction::in_place("increment_in_place", |s: &mut TestState, _| {
                s.n += 1;
                Ok(())
            }),
        ]
    }

    fn make_plain_state(&self) -> Result<TestState, SimpackError> {
        Ok(TestState::new(0))
    }

    fn make_random_state(&self, seed: u64) -> Result<TestState, SimpackError> {
        Ok(TestState::new(seed as i64))
    }
}

/// Ends the world once `n` reaches `end_at`.
pub struct EndingSimpack {
    pub end_at: i64,
}

impl Simpack for EndingSimpack {
    type State = TestState;

    fn name(&self) -> &str {
        "ending"
    }

    fn step_functions(&self) -> Vec<StepFunction<TestState>> {
        let end_at = self.end_at;
        vec![StepFunction::simple("increment_until", move |s: &TestState, _| {
            if s.n >= end_at {
                return Err(StepError::WorldEnded);
            }
            Ok(s.next())
        })]
    }

    fn make_plain_state(&self) -> Result<TestState, SimpackError> {
        Ok(TestState::new(0))
    }
}

/// Fails with a step error once `n` reaches `fail_at`.
pub struct FailingSimpack {
    pub fail_at: i64,
}

impl Simpack for FailingSimpack {
    type State = TestState;

    fn name(&self) -> &str {
        "failing"
    }

    fn step_functions(&self) -> Vec<StepFunction<TestState>> {
        let fail_at = self.fail_at;
        vec![StepFunction::simple("increment_then_fail", move |s: &TestState, _| {
            if s.n >= fail_at {
                return Err(StepError::failed(format!("refusing to step past {fail_at}")));
            }
            Ok(s.next())
        })]
    }

    fn make_plain_state(&self) -> Result<TestState, SimpackError> {
        Ok(TestState::new(0))
    }
}

/// Panics once `n` reaches `panic_at`.
pub struct PanickingSimpack {
    pub panic_at: i64,
}

impl Simpack for PanickingSimpack {
    type State = TestState;

    fn name(&self) -> &str {
        "panicking"
    }

    fn step_functions(&self) -> Vec<StepFunction<TestState>> {
        let panic_at = self.panic_at;
        vec![StepFunction::simple("increment_then_panic", move |s: &TestState, _| {
            assert!(s.n < panic_at, "step function panicked at n = {}", s.n);
            Ok(s.next())
        })]
    }

    fn make_plain_state(&self) -> Result<TestState, SimpackError> {
        Ok(TestState::new(0))
    }
}

/// Adds one per step after sleeping for `delay`.
pub struct SlowSimpack {
    pub delay: Duration,
}

impl Simpack for SlowSimpack {
    type State = TestState;

    fn name(&self) -> &str {
        "slow"
    }

    fn step_functions(&self) -> Vec<StepFunction<TestState>> {
        let delay = self.delay;
        vec![StepFunction::simple("slow_increment", move |s: &TestState, _| {
            thread::sleep(delay);
            Ok(s.next())
        })]
    }

    fn make_plain_state(&self) -> Result<TestState, SimpackError> {
        Ok(TestState::new(0))
    }
}

/// History-dependent: each new state's `n` is the length of the history
/// its step saw. On a correct lineage starting from `n = 0`, `n` equals
/// the state's position, so any lost or duplicated history shows up as
/// a gap or repeat.
pub struct HistoryProbeSimpack;

impl Simpack for HistoryProbeSimpack {
    type State = TestState;

    fn name(&self) -> &str {
        "history-probe"
    }

    fn step_functions(&self) -> Vec<StepFunction<TestState>> {
        vec![
            StepFunction::<TestState>::history(
                "count_history",
                |history: &dyn History<TestState>, _: &StepArgs| {
                    let last = history
                        .last_state()
                        .map_err(|e| StepError::failed(e.to_string()))?;
                    let seen = history.len() as i64;
                    if last.n + 1 != seen {
                        return Err(StepError::failed(format!(
                            "history of length {seen} ends at n = {}",
                            last.n
                        )));
                    }
                    Ok(TestState::new(seen))
                },
            ),
            StepFunction::<TestState>::history_generator("count_history_lazily", |_| {
                Box::new(|history: &dyn History<TestState>| {
                    Ok(TestState::new(history.len() as i64))
                })
            }),
        ]
    }

    fn make_plain_state(&self) -> Result<TestState, SimpackError> {
        Ok(TestState::new(0))
    }
}
