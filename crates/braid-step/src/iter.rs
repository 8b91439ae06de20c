//! Normalization of every step style into one lazy state sequence.

use std::sync::Arc;

use braid_core::{assign_clock, State, StepError};

use crate::args::StepArgs;
use crate::function::{
    HistorySimpleFn, HistoryStepper, InPlaceFn, Mutator, SimpleFn, StateStream, StepKind,
};
use crate::history::History;
use crate::profile::StepProfile;

/// What a step sequence starts from.
pub enum StepInput<S: State> {
    /// A single state; used by every non-history style.
    Direct(S),
    /// A live history view; required by history-dependent styles.
    History(Box<dyn History<S>>),
}

enum Driver<S: State> {
    Simple {
        f: Arc<SimpleFn<S>>,
        current: S,
    },
    Generator(StateStream<S>),
    InPlace {
        f: Arc<InPlaceFn<S>>,
        current: S,
    },
    InPlaceGenerator {
        mutator: Mutator<S>,
        working: S,
    },
    HistorySimple {
        f: Arc<HistorySimpleFn<S>>,
        history: Box<dyn History<S>>,
    },
    HistoryGenerator {
        stepper: HistoryStepper<S>,
        history: Box<dyn History<S>>,
    },
    Broken(StepError),
}

/// A lazy sequence of states produced by one step profile.
///
/// Every yielded state carries a clock: states the step left without one
/// get `previous clock + 1`. For in-place styles, a clock the step did
/// not change counts as unset. The sequence ends after the first error;
/// a generator running dry yields [`StepError::WorldEnded`] once.
pub struct StepIter<S: State> {
    args: StepArgs,
    driver: Driver<S>,
    previous_clock: Option<f64>,
    finished: bool,
}

impl<S: State> StepIter<S> {
    /// Start stepping `profile` from `input`.
    pub fn new(profile: StepProfile<S>, input: StepInput<S>) -> Self {
        let args = profile.args().clone();
        let (driver, previous_clock) = match (profile.function().kind().clone(), input) {
            (StepKind::HistorySimple(f), StepInput::History(history)) => {
                (Driver::HistorySimple { f, history }, None)
            }
            (StepKind::HistoryGenerator(make), StepInput::History(history)) => (
                Driver::HistoryGenerator {
                    stepper: make(&args),
                    history,
                },
                None,
            ),
            (StepKind::HistorySimple(_) | StepKind::HistoryGenerator(_), StepInput::Direct(_)) => (
                Driver::Broken(StepError::failed(format!(
                    "{} is history-dependent and needs a history input",
                    profile.function().name()
                ))),
                None,
            ),
            (kind, StepInput::History(history)) => match history.last_state() {
                Ok(last) => Self::direct(kind, S::clone(&last), &args),
                Err(_) => (
                    Driver::Broken(StepError::failed("cannot step from an empty history")),
                    None,
                ),
            },
            (kind, StepInput::Direct(state)) => Self::direct(kind, state, &args),
        };
        Self {
            args,
            driver,
            previous_clock,
            finished: false,
        }
    }

    fn direct(kind: StepKind<S>, state: S, args: &StepArgs) -> (Driver<S>, Option<f64>) {
        let clock = state.clock();
        let driver = match kind {
            StepKind::Simple(f) => Driver::Simple { f, current: state },
            StepKind::Generator(f) => Driver::Generator(f(state, args)),
            StepKind::InPlace(f) => Driver::InPlace { f, current: state },
            StepKind::InPlaceGenerator(f) => Driver::InPlaceGenerator {
                mutator: f(&state, args),
                working: state,
            },
            StepKind::HistorySimple(_) | StepKind::HistoryGenerator(_) => {
                Driver::Broken(StepError::failed("history-dependent step given a single state"))
            }
        };
        (driver, clock)
    }

    /// Whether the sequence has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn produce(&mut self) -> Result<S, StepError> {
        let args = &self.args;
        match &mut self.driver {
            Driver::Simple { f, current } => {
                let mut next = f(&*current, args)?;
                assign_clock(&mut next, current.clock());
                *current = next.clone();
                Ok(next)
            }
            Driver::Generator(stream) => {
                let mut next = stream.next().unwrap_or(Err(StepError::WorldEnded))?;
                assign_clock(&mut next, self.previous_clock);
                Ok(next)
            }
            Driver::InPlace { f, current } => {
                let mut next = current.clone();
                f(&mut next, args)?;
                bump_unchanged_clock(&mut next, current.clock());
                *current = next.clone();
                Ok(next)
            }
            Driver::InPlaceGenerator { mutator, working } => {
                let before = working.clock();
                mutator(&mut *working)?;
                bump_unchanged_clock(working, before);
                Ok(working.clone())
            }
            Driver::HistorySimple { f, history } => {
                let previous = last_clock(&**history);
                let mut next = f(&**history, args)?;
                assign_clock(&mut next, previous);
                Ok(next)
            }
            Driver::HistoryGenerator { stepper, history } => {
                let previous = last_clock(&**history);
                let mut next = stepper(&**history)?;
                assign_clock(&mut next, previous);
                Ok(next)
            }
            Driver::Broken(err) => Err(err.clone()),
        }
    }
}

fn last_clock<S: State>(history: &dyn History<S>) -> Option<f64> {
    history.last_state().ok().and_then(|s| s.clock())
}

fn bump_unchanged_clock<S: State>(state: &mut S, before: Option<f64>) {
    if state.clock() == before {
        state.set_clock(before.map_or(0.0, |c| c + 1.0));
    }
}

impl<S: State> Iterator for StepIter<S> {
    type Item = Result<S, StepError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.produce();
        match &result {
            Ok(state) => self.previous_clock = state.clock(),
            Err(_) => self.finished = true,
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::StepFunction;
    use crate::history::VecHistory;

    #[derive(Clone, Debug, PartialEq)]
    struct Count {
        n: i64,
        clock: Option<f64>,
    }

    impl State for Count {
        fn clock(&self) -> Option<f64> {
            self.clock
        }
        fn set_clock(&mut self, clock: f64) {
            self.clock = Some(clock);
        }
    }

    fn start() -> Count {
        Count {
            n: 0,
            clock: Some(0.0),
        }
    }

    fn run(
        function: StepFunction<Count>,
        input: StepInput<Count>,
        k: usize,
    ) -> Vec<Result<Count, StepError>> {
        StepProfile::bare(function).iter_from(input).take(k).collect()
    }

    fn ns(results: &[Result<Count, StepError>]) -> Vec<(i64, f64)> {
        results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|s| (s.n, s.clock.unwrap()))
            .collect()
    }

    #[test]
    fn simple_assigns_clocks() {
        let f = StepFunction::simple("inc", |s: &Count, _| {
            Ok(Count {
                n: s.n + 1,
                clock: None,
            })
        });
        let out = run(f, StepInput::Direct(start()), 3);
        assert_eq!(ns(&out), vec![(1, 1.0), (2, 2.0), (3, 3.0)]);
    }

    #[test]
    fn explicit_clock_kept_verbatim() {
        let f = StepFunction::simple("rewind", |s: &Count, _| {
            Ok(Count {
                n: s.n + 1,
                clock: Some(-(s.n as f64)),
            })
        });
        let out = run(f, StepInput::Direct(start()), 2);
        assert_eq!(ns(&out), vec![(1, 0.0), (2, -1.0)]);
    }

    #[test]
    fn in_place_bumps_clock() {
        let f = StepFunction::in_place("inc", |s: &mut Count, _| {
            s.n += 2;
            Ok(())
        });
        let out = run(f, StepInput::Direct(start()), 2);
        assert_eq!(ns(&out), vec![(2, 1.0), (4, 2.0)]);
    }

    #[test]
    fn in_place_generator_keeps_closure_state() {
        let f = StepFunction::in_place_generator("accelerate", |_: &Count, _| {
            let mut speed = 0;
            Box::new(move |s: &mut Count| {
                speed += 1;
                s.n += speed;
                Ok(())
            }) as Mutator<Count>
        });
        let out = run(f, StepInput::Direct(start()), 3);
        assert_eq!(ns(&out), vec![(1, 1.0), (3, 2.0), (6, 3.0)]);
    }

    #[test]
    fn generator_exhaustion_is_world_end() {
        let f = StepFunction::generator("two", |s: Count, _| {
            let states: Vec<Result<Count, StepError>> = (1..=2)
                .map(|k| {
                    Ok(Count {
                        n: s.n + k,
                        clock: None,
                    })
                })
                .collect();
            Box::new(states.into_iter()) as StateStream<Count>
        });
        let out = run(f, StepInput::Direct(start()), 10);
        assert_eq!(out.len(), 3);
        assert_eq!(ns(&out), vec![(1, 1.0), (2, 2.0)]);
        assert_eq!(out[2], Err(StepError::WorldEnded));
    }

    #[test]
    fn stops_after_first_error() {
        let f = StepFunction::simple("fail_at_2", |s: &Count, _| {
            if s.n == 1 {
                Err(StepError::failed("nope"))
            } else {
                Ok(Count {
                    n: s.n + 1,
                    clock: None,
                })
            }
        });
        let out = run(f, StepInput::Direct(start()), 10);
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(StepError::Failed { .. })));
    }

    #[test]
    fn history_step_reads_history() {
        let f = StepFunction::history("len", |h: &dyn History<Count>, _| {
            Ok(Count {
                n: h.len() as i64,
                clock: None,
            })
        });
        let history = VecHistory::new([start(), Count { n: 9, clock: Some(4.0) }]);
        let out = run(f, StepInput::History(Box::new(history)), 2);
        // The fixed history does not grow, so both steps see the same view.
        assert_eq!(ns(&out), vec![(2, 5.0), (2, 5.0)]);
    }

    #[test]
    fn history_step_rejects_direct_input() {
        let f = StepFunction::history("len", |h: &dyn History<Count>, _| {
            Ok(Count {
                n: h.len() as i64,
                clock: None,
            })
        });
        let out = run(f, StepInput::Direct(start()), 3);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(StepError::Failed { .. })));
    }

    #[test]
    fn direct_step_accepts_history_input() {
        let f = StepFunction::simple("inc", |s: &Count, _| {
            Ok(Count {
                n: s.n + 1,
                clock: None,
            })
        });
        let history = VecHistory::new([start(), Count { n: 5, clock: Some(5.0) }]);
        let out = run(f, StepInput::History(Box::new(history)), 1);
        assert_eq!(ns(&out), vec![(6, 6.0)]);
    }
}
