//! Step functions and their invocation styles.
//!
//! A simpack may write its step in any of six styles. Each style is one
//! variant of [`StepKind`], chosen when the [`StepFunction`] is built;
//! [`crate::StepIter`] normalizes all of them into a lazy sequence of
//! states so crunchers never branch on style per step.

use std::fmt;
use std::sync::Arc;

use braid_core::{State, StepError};

use crate::args::StepArgs;
use crate::history::History;

/// Lazily produced states.
pub type StateStream<S> = Box<dyn Iterator<Item = Result<S, StepError>> + Send>;

/// A stateful in-place mutator produced by an in-place generator.
pub type Mutator<S> = Box<dyn FnMut(&mut S) -> Result<(), StepError> + Send>;

/// A stateful stepper over a history, produced by a history generator.
pub type HistoryStepper<S> = Box<dyn FnMut(&dyn History<S>) -> Result<S, StepError> + Send>;

/// `state -> next state`.
pub type SimpleFn<S> = dyn Fn(&S, &StepArgs) -> Result<S, StepError> + Send + Sync;
/// `state -> stream of following states`.
pub type GeneratorFn<S> = dyn Fn(S, &StepArgs) -> StateStream<S> + Send + Sync;
/// Mutates a copy of the previous state into the next one.
pub type InPlaceFn<S> = dyn Fn(&mut S, &StepArgs) -> Result<(), StepError> + Send + Sync;
/// Builds a mutator that advances one working state repeatedly.
pub type InPlaceGeneratorFn<S> = dyn Fn(&S, &StepArgs) -> Mutator<S> + Send + Sync;
/// `history -> next state`.
pub type HistorySimpleFn<S> = dyn Fn(&dyn History<S>, &StepArgs) -> Result<S, StepError> + Send + Sync;
/// Builds a stepper that is called once per state with the live history.
pub type HistoryGeneratorFn<S> = dyn Fn(&StepArgs) -> HistoryStepper<S> + Send + Sync;

/// Invocation style of a step function, without the callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepStyle {
    /// See [`StepKind::Simple`].
    Simple,
    /// See [`StepKind::Generator`].
    Generator,
    /// See [`StepKind::InPlace`].
    InPlace,
    /// See [`StepKind::InPlaceGenerator`].
    InPlaceGenerator,
    /// See [`StepKind::HistorySimple`].
    HistorySimple,
    /// See [`StepKind::HistoryGenerator`].
    HistoryGenerator,
}

impl StepStyle {
    /// Whether this style reads a [`History`] rather than a single state.
    pub fn is_history_dependent(self) -> bool {
        matches!(self, Self::HistorySimple | Self::HistoryGenerator)
    }
}

/// The callable behind a step function, tagged by style.
pub enum StepKind<S> {
    /// Called once per produced state with the previous state.
    Simple(Arc<SimpleFn<S>>),
    /// Called once with the initial state; the returned stream is drained.
    /// Running out counts as the world ending.
    Generator(Arc<GeneratorFn<S>>),
    /// Called once per produced state on a copy of the previous state.
    InPlace(Arc<InPlaceFn<S>>),
    /// Called once with the initial state; the mutator then advances one
    /// working copy and each intermediate value is emitted.
    InPlaceGenerator(Arc<InPlaceGeneratorFn<S>>),
    /// Called once per produced state with the lineage's history.
    HistorySimple(Arc<HistorySimpleFn<S>>),
    /// Called once; the stepper is then called once per produced state.
    HistoryGenerator(Arc<HistoryGeneratorFn<S>>),
}

impl<S> Clone for StepKind<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Simple(f) => Self::Simple(Arc::clone(f)),
            Self::Generator(f) => Self::Generator(Arc::clone(f)),
            Self::InPlace(f) => Self::InPlace(Arc::clone(f)),
            Self::InPlaceGenerator(f) => Self::InPlaceGenerator(Arc::clone(f)),
            Self::HistorySimple(f) => Self::HistorySimple(Arc::clone(f)),
            Self::HistoryGenerator(f) => Self::HistoryGenerator(Arc::clone(f)),
        }
    }
}

impl<S> StepKind<S> {
    /// The style tag of this callable.
    pub fn style(&self) -> StepStyle {
        match self {
            Self::Simple(_) => StepStyle::Simple,
            Self::Generator(_) => StepStyle::Generator,
            Self::InPlace(_) => StepStyle::InPlace,
            Self::InPlaceGenerator(_) => StepStyle::InPlaceGenerator,
            Self::HistorySimple(_) => StepStyle::HistorySimple,
            Self::HistoryGenerator(_) => StepStyle::HistoryGenerator,
        }
    }
}

/// A named step function.
///
/// Two step functions are equal when they share a name and a style; the
/// callable itself is not compared. Simpacks must give distinct step
/// functions distinct names.
///
/// # Examples
///
/// ```
/// use braid_core::State;
/// use braid_step::{StepFunction, StepStyle};
///
/// #[derive(Clone, Debug)]
/// struct Tick { clock: Option<f64> }
///
/// impl State for Tick {
///     fn clock(&self) -> Option<f64> { self.clock }
///     fn set_clock(&mut self, clock: f64) { self.clock = Some(clock); }
/// }
///
/// let step = StepFunction::simple("tick", |_: &Tick, _| Ok(Tick { clock: None }));
/// assert_eq!(step.name(), "tick");
/// assert_eq!(step.style(), StepStyle::Simple);
/// assert!(!step.is_history_dependent());
/// ```
pub struct StepFunction<S> {
    name: Arc<str>,
    kind: StepKind<S>,
}

impl<S> Clone for StepFunction<S> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            kind: self.kind.clone(),
        }
    }
}

impl<S: State> StepFunction<S> {
    /// Wrap an already-tagged callable.
    pub fn new(name: impl Into<Arc<str>>, kind: StepKind<S>) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// A [`StepKind::Simple`] step.
    pub fn simple(
        name: impl Into<Arc<str>>,
        f: impl Fn(&S, &StepArgs) -> Result<S, StepError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, StepKind::Simple(Arc::new(f)))
    }

    /// A [`StepKind::Generator`] step.
    pub fn generator(
        name: impl Into<Arc<str>>,
        f: impl Fn(S, &StepArgs) -> StateStream<S> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, StepKind::Generator(Arc::new(f)))
    }

    /// A [`StepKind::InPlace`] step.
    pub fn in_place(
        name: impl Into<Arc<str>>,
        f: impl Fn(&mut S, &StepArgs) -> Result<(), StepError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, StepKind::InPlace(Arc::new(f)))
    }

    /// A [`StepKind::InPlaceGenerator`] step.
    pub fn in_place_generator(
        name: impl Into<Arc<str>>,
        f: impl Fn(&S, &StepArgs) -> Mutator<S> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, StepKind::InPlaceGenerator(Arc::new(f)))
    }

    /// A [`StepKind::HistorySimple`] step.
    pub fn history(
        name: impl Into<Arc<str>>,
        f: impl Fn(&dyn History<S>, &StepArgs) -> Result<S, StepError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, StepKind::HistorySimple(Arc::new(f)))
    }

    /// A [`StepKind::HistoryGenerator`] step.
    pub fn history_generator(
        name: impl Into<Arc<str>>,
        f: impl Fn(&StepArgs) -> HistoryStepper<S> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, StepKind::HistoryGenerator(Arc::new(f)))
    }
}

impl<S> StepFunction<S> {
    /// Name used to look the function up and to render profiles.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Style tag.
    pub fn style(&self) -> StepStyle {
        self.kind.style()
    }

    /// The tagged callable.
    pub fn kind(&self) -> &StepKind<S> {
        &self.kind
    }

    /// Whether this step reads a [`History`] rather than a single state.
    pub fn is_history_dependent(&self) -> bool {
        self.style().is_history_dependent()
    }
}

impl<S> PartialEq for StepFunction<S> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.style() == other.style()
    }
}

impl<S> Eq for StepFunction<S> {}

impl<S> fmt::Debug for StepFunction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepFunction")
            .field("name", &self.name)
            .field("style", &self.style())
            .finish()
    }
}
