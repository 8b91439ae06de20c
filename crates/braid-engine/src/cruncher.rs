//! Crunchers: background threads that step one lineage forward.
//!
//! A [`Cruncher`] is the manager's handle; the thread runs a private
//! worker loop. The two sides share only the work queue, the order
//! channel, the anchor, and a status cell.
//!
//! ```text
//! Manager (sync)                      Cruncher thread
//!     |                                   |
//!     |--Order::{Retire,UpdateProfile}--->| orders.try_recv() after each step
//!     |   [crossbeam unbounded]           |
//!     |<--WorkItem::{State,End}-----------| work.push()
//!     |   [WorkQueue, drained on merge]   |
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use braid_core::{clock_of, JobId, NodeId, State, StepError};
use braid_step::{CrunchingProfile, StepInput, StepIter, StepProfile};

use crate::browser::HistoryBrowser;
use crate::config::CrunchingConfig;
use crate::error::ProjectError;
use crate::queue::{Anchor, Order, WorkItem, WorkQueue};
use crate::SharedTree;

/// Lifecycle state of a cruncher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CruncherStatus {
    /// Still stepping.
    Running,
    /// Stopped on request, on reaching its target, or on a step profile
    /// change.
    Retired,
    /// The world ended; the end marker is queued.
    Ended,
    /// The step function returned an error.
    Failed {
        /// The step function's message.
        reason: String,
    },
    /// The step function panicked.
    Panicked,
}

impl CruncherStatus {
    /// Whether the cruncher stopped without being asked to.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Panicked)
    }
}

/// Manager-side handle to a cruncher thread.
///
/// Dropping the handle disconnects the order channel, which the thread
/// treats as a retire order.
pub struct Cruncher<S: State> {
    job: JobId,
    work: Arc<WorkQueue<S>>,
    anchor: Arc<Anchor>,
    orders: Sender<Order<S>>,
    status: Arc<Mutex<CruncherStatus>>,
    handle: Option<JoinHandle<()>>,
    step_profile: StepProfile<S>,
    profile_version: u64,
}

impl<S: State> Cruncher<S> {
    /// Spawn a cruncher continuing from `node`.
    ///
    /// History-dependent crunchers step through a [`HistoryBrowser`] over
    /// the shared tree and their own queue; others start from a copy of
    /// `node`'s state.
    pub fn start(
        job: JobId,
        tree: &SharedTree<S>,
        node: NodeId,
        crunching_profile: CrunchingProfile<S>,
        profile_version: u64,
        history_dependent: bool,
        config: &CrunchingConfig,
    ) -> Result<Self, ProjectError> {
        let work = Arc::new(WorkQueue::new());
        let anchor = Anchor::new(node);
        let input = if history_dependent {
            tree.read().node(node)?;
            StepInput::History(Box::new(HistoryBrowser::with_anchor(
                Arc::clone(tree),
                Arc::clone(&anchor),
                Some(Arc::clone(&work)),
            )))
        } else {
            StepInput::Direct(S::clone(tree.read().state(node)?))
        };
        let (orders, order_rx) = crossbeam_channel::unbounded();
        let status = Arc::new(Mutex::new(CruncherStatus::Running));
        let step_profile = crunching_profile.step_profile().clone();

        let worker = Worker {
            job,
            profile: crunching_profile,
            work: Arc::clone(&work),
            orders: order_rx,
            status: Arc::clone(&status),
            capacity: config.work_queue_capacity,
            poll: config.backpressure_poll(),
        };
        let handle = thread::Builder::new()
            .name(format!("{}-{}", config.thread_name_prefix, job.get()))
            .spawn(move || worker.run(input))
            .map_err(|e| ProjectError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        info!(%job, %node, step_profile = %step_profile, "cruncher spawned");
        Ok(Self {
            job,
            work,
            anchor,
            orders,
            status,
            handle: Some(handle),
            step_profile,
            profile_version,
        })
    }

    /// The job this cruncher works for.
    pub fn job(&self) -> JobId {
        self.job
    }

    /// The step profile the cruncher was started with. Fixed for life.
    pub fn step_profile(&self) -> &StepProfile<S> {
        &self.step_profile
    }

    /// Node the unmerged output continues from.
    pub fn anchor(&self) -> NodeId {
        self.anchor.get()
    }

    /// Number of unmerged items.
    pub fn queued(&self) -> usize {
        self.work.len()
    }

    /// Whether the thread is still running.
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Current lifecycle state.
    pub fn status(&self) -> CruncherStatus {
        let status = self.status.lock().clone();
        if status == CruncherStatus::Running && !self.is_alive() {
            return CruncherStatus::Panicked;
        }
        status
    }

    /// Ask the thread to stop after its current step.
    pub fn retire(&self) {
        // A disconnected channel means the thread already exited.
        let _ = self.orders.send(Order::Retire);
    }

    /// Send a new crunching profile; `version` is the job's profile
    /// version it came from.
    pub fn update_crunching_profile(&mut self, profile: CrunchingProfile<S>, version: u64) {
        let _ = self.orders.send(Order::UpdateProfile(profile));
        self.profile_version = version;
    }

    /// The job profile version this cruncher last received.
    pub fn profile_version(&self) -> u64 {
        self.profile_version
    }

    pub(crate) fn work(&self) -> &WorkQueue<S> {
        &self.work
    }

    pub(crate) fn set_anchor(&self, node: NodeId) {
        self.anchor.set(node);
    }

    /// Join the thread if it has finished. Returns whether it is gone.
    pub(crate) fn try_reap(&mut self) -> bool {
        match &self.handle {
            Some(h) if !h.is_finished() => false,
            _ => {
                if let Some(h) = self.handle.take() {
                    // Already finished; a panic payload was reported via status.
                    let _ = h.join();
                }
                true
            }
        }
    }
}

impl<S: State> std::fmt::Debug for Cruncher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cruncher")
            .field("job", &self.job)
            .field("step_profile", &self.step_profile)
            .field("status", &self.status())
            .field("queued", &self.queued())
            .finish()
    }
}

// ── Worker loop ───────────────────────────────────────────────────

/// Unwinds the worker loop when the cruncher must stop. Never leaves
/// this module.
struct ObsoleteCruncher;

struct Worker<S: State> {
    job: JobId,
    profile: CrunchingProfile<S>,
    work: Arc<WorkQueue<S>>,
    orders: Receiver<Order<S>>,
    status: Arc<Mutex<CruncherStatus>>,
    capacity: Option<usize>,
    poll: Duration,
}

impl<S: State> Worker<S> {
    fn run(mut self, input: StepInput<S>) {
        let steps = self.profile.step_profile().iter_from(input);
        let status = self.crunch(steps).unwrap_or(CruncherStatus::Retired);
        match &status {
            CruncherStatus::Failed { reason } => {
                warn!(job = %self.job, %reason, "cruncher failed");
            }
            CruncherStatus::Ended => info!(job = %self.job, "cruncher reached world end"),
            _ => debug!(job = %self.job, "cruncher retired"),
        }
        *self.status.lock() = status;
    }

    fn crunch(&mut self, mut steps: StepIter<S>) -> Result<CruncherStatus, ObsoleteCruncher> {
        loop {
            self.wait_for_room()?;
            match steps.next().unwrap_or(Err(StepError::WorldEnded)) {
                Ok(state) => {
                    self.check_orders()?;
                    let clock = clock_of(&state);
                    self.work.push(WorkItem::State(Arc::new(state)));
                    self.check_target(clock)?;
                }
                Err(StepError::WorldEnded) => {
                    self.work.push(WorkItem::End);
                    return Ok(CruncherStatus::Ended);
                }
                Err(StepError::Failed { reason }) => {
                    return Ok(CruncherStatus::Failed { reason });
                }
            }
        }
    }

    /// Drain pending orders without blocking.
    fn check_orders(&mut self) -> Result<(), ObsoleteCruncher> {
        loop {
            match self.orders.try_recv() {
                Ok(order) => self.apply(order)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(ObsoleteCruncher),
            }
        }
    }

    fn apply(&mut self, order: Order<S>) -> Result<(), ObsoleteCruncher> {
        match order {
            Order::Retire => Err(ObsoleteCruncher),
            Order::UpdateProfile(profile) => {
                if profile.step_profile() != self.profile.step_profile() {
                    return Err(ObsoleteCruncher);
                }
                self.profile = profile;
                Ok(())
            }
        }
    }

    fn check_target(&self, clock: f64) -> Result<(), ObsoleteCruncher> {
        if self.profile.is_satisfied_by(clock) {
            return Err(ObsoleteCruncher);
        }
        Ok(())
    }

    /// Block on the order channel while the work queue is full.
    fn wait_for_room(&mut self) -> Result<(), ObsoleteCruncher> {
        let Some(capacity) = self.capacity else {
            return Ok(());
        };
        while self.work.len() >= capacity {
            match self.orders.recv_timeout(self.poll) {
                Ok(order) => self.apply(order)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(ObsoleteCruncher),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_step::StepFunction;
    use braid_tree::Tree;
    use parking_lot::RwLock;
    use proptest::prelude::*;
    use std::time::Instant;

    #[derive(Clone, Debug, PartialEq)]
    struct Tick {
        n: i64,
        clock: Option<f64>,
    }

    impl State for Tick {
        fn clock(&self) -> Option<f64> {
            self.clock
        }
        fn set_clock(&mut self, clock: f64) {
            self.clock = Some(clock);
        }
    }

    fn inc() -> StepProfile<Tick> {
        StepProfile::bare(StepFunction::simple("inc", |s: &Tick, _| {
            Ok(Tick {
                n: s.n + 1,
                clock: None,
            })
        }))
    }

    fn shared_root() -> (SharedTree<Tick>, NodeId) {
        let mut tree = Tree::new();
        let root = tree.add_state(Tick { n: 0, clock: None }, None).unwrap();
        (Arc::new(RwLock::new(tree)), root)
    }

    fn wait_finished(c: &Cruncher<Tick>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while c.is_alive() {
            assert!(Instant::now() < deadline, "cruncher did not stop");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn drained(c: &Cruncher<Tick>) -> Vec<i64> {
        c.work()
            .drain()
            .iter()
            .filter_map(|i| i.state().map(|s| s.n))
            .collect()
    }

    #[test]
    fn stops_at_clock_target() {
        let (tree, root) = shared_root();
        let profile = CrunchingProfile::new(inc(), 5.0);
        let c = Cruncher::start(JobId::next(), &tree, root, profile, 0, false, &CrunchingConfig::default())
            .unwrap();
        wait_finished(&c);
        assert_eq!(c.status(), CruncherStatus::Retired);
        assert_eq!(drained(&c), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn retire_order_stops_forever_cruncher() {
        let (tree, root) = shared_root();
        let config = CrunchingConfig {
            work_queue_capacity: Some(8),
            ..CrunchingConfig::default()
        };
        let c = Cruncher::start(
            JobId::next(),
            &tree,
            root,
            CrunchingProfile::forever(inc()),
            0,
            false,
            &config,
        )
        .unwrap();
        c.retire();
        wait_finished(&c);
        assert_eq!(c.status(), CruncherStatus::Retired);
        let ns = drained(&c);
        assert!(ns.len() <= 8);
        assert!(ns.iter().copied().eq(1..=ns.len() as i64));
    }

    #[test]
    fn different_step_profile_retires() {
        let (tree, root) = shared_root();
        let config = CrunchingConfig {
            work_queue_capacity: Some(2),
            ..CrunchingConfig::default()
        };
        let mut c = Cruncher::start(
            JobId::next(),
            &tree,
            root,
            CrunchingProfile::forever(inc()),
            0,
            false,
            &config,
        )
        .unwrap();
        let other = StepProfile::bare(StepFunction::simple("other", |s: &Tick, _| Ok(s.clone())));
        c.update_crunching_profile(CrunchingProfile::forever(other), 1);
        wait_finished(&c);
        assert_eq!(c.status(), CruncherStatus::Retired);
        assert_eq!(c.profile_version(), 1);
    }

    #[test]
    fn failure_is_reported() {
        let (tree, root) = shared_root();
        let failing = StepProfile::bare(StepFunction::simple("fail", |_: &Tick, _| {
            Err(StepError::failed("broken"))
        }));
        let c = Cruncher::start(
            JobId::next(),
            &tree,
            root,
            CrunchingProfile::forever(failing),
            0,
            false,
            &CrunchingConfig::default(),
        )
        .unwrap();
        wait_finished(&c);
        assert_eq!(
            c.status(),
            CruncherStatus::Failed {
                reason: "broken".into()
            }
        );
        assert!(c.status().is_abnormal());
    }

    #[test]
    fn panic_is_observed_as_dead() {
        let (tree, root) = shared_root();
        let panicking = StepProfile::bare(StepFunction::simple("panic", |_: &Tick, _| -> Result<Tick, StepError> {
            panic!("step exploded")
        }));
        let mut c = Cruncher::start(
            JobId::next(),
            &tree,
            root,
            CrunchingProfile::forever(panicking),
            0,
            false,
            &CrunchingConfig::default(),
        )
        .unwrap();
        wait_finished(&c);
        assert_eq!(c.status(), CruncherStatus::Panicked);
        assert!(c.try_reap());
    }

    #[test]
    fn unknown_start_node_is_rejected() {
        let (tree, _) = shared_root();
        let err = Cruncher::start(
            JobId::next(),
            &tree,
            NodeId(42),
            CrunchingProfile::forever(inc()),
            0,
            false,
            &CrunchingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ProjectError::Tree(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn output_is_ordered_under_any_orders(
            capacity in 1usize..6,
            ops in proptest::collection::vec(0u8..4, 1..24),
        ) {
            let (tree, root) = shared_root();
            let config = CrunchingConfig {
                work_queue_capacity: Some(capacity),
                ..CrunchingConfig::default()
            };
            let mut c = Cruncher::start(
                JobId::next(),
                &tree,
                root,
                CrunchingProfile::forever(inc()),
                0,
                false,
                &config,
            )
            .unwrap();
            let mut pulled = Vec::new();
            for (version, op) in ops.into_iter().enumerate() {
                match op {
                    0 => c.update_crunching_profile(
                        CrunchingProfile::new(inc(), 1e9 + version as f64),
                        version as u64,
                    ),
                    1 => pulled.extend(drained(&c)),
                    2 => thread::sleep(Duration::from_micros(200)),
                    _ => c.retire(),
                }
            }
            c.retire();
            wait_finished(&c);
            pulled.extend(drained(&c));
            prop_assert!(pulled.iter().copied().eq(1..=pulled.len() as i64));
        }
    }
}
