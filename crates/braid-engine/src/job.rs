//! Jobs: requests to keep extending a leaf.

use braid_core::{JobId, NodeId, State};
use braid_step::CrunchingProfile;
use braid_tree::Tree;

/// An active request to extend `node` under a crunching profile.
///
/// A job keeps its [`JobId`] while its node pointer advances to each
/// newly merged leaf. Profile changes bump a version counter, which the
/// manager compares against what it last sent the job's cruncher.
pub struct Job<S> {
    id: JobId,
    node: NodeId,
    crunching_profile: CrunchingProfile<S>,
    version: u64,
}

impl<S: State> Job<S> {
    /// A new job with a fresh id.
    pub fn new(node: NodeId, crunching_profile: CrunchingProfile<S>) -> Self {
        Self {
            id: JobId::next(),
            node,
            crunching_profile,
            version: 0,
        }
    }

    /// Whether the job needs no more crunching: its node reached the
    /// clock target, or the world ended there under its step profile.
    pub fn is_done(&self, tree: &Tree<S>) -> bool {
        match tree.get(self.node) {
            Some(node) => {
                self.crunching_profile.is_satisfied_by(node.clock())
                    || node.has_end_for(self.crunching_profile.step_profile())
            }
            None => true,
        }
    }
}

impl<S> Job<S> {
    /// Stable identity.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The leaf this job currently extends.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: NodeId) {
        self.node = node;
    }

    /// What to crunch and how far.
    pub fn crunching_profile(&self) -> &CrunchingProfile<S> {
        &self.crunching_profile
    }

    /// Replace the crunching profile.
    pub fn set_crunching_profile(&mut self, crunching_profile: CrunchingProfile<S>) {
        self.crunching_profile = crunching_profile;
        self.version += 1;
    }

    /// Raise the clock target; never lowers it. Returns whether it changed.
    pub fn raise_clock_target(&mut self, clock_target: f64) -> bool {
        let changed = self.crunching_profile.raise_clock_target(clock_target);
        if changed {
            self.version += 1;
        }
        changed
    }

    /// Change counter for the crunching profile.
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<S> std::fmt::Debug for Job<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("crunching_profile", &self.crunching_profile)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_step::{StepFunction, StepProfile};

    #[derive(Clone, Debug)]
    struct Tick(Option<f64>);

    impl State for Tick {
        fn clock(&self) -> Option<f64> {
            self.0
        }
        fn set_clock(&mut self, clock: f64) {
            self.0 = Some(clock);
        }
    }

    fn profile(name: &str) -> StepProfile<Tick> {
        StepProfile::bare(StepFunction::simple(name.to_owned(), |_: &Tick, _| Ok(Tick(None))))
    }

    #[test]
    fn version_tracks_changes() {
        let mut job = Job::new(NodeId(0), CrunchingProfile::new(profile("a"), 10.0));
        assert_eq!(job.version(), 0);
        assert!(!job.raise_clock_target(3.0));
        assert_eq!(job.version(), 0);
        assert!(job.raise_clock_target(30.0));
        assert_eq!(job.version(), 1);
        job.set_crunching_profile(CrunchingProfile::forever(profile("b")));
        assert_eq!(job.version(), 2);
    }

    #[test]
    fn done_by_target_or_end() {
        let mut tree = Tree::new();
        let root = tree.add_state(Tick(None), None).unwrap();
        let leaf = tree.add_state(Tick(None), Some(root)).unwrap();
        let mut job = Job::new(leaf, CrunchingProfile::new(profile("a"), 5.0));
        assert!(!job.is_done(&tree));
        job.set_node(root);
        tree.make_end(root, profile("a")).unwrap();
        assert!(job.is_done(&tree));
        let other = Job::new(root, CrunchingProfile::forever(profile("b")));
        assert!(!other.is_done(&tree));
        let reached = Job::new(leaf, CrunchingProfile::new(profile("b"), 1.0));
        assert!(reached.is_done(&tree));
    }
}
