//! [`Project`]: one simpack, one tree, and the crunching around them.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use braid_core::{JobId, NodeId, StepError};
use braid_step::{
    CrunchingProfile, Simpack, SimpackMeta, StepArgs, StepInput, StepProfile,
};
use braid_tree::Tree;

use crate::browser::HistoryBrowser;
use crate::config::ProjectConfig;
use crate::error::ProjectError;
use crate::job::Job;
use crate::manager::CrunchingManager;
use crate::queue::Anchor;
use crate::SharedTree;

/// The facade an application drives.
///
/// A project owns the shared tree, the crunching manager, and the
/// simpack. Roots are added directly; states are grown either
/// synchronously with [`simulate`](Self::simulate) or in the background
/// by crunchers whose output lands on [`sync_crunchers`](Self::sync_crunchers).
///
/// Dropping a project retires every cruncher without waiting for it.
pub struct Project<P: Simpack> {
    simpack: P,
    meta: SimpackMeta<P::State>,
    tree: SharedTree<P::State>,
    crunching_manager: CrunchingManager<P::State>,
    config: ProjectConfig,
}

impl<P: Simpack> Project<P> {
    /// A project with the default configuration.
    pub fn new(simpack: P) -> Result<Self, ProjectError> {
        Self::with_config(simpack, ProjectConfig::default())
    }

    /// A project with an explicit configuration.
    pub fn with_config(simpack: P, config: ProjectConfig) -> Result<Self, ProjectError> {
        config.validate()?;
        let meta = SimpackMeta::inspect(&simpack)?;
        let tree: SharedTree<P::State> = Arc::new(RwLock::new(Tree::new()));
        let crunching_manager = CrunchingManager::new(
            Arc::clone(&tree),
            config.crunching.clone(),
            meta.is_history_dependent(),
        );
        debug!(
            simpack = meta.name(),
            history_dependent = meta.is_history_dependent(),
            "project created"
        );
        Ok(Self {
            simpack,
            meta,
            tree,
            crunching_manager,
            config,
        })
    }

    // ── accessors ────────────────────────────────────────────────

    /// The simpack.
    pub fn simpack(&self) -> &P {
        &self.simpack
    }

    /// Facts gathered from the simpack at creation.
    pub fn meta(&self) -> &SimpackMeta<P::State> {
        &self.meta
    }

    /// The shared tree. Take the read lock to inspect it.
    pub fn tree(&self) -> &SharedTree<P::State> {
        &self.tree
    }

    /// The configuration the project was built with.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// The crunching manager.
    pub fn crunching_manager(&self) -> &CrunchingManager<P::State> {
        &self.crunching_manager
    }

    /// The crunching manager, for adding or editing jobs directly.
    pub fn crunching_manager_mut(&mut self) -> &mut CrunchingManager<P::State> {
        &mut self.crunching_manager
    }

    // ── profiles ─────────────────────────────────────────────────

    /// The simpack's default step function with no arguments.
    pub fn default_step_profile(&self) -> StepProfile<P::State> {
        StepProfile::bare(self.meta.default_step_function().clone())
    }

    /// Bind `args` to the step function called `function_name`.
    pub fn build_step_profile(
        &self,
        function_name: &str,
        args: StepArgs,
    ) -> Result<StepProfile<P::State>, ProjectError> {
        let function = self.meta.step_function(function_name).ok_or_else(|| {
            ProjectError::UnknownStepFunction {
                name: function_name.to_owned(),
            }
        })?;
        Ok(StepProfile::new(function.clone(), args))
    }

    // ── roots ────────────────────────────────────────────────────

    /// Add `state` as a new root.
    pub fn root_this_state(&self, state: P::State) -> Result<NodeId, ProjectError> {
        let root = self.tree.write().add_state(state, None)?;
        debug!(node = %root, "root added");
        Ok(root)
    }

    /// Add the simpack's plain state as a new root.
    pub fn make_plain_root(&self) -> Result<NodeId, ProjectError> {
        let state = self.simpack.make_plain_state()?;
        self.root_this_state(state)
    }

    /// Add a random state from the simpack as a new root.
    pub fn make_random_root(&self, seed: u64) -> Result<NodeId, ProjectError> {
        let state = self.simpack.make_random_state(seed)?;
        self.root_this_state(state)
    }

    // ── synchronous simulation ───────────────────────────────────

    /// Step `node` forward `iterations` times on this thread with the
    /// default step profile. Returns the last node added, or `node`
    /// itself for zero iterations.
    pub fn simulate(&self, node: NodeId, iterations: usize) -> Result<NodeId, ProjectError> {
        self.simulate_with(node, iterations, self.default_step_profile())
    }

    /// Like [`simulate`](Self::simulate) with an explicit step profile.
    ///
    /// If the world ends first, the end is recorded on the last node and
    /// that node is returned. A failing step is returned as an error;
    /// nodes added before it stay in the tree.
    pub fn simulate_with(
        &self,
        node: NodeId,
        iterations: usize,
        step_profile: StepProfile<P::State>,
    ) -> Result<NodeId, ProjectError> {
        self.check_history_dependence(&step_profile)?;
        let anchor = Anchor::new(node);
        let input = {
            let tree = self.tree.read();
            if tree.node(node)?.still_in_editing() {
                return Err(ProjectError::StillInEditing { node });
            }
            if iterations == 0 {
                return Ok(node);
            }
            if self.meta.is_history_dependent() {
                StepInput::History(Box::new(HistoryBrowser::with_anchor(
                    Arc::clone(&self.tree),
                    Arc::clone(&anchor),
                    None,
                )))
            } else {
                StepInput::Direct(P::State::clone(tree.state(node)?))
            }
        };

        let mut steps = step_profile.iter_from(input);
        let mut leaf = node;
        let mut added = 0;
        while added < iterations {
            match steps.next().unwrap_or(Err(StepError::WorldEnded)) {
                Ok(state) => {
                    leaf = self
                        .tree
                        .write()
                        .add_stepped_state(state, leaf, step_profile.clone())?;
                    anchor.set(leaf);
                    added += 1;
                }
                Err(StepError::WorldEnded) => {
                    self.tree.write().make_end(leaf, step_profile.clone())?;
                    debug!(node = %leaf, added, "world ended during simulate");
                    return Ok(leaf);
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!(from = %node, to = %leaf, added, step_profile = %step_profile, "simulated");
        Ok(leaf)
    }

    // ── editing ──────────────────────────────────────────────────

    /// Add an editable copy of `node`'s state as its sibling.
    ///
    /// The copy is touched and still in editing, so nothing crunches from
    /// it until [`finalize`](Self::finalize).
    pub fn fork_to_edit(&self, node: NodeId) -> Result<NodeId, ProjectError> {
        let mut tree = self.tree.write();
        let source = tree.node(node)?;
        let state = Arc::clone(source.state());
        let parent = source.parent();
        let fork = tree.add_touched_state(state, parent, true)?;
        debug!(%node, %fork, "forked to edit");
        Ok(fork)
    }

    /// Change a node that is still in editing.
    pub fn edit_state(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut P::State),
    ) -> Result<(), ProjectError> {
        self.tree.write().edit_state(node, f)?;
        Ok(())
    }

    /// Mark an edited node final so crunching may start from it.
    pub fn finalize(&self, node: NodeId) -> Result<(), ProjectError> {
        self.tree.write().finalize(node)?;
        Ok(())
    }

    // ── background crunching ─────────────────────────────────────

    /// Start a job crunching `clock_buffer` clock units past `node`.
    ///
    /// Without an explicit profile the job continues with the step
    /// profile that produced `node`, or the default one for roots and
    /// touched nodes. The cruncher starts on the next sync.
    pub fn begin_crunching(
        &mut self,
        node: NodeId,
        clock_buffer: f64,
        step_profile: Option<StepProfile<P::State>>,
    ) -> Result<JobId, ProjectError> {
        let (clock, step_profile) = {
            let tree = self.tree.read();
            let n = tree.node(node)?;
            let step_profile = step_profile
                .or_else(|| n.step_profile().cloned())
                .unwrap_or_else(|| self.default_step_profile());
            (n.clock(), step_profile)
        };
        self.check_history_dependence(&step_profile)?;
        let job = Job::new(node, CrunchingProfile::new(step_profile, clock + clock_buffer));
        self.crunching_manager.add_job(job)
    }

    /// Make sure every leaf within `wanted_buffer` clock of `node` is
    /// being crunched to at least `wanted_buffer` past `node`'s clock.
    ///
    /// Existing jobs on a leaf have their target raised, never lowered.
    /// Leaves whose lineage ended under their step profile are skipped.
    /// Returns the number of new jobs.
    pub fn crunch_all_leaves(
        &mut self,
        node: NodeId,
        wanted_buffer: f64,
    ) -> Result<usize, ProjectError> {
        let wanted = {
            let tree = self.tree.read();
            let target = tree.node(node)?.clock() + wanted_buffer;
            let mut wanted = Vec::new();
            for leaf in tree.leaves_within(node, wanted_buffer)? {
                let n = tree.node(leaf)?;
                let step_profile = n
                    .step_profile()
                    .cloned()
                    .unwrap_or_else(|| self.default_step_profile());
                if !n.has_end_for(&step_profile) {
                    wanted.push((leaf, n.clock(), step_profile));
                }
            }
            (target, wanted)
        };
        let (target, wanted) = wanted;

        let mut created = 0;
        for (leaf, clock, step_profile) in wanted {
            let mut covered = false;
            for job in self.crunching_manager.jobs_by_node_mut(leaf) {
                if job.crunching_profile().step_profile() == &step_profile {
                    job.raise_clock_target(target);
                    covered = true;
                }
            }
            if !covered && clock < target {
                self.crunching_manager
                    .add_job(Job::new(leaf, CrunchingProfile::new(step_profile, target)))?;
                created += 1;
            }
        }
        if created > 0 {
            debug!(%node, created, target, "jobs added for leaves");
        }
        Ok(created)
    }

    /// [`crunch_all_leaves`](Self::crunch_all_leaves) with the configured
    /// default clock buffer.
    pub fn crunch_from(&mut self, node: NodeId) -> Result<usize, ProjectError> {
        self.crunch_all_leaves(node, self.config.default_clock_buffer)
    }

    /// Merge cruncher output and reconcile crunchers with jobs.
    ///
    /// Returns how many nodes were added.
    pub fn sync_crunchers(&mut self) -> Result<usize, ProjectError> {
        self.crunching_manager.sync()
    }

    fn check_history_dependence(
        &self,
        step_profile: &StepProfile<P::State>,
    ) -> Result<(), ProjectError> {
        if step_profile.is_history_dependent() != self.meta.is_history_dependent() {
            return Err(ProjectError::HistoryDependenceMismatch {
                step_function: step_profile.function().name().to_owned(),
                step_history_dependent: step_profile.is_history_dependent(),
            });
        }
        Ok(())
    }
}

impl<P: Simpack> std::fmt::Debug for Project<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("simpack", &self.meta.name())
            .field("tree", &*self.tree.read())
            .field("jobs", &self.crunching_manager.jobs().len())
            .finish()
    }
}
