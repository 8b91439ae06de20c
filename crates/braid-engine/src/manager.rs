//! [`CrunchingManager`]: reconciles wanted jobs with running crunchers.
//!
//! The application drives [`CrunchingManager::sync`] from one thread at
//! whatever cadence it likes. Each call merges cruncher output into the
//! tree and starts, retires, replaces, or redirects crunchers so that
//! exactly the active jobs are being worked on. `sync` never waits on a
//! cruncher: queues are drained as they are, and finished threads are
//! joined only once they have already exited.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use braid_core::{JobId, NodeId, State};
use braid_tree::{Tree, TreeError};

use crate::config::CrunchingConfig;
use crate::cruncher::{Cruncher, CruncherStatus};
use crate::error::ProjectError;
use crate::job::Job;
use crate::queue::WorkItem;
use crate::SharedTree;

/// Owner of every job and cruncher for one tree.
pub struct CrunchingManager<S: State> {
    tree: SharedTree<S>,
    config: CrunchingConfig,
    history_dependent: bool,
    jobs: Vec<Job<S>>,
    crunchers: IndexMap<JobId, Cruncher<S>>,
    retired: Vec<Cruncher<S>>,
}

impl<S: State> CrunchingManager<S> {
    /// A manager with no jobs.
    pub fn new(tree: SharedTree<S>, config: CrunchingConfig, history_dependent: bool) -> Self {
        Self {
            tree,
            config,
            history_dependent,
            jobs: Vec::new(),
            crunchers: IndexMap::new(),
            retired: Vec::new(),
        }
    }

    // ── jobs ─────────────────────────────────────────────────────

    /// Active jobs in the order they were added.
    pub fn jobs(&self) -> &[Job<S>] {
        &self.jobs
    }

    /// Mutable access to active jobs, e.g. to change their profiles.
    pub fn jobs_mut(&mut self) -> &mut [Job<S>] {
        &mut self.jobs
    }

    /// Job by id.
    pub fn job(&self, id: JobId) -> Option<&Job<S>> {
        self.jobs.iter().find(|j| j.id() == id)
    }

    /// Mutable job by id.
    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job<S>> {
        self.jobs.iter_mut().find(|j| j.id() == id)
    }

    /// Jobs currently extending `node`.
    pub fn jobs_by_node(&self, node: NodeId) -> impl Iterator<Item = &Job<S>> {
        self.jobs.iter().filter(move |j| j.node() == node)
    }

    /// Mutable jobs currently extending `node`.
    pub fn jobs_by_node_mut(&mut self, node: NodeId) -> impl Iterator<Item = &mut Job<S>> {
        self.jobs.iter_mut().filter(move |j| j.node() == node)
    }

    /// Add a job. Its cruncher starts on the next [`sync`](Self::sync).
    pub fn add_job(&mut self, job: Job<S>) -> Result<JobId, ProjectError> {
        let step_profile = job.crunching_profile().step_profile();
        if step_profile.is_history_dependent() != self.history_dependent {
            return Err(ProjectError::HistoryDependenceMismatch {
                step_function: step_profile.function().name().to_owned(),
                step_history_dependent: step_profile.is_history_dependent(),
            });
        }
        let id = job.id();
        self.jobs.push(job);
        Ok(id)
    }

    /// Drop a job. Its cruncher is merged and retired on the next sync.
    pub fn remove_job(&mut self, id: JobId) -> Result<Job<S>, ProjectError> {
        let at = self
            .jobs
            .iter()
            .position(|j| j.id() == id)
            .ok_or(ProjectError::UnknownJob { job: id })?;
        Ok(self.jobs.remove(at))
    }

    // ── crunchers ────────────────────────────────────────────────

    /// Number of crunchers assigned to active or orphaned jobs.
    pub fn cruncher_count(&self) -> usize {
        self.crunchers.len()
    }

    /// Status of the cruncher assigned to `job`, including retired ones
    /// not yet reaped.
    pub fn cruncher_status(&self, job: JobId) -> Option<CruncherStatus> {
        self.crunchers
            .get(&job)
            .or_else(|| self.retired.iter().rev().find(|c| c.job() == job))
            .map(Cruncher::status)
    }

    /// Whether any thread is still running on behalf of `job`.
    pub fn cruncher_alive(&self, job: JobId) -> bool {
        self.crunchers.get(&job).is_some_and(Cruncher::is_alive)
            || self.retired.iter().any(|c| c.job() == job && c.is_alive())
    }

    /// Number of cruncher threads still running, retired ones included.
    pub fn running_threads(&self) -> usize {
        self.crunchers
            .values()
            .chain(&self.retired)
            .filter(|c| c.is_alive())
            .count()
    }

    /// Retire every cruncher and forget every job.
    ///
    /// Returns immediately; threads stop after their current step.
    pub fn shutdown(&mut self) {
        self.jobs.clear();
        for (job, cruncher) in self.crunchers.drain(..) {
            cruncher.retire();
            debug!(%job, "cruncher retired on shutdown");
            self.retired.push(cruncher);
        }
        self.retired.retain_mut(|c| !c.try_reap());
    }

    // ── sync ─────────────────────────────────────────────────────

    /// Merge output, then start, retire, replace, or update crunchers.
    ///
    /// Returns how many nodes were added to the tree.
    pub fn sync(&mut self) -> Result<usize, ProjectError> {
        self.retired.retain_mut(|c| !c.try_reap());
        let mut added = 0;
        let mut changed = false;

        // Crunchers whose job is gone: stop them, then keep what they made.
        let orphaned: Vec<JobId> = self
            .crunchers
            .keys()
            .filter(|id| !self.jobs.iter().any(|j| j.id() == **id))
            .copied()
            .collect();
        for id in orphaned {
            if let Some(cruncher) = self.crunchers.shift_remove(&id) {
                cruncher.retire();
                added += merge(&self.tree, &cruncher)?.0;
                info!(job = %id, "cruncher retired, job removed");
                self.retired.push(cruncher);
                changed = true;
            }
        }

        let mut i = 0;
        while i < self.jobs.len() {
            let id = self.jobs[i].id();
            let Some(cruncher) = self.crunchers.get(&id) else {
                let (done, editing) = {
                    let tree = self.tree.read();
                    let job = &self.jobs[i];
                    (job.is_done(&tree), still_in_editing(&tree, job.node()))
                };
                if done {
                    self.jobs.remove(i);
                    changed = true;
                    continue;
                }
                if !editing {
                    self.spawn(i)?;
                    changed = true;
                }
                i += 1;
                continue;
            };

            // Sampled before merging: a cruncher dead by now has queued
            // everything it ever will.
            let alive = cruncher.is_alive();
            let (merged, leaf) = merge(&self.tree, cruncher)?;
            added += merged;
            self.jobs[i].set_node(leaf);

            if self.jobs[i].is_done(&self.tree.read()) {
                if let Some(cruncher) = self.crunchers.shift_remove(&id) {
                    cruncher.retire();
                    info!(job = %id, node = %leaf, "job done, cruncher retired");
                    self.retired.push(cruncher);
                }
                self.jobs.remove(i);
                changed = true;
                continue;
            }

            let job = &self.jobs[i];
            if !alive {
                let status = cruncher.status();
                if status.is_abnormal() {
                    warn!(job = %id, ?status, "cruncher died");
                }
                if let Some(dead) = self.crunchers.shift_remove(&id) {
                    self.retired.push(dead);
                }
                if !still_in_editing(&self.tree.read(), leaf) {
                    self.spawn(i)?;
                }
                changed = true;
            } else if job.version() != cruncher.profile_version() {
                if job.crunching_profile().step_profile() != cruncher.step_profile() {
                    if let Some(stale) = self.crunchers.shift_remove(&id) {
                        stale.retire();
                        info!(job = %id, "step profile changed, replacing cruncher");
                        self.retired.push(stale);
                    }
                    self.spawn(i)?;
                    changed = true;
                } else {
                    let profile = job.crunching_profile().clone();
                    let version = job.version();
                    if let Some(cruncher) = self.crunchers.get_mut(&id) {
                        cruncher.update_crunching_profile(profile, version);
                    }
                }
            }
            i += 1;
        }

        if added > 0 || changed {
            debug!(
                added,
                jobs = self.jobs.len(),
                crunchers = self.crunchers.len(),
                "synced crunchers"
            );
        }
        Ok(added)
    }

    fn spawn(&mut self, i: usize) -> Result<(), ProjectError> {
        let job = &self.jobs[i];
        let cruncher = Cruncher::start(
            job.id(),
            &self.tree,
            job.node(),
            job.crunching_profile().clone(),
            job.version(),
            self.history_dependent,
            &self.config,
        )?;
        self.crunchers.insert(job.id(), cruncher);
        Ok(())
    }
}

impl<S: State> Drop for CrunchingManager<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn still_in_editing<S: State>(tree: &Tree<S>, node: NodeId) -> bool {
    tree.get(node).is_some_and(|n| n.still_in_editing())
}

/// Move a cruncher's queued output into the tree under the write lock.
///
/// Returns the number of nodes added and the new leaf.
fn merge<S: State>(tree: &SharedTree<S>, cruncher: &Cruncher<S>) -> Result<(usize, NodeId), TreeError> {
    let mut tree = tree.write();
    let mut leaf = cruncher.anchor();
    let mut added = 0;
    for item in cruncher.work().drain() {
        match item {
            WorkItem::State(state) => {
                leaf = tree.add_stepped_state(state, leaf, cruncher.step_profile().clone())?;
                cruncher.set_anchor(leaf);
                added += 1;
            }
            WorkItem::End => {
                tree.make_end(leaf, cruncher.step_profile().clone())?;
            }
        }
    }
    Ok((added, leaf))
}
