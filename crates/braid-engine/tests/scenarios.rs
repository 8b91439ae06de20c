//! End-to-end project scenarios: synchronous simulation, background
//! crunching, crunching from edits, and retiring a cruncher mid-run.

use std::thread;
use std::time::{Duration, Instant};

use braid_core::{NodeId, Rounding};
use braid_engine::Project;
use braid_step::Simpack;
use braid_test_utils::fixtures::{
    CountingSimpack, EndingSimpack, HistoryProbeSimpack, SlowSimpack,
};
use braid_test_utils::{assert_blocks_consistent, wait_until, TestState};

const TIMEOUT: Duration = Duration::from_secs(20);

/// Sync until two consecutive calls add nothing and no job is left.
fn sync_until_idle<P: Simpack<State = TestState>>(project: &mut Project<P>) -> usize {
    let deadline = Instant::now() + TIMEOUT;
    let mut total = 0;
    let mut quiet = 0;
    while quiet < 2 || !project.crunching_manager().jobs().is_empty() {
        assert!(Instant::now() < deadline, "crunching did not settle");
        let added = project.sync_crunchers().unwrap();
        total += added;
        quiet = if added == 0 { quiet + 1 } else { 0 };
        thread::sleep(Duration::from_millis(2));
    }
    total
}

fn only_leaf<P: Simpack<State = TestState>>(project: &Project<P>) -> NodeId {
    let leaves = project.tree().read().leaves();
    assert_eq!(leaves.len(), 1, "expected an unbranched tree");
    leaves[0]
}

fn lineage_ns<P: Simpack<State = TestState>>(project: &Project<P>, leaf: NodeId) -> Vec<i64> {
    let tree = project.tree().read();
    tree.path_to(leaf)
        .unwrap()
        .into_iter()
        .map(|id| tree.state(id).unwrap().n)
        .collect()
}

#[test]
fn scenario_a_simulate_builds_a_chain() {
    let project = Project::new(CountingSimpack).unwrap();
    let root = project.make_plain_root().unwrap();
    let leaf = project.simulate(root, 5).unwrap();

    let tree = project.tree().read();
    let path = tree.path_to(leaf).unwrap();
    assert_eq!(path.len(), 6);
    for (i, id) in path.iter().enumerate().skip(1) {
        let node = tree.node(*id).unwrap();
        assert_eq!(node.state().n, i as i64);
        assert_eq!(node.clock(), i as f64);
        assert!(node.step_profile().is_some());
    }
    assert_blocks_consistent(&tree);
}

#[test]
fn scenario_b_background_crunching_fills_the_buffer() {
    let mut project = Project::new(CountingSimpack).unwrap();
    let root = project.make_plain_root().unwrap();
    assert_eq!(project.crunch_all_leaves(root, 10.0).unwrap(), 1);

    let added = sync_until_idle(&mut project);
    assert!(added >= 10);

    let leaf = only_leaf(&project);
    let ns = lineage_ns(&project, leaf);
    assert!(ns.len() >= 11);
    assert!(ns.windows(2).all(|w| w[0] < w[1]));

    let tree = project.tree().read();
    let mut path = tree.make_containing_path(leaf).unwrap();
    assert_eq!(path.len(&tree), ns.len());
    let at_seven = path.node_by_clock(&tree, 7.0, Rounding::Exact).unwrap();
    assert_eq!(tree.state(at_seven.unwrap()).unwrap().n, 7);
    assert_blocks_consistent(&tree);
}

#[test]
fn scenario_c_no_crunching_from_unfinished_edits() {
    let mut project = Project::new(CountingSimpack).unwrap();
    let root = project.make_plain_root().unwrap();
    project.crunch_all_leaves(root, 10.0).unwrap();
    sync_until_idle(&mut project);

    let leaf = only_leaf(&project);
    let third = project.tree().read().path_to(leaf).unwrap()[3];
    let edit = project.fork_to_edit(third).unwrap();
    project.edit_state(edit, |s| s.n = 1000).unwrap();
    {
        let tree = project.tree().read();
        let node = tree.node(edit).unwrap();
        assert!(node.touched());
        assert!(node.still_in_editing());
        assert_eq!(node.parent(), tree.node(third).unwrap().parent());
    }

    let job = project.begin_crunching(edit, 5.0, None).unwrap();
    assert_eq!(project.sync_crunchers().unwrap(), 0);
    assert_eq!(project.crunching_manager().cruncher_count(), 0);
    assert!(project.crunching_manager().cruncher_status(job).is_none());

    project.finalize(edit).unwrap();
    project.sync_crunchers().unwrap();
    assert!(project.crunching_manager().cruncher_status(job).is_some());

    sync_until_idle(&mut project);
    let tree = project.tree().read();
    let fork_children = tree.node(edit).unwrap().children();
    assert_eq!(fork_children.len(), 1);
    assert_eq!(tree.state(fork_children[0]).unwrap().n, 1001);
    assert_eq!(tree.leaves().len(), 2);
    assert_blocks_consistent(&tree);
}

#[test]
fn scenario_d_removed_job_retires_its_cruncher() {
    let mut project = Project::new(SlowSimpack {
        delay: Duration::from_millis(1),
    })
    .unwrap();
    let root = project.make_plain_root().unwrap();
    let job = project.begin_crunching(root, f64::INFINITY, None).unwrap();
    project.sync_crunchers().unwrap();
    assert!(project.crunching_manager().cruncher_alive(job));

    let mut merged = 0;
    assert!(wait_until(TIMEOUT, || {
        merged += project.sync_crunchers().unwrap();
        merged >= 5
    }));

    project.crunching_manager_mut().remove_job(job).unwrap();
    merged += project.sync_crunchers().unwrap();
    assert!(wait_until(TIMEOUT, || {
        !project.crunching_manager().cruncher_alive(job)
    }));
    assert_eq!(project.sync_crunchers().unwrap(), 0);
    assert_eq!(
        project.crunching_manager().cruncher_status(job),
        None,
        "retired cruncher should have been reaped"
    );

    let leaf = only_leaf(&project);
    let ns = lineage_ns(&project, leaf);
    assert_eq!(ns.len(), merged + 1);
    assert_eq!(project.tree().read().len(), merged + 1);
    assert!(ns.iter().copied().eq(0..ns.len() as i64));
}

#[test]
fn syncing_twice_adds_nothing_the_second_time() {
    let mut project = Project::new(CountingSimpack).unwrap();
    let root = project.make_plain_root().unwrap();
    project.crunch_all_leaves(root, 30.0).unwrap();
    sync_until_idle(&mut project);
    assert_eq!(project.sync_crunchers().unwrap(), 0);
    assert_eq!(project.sync_crunchers().unwrap(), 0);
}

#[test]
fn history_dependent_crunching_sees_unmerged_states() {
    let mut project = Project::new(HistoryProbeSimpack).unwrap();
    assert!(project.meta().is_history_dependent());
    let root = project.make_plain_root().unwrap();
    project.crunch_all_leaves(root, 200.0).unwrap();
    sync_until_idle(&mut project);

    let leaf = only_leaf(&project);
    let ns = lineage_ns(&project, leaf);
    assert!(ns.len() >= 201);
    assert!(ns.iter().copied().eq(0..ns.len() as i64));
}

#[test]
fn history_dependent_simulate_reads_its_own_output() {
    let project = Project::new(HistoryProbeSimpack).unwrap();
    let root = project.make_plain_root().unwrap();
    let lazy = project
        .build_step_profile("count_history_lazily", Default::default())
        .unwrap();
    let leaf = project.simulate_with(root, 25, lazy).unwrap();
    let ns = lineage_ns(&project, leaf);
    assert!(ns.iter().copied().eq(0..=25));
}

#[test]
fn world_end_finishes_the_job() {
    let mut project = Project::new(EndingSimpack { end_at: 7 }).unwrap();
    let root = project.make_plain_root().unwrap();
    let job = project.begin_crunching(root, 100.0, None).unwrap();
    sync_until_idle(&mut project);

    let leaf = only_leaf(&project);
    let tree = project.tree().read();
    assert_eq!(tree.state(leaf).unwrap().n, 7);
    let profile = project.default_step_profile();
    assert!(tree.node(leaf).unwrap().has_end_for(&profile));
    drop(tree);
    assert!(project.crunching_manager().job(job).is_none());

    // An ended leaf is not crunched again.
    assert_eq!(project.crunch_all_leaves(root, 100.0).unwrap(), 0);
}

#[test]
fn many_forks_crunch_in_parallel() {
    let mut project = Project::new(CountingSimpack).unwrap();
    let root = project.make_plain_root().unwrap();
    let trunk = project.simulate(root, 3).unwrap();
    for _ in 0..3 {
        let fork = project.fork_to_edit(trunk).unwrap();
        project.finalize(fork).unwrap();
    }
    assert_eq!(project.crunch_all_leaves(root, 50.0).unwrap(), 4);
    assert_eq!(project.crunching_manager().jobs().len(), 4);
    sync_until_idle(&mut project);

    let tree = project.tree().read();
    let leaves = tree.leaves();
    assert_eq!(leaves.len(), 4);
    for leaf in leaves {
        assert!(tree.node(leaf).unwrap().clock() >= 50.0);
    }
    assert_blocks_consistent(&tree);
}
