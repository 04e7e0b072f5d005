// tests/property_scheduler.rs

mod common;
use crate::common::builders::{FnDispatcher, Recorder, RecordingTask};
use crate::common::fake_executor::drive;
use crate::common::test_context;

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use pipetree::engine::{Scheduler, SchedulerOptions};
use pipetree::tree::{Chain, NodeId, WorkTree, WorkerStatus};
use pipetree::types::ExecutionMode;
use pipetree::worker::{Blueprint, Worker};

/// One child of the root: a plain task, or a nested dispatcher chaining a
/// few tasks. The numbers are how often each task rejects before running.
#[derive(Debug, Clone)]
enum Stage {
    Task(usize),
    Nested(Vec<usize>),
}

#[derive(Debug, Clone)]
struct Plan {
    stages: Vec<Stage>,
    /// `deps[i]` only names stages before `i`.
    deps: Vec<BTreeSet<usize>>,
}

fn stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![
        (0..3usize).prop_map(Stage::Task),
        proptest::collection::vec(0..3usize, 1..4).prop_map(Stage::Nested),
    ]
}

// Acyclic by construction: stage N may only depend on stages 0..N-1.
fn plan_strategy(max_stages: usize) -> impl Strategy<Value = Plan> {
    (1..=max_stages).prop_flat_map(|count| {
        (
            proptest::collection::vec(stage_strategy(), count),
            proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), count),
        )
            .prop_map(|(stages, raw_deps)| {
                let deps = raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, potential)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            potential.into_iter().map(|d| d % i).collect()
                        }
                    })
                    .collect();
                Plan { stages, deps }
            })
    })
}

fn nested_dispatcher(recorder: Recorder, rejections: Vec<usize>) -> FnDispatcher {
    let count = rejections.len();
    FnDispatcher::new(
        move |blueprints, _| {
            for (j, &rejects) in rejections.iter().enumerate() {
                let recorder = recorder.clone();
                blueprints.add(Blueprint::task(format!("t{j}"), move || {
                    RecordingTask::new(&recorder).rejecting(rejects)
                }))?;
            }
            Ok(())
        },
        move |builder| {
            let mut chain = Chain::new(&[]);
            for j in 0..count {
                builder.build_in::<RecordingTask>(&format!("t{j}"), &mut chain)?;
            }
            Ok(())
        },
    )
}

fn build_tree(plan: &Plan, recorder: &Recorder) -> WorkTree {
    let stages = plan.stages.clone();
    let deps = plan.deps.clone();
    let recorder = recorder.clone();

    let root = FnDispatcher::new(
        move |blueprints, _| {
            for (i, stage) in stages.iter().enumerate() {
                let recorder = recorder.clone();
                match stage.clone() {
                    Stage::Task(rejects) => blueprints.add(Blueprint::task(
                        format!("s{i}"),
                        move || RecordingTask::new(&recorder).rejecting(rejects),
                    ))?,
                    Stage::Nested(rejections) => blueprints.add(Blueprint::dispatcher(
                        format!("s{i}"),
                        move || nested_dispatcher(recorder.clone(), rejections.clone()),
                    ))?,
                }
            }
            Ok(())
        },
        move |builder| {
            let nodes = builder.dispatch_all()?;
            for (i, upstream) in deps.iter().enumerate() {
                let upstream: Vec<NodeId> = upstream.iter().map(|&d| nodes[d]).collect();
                builder.tree_mut().add_dependencies(nodes[i], upstream)?;
            }
            Ok(())
        },
    );
    WorkTree::new("root", Worker::dispatcher(root))
}

/// Paths of every task in the plan with its rejection count.
fn expected_tasks(plan: &Plan) -> Vec<(String, usize)> {
    let mut tasks = Vec::new();
    for (i, stage) in plan.stages.iter().enumerate() {
        match stage {
            Stage::Task(rejects) => tasks.push((format!("root/s{i}"), *rejects)),
            Stage::Nested(rejections) => {
                for (j, rejects) in rejections.iter().enumerate() {
                    tasks.push((format!("root/s{i}/t{j}"), *rejects));
                }
            }
        }
    }
    tasks
}

/// Dependencies of `id` and of all its ancestors.
fn effective_dependencies(tree: &WorkTree, id: NodeId) -> Vec<NodeId> {
    let mut deps = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        let node = tree.node(node).unwrap();
        deps.extend(node.dependencies().iter().copied());
        current = node.parent();
    }
    deps
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_trees_complete_in_dependency_order(
        plan in plan_strategy(8),
        threads in 1..5usize,
    ) {
        let recorder = Recorder::new();
        let mut scheduler = Scheduler::new(
            build_tree(&plan, &recorder),
            test_context(ExecutionMode::Run),
            SchedulerOptions { threads, ..SchedulerOptions::default() },
        );

        drive(&mut scheduler, 500).unwrap();
        let tree = scheduler.tree();
        prop_assert!(tree.is_complete());

        // Every task ran exactly once, after its own rejections.
        for (path, rejects) in expected_tasks(&plan) {
            prop_assert_eq!(recorder.count(&format!("run:{path}")), 1, "{}", path);
            prop_assert_eq!(recorder.count(&format!("reject:{path}")), rejects, "{}", path);
        }

        // Replay the journal: nothing leaves `Done`, and nothing starts
        // working before everything it (or an ancestor) waits on is done.
        let mut status: HashMap<NodeId, WorkerStatus> = HashMap::new();
        for transition in tree.journal() {
            let from = status.get(&transition.node).copied().unwrap_or_default();
            prop_assert_eq!(from, transition.from);
            prop_assert_ne!(from, WorkerStatus::Done);

            if transition.to == WorkerStatus::Working {
                for dep in effective_dependencies(tree, transition.node) {
                    prop_assert_eq!(
                        status.get(&dep).copied(),
                        Some(WorkerStatus::Done),
                        "{} started before {}",
                        tree.global_path(transition.node),
                        tree.global_path(dep)
                    );
                }
            }
            status.insert(transition.node, transition.to);
        }
    }
}
