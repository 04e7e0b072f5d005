// tests/scheduler.rs

mod common;
use crate::common::builders::{FnDispatcher, FnTask, Recorder, RecordingTask};
use crate::common::fake_executor::{InlineExecutor, drive};
use crate::common::{init_tracing, node_by_path, test_context, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use pipetree::engine::{Runtime, RuntimeOptions, Scheduler, SchedulerOptions};
use pipetree::errors::PipelineError;
use pipetree::tree::{Chain, WorkTree, WorkerStatus};
use pipetree::types::{ExecutionMode, SkipPolicy};
use pipetree::worker::{Blueprint, RunContext, WorkOutcome, Worker};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// ingest -> transform -> export, with `transform` rejecting its first
/// `rejections` attempts.
fn chain_pipeline(recorder: &Recorder, rejections: usize) -> WorkTree {
    let recorder = recorder.clone();
    let root = FnDispatcher::new(
        move |blueprints, _| {
            for (name, rejects) in [("ingest", 0), ("transform", rejections), ("export", 0)] {
                let recorder = recorder.clone();
                blueprints.add(Blueprint::task(name, move || {
                    RecordingTask::new(&recorder).rejecting(rejects)
                }))?;
            }
            Ok(())
        },
        |builder| {
            let mut chain = Chain::new(&[]);
            builder.build_in::<RecordingTask>("ingest", &mut chain)?;
            builder.build_in::<RecordingTask>("transform", &mut chain)?;
            builder.build_in::<RecordingTask>("export", &mut chain)?;
            Ok(())
        },
    );
    WorkTree::new("pipeline", Worker::dispatcher(root))
}

fn options(threads: usize) -> SchedulerOptions {
    SchedulerOptions {
        threads,
        ..SchedulerOptions::default()
    }
}

#[test]
fn chain_with_rejecting_transform_completes_in_order() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let mut scheduler = Scheduler::new(
        chain_pipeline(&recorder, 1),
        test_context(ExecutionMode::Run),
        options(4),
    );

    drive(&mut scheduler, 100)?;
    let tree = scheduler.tree();
    assert!(tree.is_complete());

    assert_eq!(
        recorder.events(),
        vec![
            "run:pipeline/ingest",
            "reject:pipeline/transform",
            "run:pipeline/transform",
            "run:pipeline/export",
        ]
    );

    // `transform` never starts working before `ingest` is done.
    let ingest = node_by_path(tree, "pipeline/ingest");
    let transform = node_by_path(tree, "pipeline/transform");
    let ingest_done = tree
        .journal()
        .iter()
        .position(|t| t.node == ingest && t.to == WorkerStatus::Done)
        .unwrap();
    let first_transform_work = tree
        .journal()
        .iter()
        .position(|t| t.node == transform && t.to == WorkerStatus::Working)
        .unwrap();
    assert!(ingest_done < first_transform_work);

    // The rejection went through queued_repeat and back to ready.
    assert!(tree.journal().iter().any(|t| t.node == transform
        && t.from == WorkerStatus::QueuedRepeat
        && t.to == WorkerStatus::Ready));
    Ok(())
}

#[test]
fn no_transition_ever_leaves_done() -> TestResult {
    let recorder = Recorder::new();
    let mut scheduler = Scheduler::new(
        chain_pipeline(&recorder, 3),
        test_context(ExecutionMode::Run),
        options(2),
    );
    drive(&mut scheduler, 100)?;

    for transition in scheduler.tree().journal() {
        assert_ne!(transition.from, WorkerStatus::Done, "{transition:?}");
    }
    Ok(())
}

#[test]
fn failing_task_reports_its_global_path() {
    let root = FnDispatcher::all(|blueprints, _| {
        blueprints.add(Blueprint::task("broken", || {
            FnTask::new(|_| Err(anyhow::anyhow!("disk on fire")))
        }))?;
        Ok(())
    });
    let mut scheduler = Scheduler::new(
        WorkTree::new("root", Worker::dispatcher(root)),
        test_context(ExecutionMode::Run),
        options(1),
    );

    match drive(&mut scheduler, 10) {
        Err(PipelineError::WorkFailed { path, cause }) => {
            assert_eq!(path, "root/broken");
            assert!(cause.to_string().contains("disk on fire"));
        }
        other => panic!("expected WorkFailed, got {other:?}"),
    }
}

#[test]
fn stalled_rejections_abort_the_run() {
    let recorder = Recorder::new();
    let mut scheduler = Scheduler::new(
        chain_pipeline(&recorder, usize::MAX),
        test_context(ExecutionMode::Run),
        SchedulerOptions {
            threads: 1,
            max_stalled_scans: 5,
            full_runtime_log: false,
        },
    );

    let err = drive(&mut scheduler, 1_000).unwrap_err();
    assert!(matches!(err, PipelineError::Stalled { rejected: 1, .. }), "{err}");
}

#[test]
fn non_parallelizable_tasks_run_alone() -> TestResult {
    let parameters = serde_json::json!({
        "algorithm": { "solo": { "task::is_parallelizable": false } }
    });
    let ctx = common::test_context_with(ExecutionMode::Run, parameters);

    let root = FnDispatcher::all(|blueprints, _| {
        for name in ["a", "b", "solo", "c"] {
            blueprints.add(Blueprint::task(name, FnTask::done))?;
        }
        Ok(())
    });
    let mut scheduler = Scheduler::new(
        WorkTree::new("root", Worker::dispatcher(root)),
        ctx,
        options(8),
    );

    // First scan expands the root and hands out every parallel task; the
    // exclusive one has to wait for an empty pool.
    let step = scheduler.scan()?;
    let paths: Vec<String> = step.jobs.iter().map(|j| j.path().to_string()).collect();
    assert_eq!(paths, vec!["root/a", "root/b", "root/c"]);
    let solo = node_by_path(scheduler.tree(), "root/solo");
    assert_eq!(scheduler.tree().status(solo), WorkerStatus::Nothread);

    for job in step.jobs {
        scheduler.complete(pipetree::engine::execute(job))?;
    }
    let step = scheduler.scan()?;
    assert_eq!(step.jobs.len(), 1);
    assert_eq!(step.jobs[0].path().to_string(), "root/solo");
    Ok(())
}

#[test]
fn scheduler_skip_policy_marks_present_outputs_done() -> TestResult {
    let recorder = Recorder::new();
    let rec = recorder.clone();
    let root = FnDispatcher::all(move |blueprints, _| {
        let fresh = rec.clone();
        let stale = rec.clone();
        blueprints.add(Blueprint::task("fresh", move || {
            RecordingTask::new(&fresh).with_outputs_present()
        }))?;
        blueprints.add(Blueprint::task("stale", move || RecordingTask::new(&stale)))?;
        Ok(())
    });

    let ctx = Arc::new(
        RunContext::new(
            ExecutionMode::Run,
            Default::default(),
            Arc::new(pipetree::fs::MockFileSystem::new()),
        )
        .with_skipping(true, SkipPolicy::Scheduler),
    );
    let mut scheduler = Scheduler::new(WorkTree::new("root", Worker::dispatcher(root)), ctx, options(2));
    drive(&mut scheduler, 10)?;

    assert_eq!(recorder.events(), vec!["run:root/stale"]);
    let fresh = node_by_path(scheduler.tree(), "root/fresh");
    assert!(scheduler.tree().journal().iter().any(|t| t.node == fresh
        && t.from == WorkerStatus::Ready
        && t.to == WorkerStatus::Done));
    Ok(())
}

#[test]
fn advisory_skip_leaves_the_decision_to_tasks() -> TestResult {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let root = FnDispatcher::all(move |blueprints, _| {
        let counter = Arc::clone(&counter);
        blueprints.add(Blueprint::task("t", move || {
            let counter = Arc::clone(&counter);
            FnTask::new(move |ctx| {
                if ctx.request_skipping() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok(WorkOutcome::Done)
            })
        }))?;
        Ok(())
    });
    let ctx = Arc::new(
        RunContext::new(
            ExecutionMode::Run,
            Default::default(),
            Arc::new(pipetree::fs::MockFileSystem::new()),
        )
        .with_skipping(true, SkipPolicy::Advisory),
    );
    let mut scheduler = Scheduler::new(WorkTree::new("root", Worker::dispatcher(root)), ctx, options(1));
    drive(&mut scheduler, 10)?;

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn runtime_drives_the_chain_through_an_executor() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let scheduler = Scheduler::new(
        chain_pipeline(&recorder, 2),
        test_context(ExecutionMode::Run),
        options(4),
    );

    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = InlineExecutor::new(tx, Arc::clone(&executed));
    let runtime = Runtime::new(scheduler, rx, executor, RuntimeOptions::default());

    let report = with_timeout(runtime.run()).await?;
    assert!(report.tree.is_complete());
    assert_eq!(recorder.count("run:pipeline/export"), 1);
    assert_eq!(
        executed.lock().unwrap().as_slice(),
        [
            "pipeline/ingest",
            "pipeline/transform",
            "pipeline/transform",
            "pipeline/transform",
            "pipeline/export",
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pool_runtime_runs_wide_trees() -> TestResult {
    let recorder = Recorder::new();
    let rec = recorder.clone();
    let root = FnDispatcher::all(move |blueprints, _| {
        for i in 0..16 {
            let rec = rec.clone();
            blueprints.add(Blueprint::task(format!("t{i}"), move || RecordingTask::new(&rec)))?;
        }
        Ok(())
    });

    let runtime = pipetree::config::RuntimeSection {
        threads: 4,
        ..Default::default()
    };
    let report = with_timeout(pipetree::run_tree(
        WorkTree::new("root", Worker::dispatcher(root)),
        test_context(ExecutionMode::Run),
        &runtime,
    ))
    .await?;

    assert!(report.tree.is_complete());
    assert_eq!(recorder.events().len(), 16);
    Ok(())
}
