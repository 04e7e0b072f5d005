// src/engine/core.rs

//! Pure scheduler state machine.
//!
//! [`Scheduler::scan`] walks every node that is not done yet and:
//! - promotes nodes whose dependencies are done to `Ready`;
//! - expands ready dispatchers on the calling thread (`Working`, then
//!   `Waiting` until their children are done);
//! - hands ready tasks out as [`Job`]s while pool slots are free, or parks
//!   them in `Nothread`;
//! - closes dispatchers whose children are all done.
//!
//! [`Scheduler::complete`] folds a finished job back into the tree. The
//! scheduler never blocks and owns no channels; the async shell in
//! `engine::runtime` decides when to scan and where jobs run.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::params::ParameterBuilder;
use crate::tree::graph::validate_acyclic;
use crate::tree::{NodeId, NodePath, WorkTree, WorkerStatus};
use crate::types::SkipPolicy;
use crate::worker::{RunContext, TaskContext, TaskWorker, WorkOutcome, Worker, WorkerKind};

use super::log::RuntimeLog;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Upper bound on tasks in flight at once.
    pub threads: usize,
    /// Consecutive idle scans without progress before giving up; 0 disables
    /// the guard.
    pub max_stalled_scans: usize,
    pub full_runtime_log: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            max_stalled_scans: 10_000,
            full_runtime_log: false,
        }
    }
}

/// A task checked out of the tree for execution.
pub struct Job {
    pub node: NodeId,
    pub worker: TaskWorker,
    pub ctx: TaskContext,
}

impl Job {
    pub fn path(&self) -> &NodePath {
        self.ctx.global_path()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("node", &self.node)
            .field("path", &self.path().to_string())
            .finish()
    }
}

/// A job coming back from wherever it ran.
pub struct Completion {
    pub node: NodeId,
    pub worker: TaskWorker,
    pub outcome: anyhow::Result<WorkOutcome>,
    pub thread: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Run a job on the current thread.
pub fn execute(job: Job) -> Completion {
    let Job {
        node,
        mut worker,
        ctx,
    } = job;
    let started = Instant::now();
    debug!(node = %ctx.global_path(), "work started");
    let outcome = worker.execute(&ctx);
    Completion {
        node,
        worker,
        outcome,
        thread: thread_label(),
        started,
        finished: Instant::now(),
    }
}

fn thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => format!("{name} {:?}", current.id()),
        None => format!("{:?}", current.id()),
    }
}

/// What one scan did.
#[derive(Debug, Default)]
pub struct ScanStep {
    /// Tasks to run now.
    pub jobs: Vec<Job>,
    pub finished: usize,
    pub known: usize,
    pub waiting_on_dependencies: usize,
    /// Rejected tasks picked up again by this scan.
    pub retried: usize,
    /// Whether any status changed or any node was created.
    pub progressed: bool,
    pub complete: bool,
}

/// End state of a run.
#[derive(Debug)]
pub struct RunReport {
    pub tree: WorkTree,
    pub log: RuntimeLog,
    pub scans: usize,
}

#[derive(Debug)]
pub struct Scheduler {
    tree: WorkTree,
    ctx: Arc<RunContext>,
    options: SchedulerOptions,
    /// Not-done nodes in creation order.
    todo: Vec<NodeId>,
    in_flight: usize,
    exclusive: Option<NodeId>,
    scans: usize,
    stalled_scans: usize,
    stall_marker: (usize, usize),
    announced_waiting: usize,
    announced_finished: usize,
    log: RuntimeLog,
}

impl Scheduler {
    pub fn new(tree: WorkTree, ctx: Arc<RunContext>, options: SchedulerOptions) -> Self {
        let todo = tree
            .ids()
            .filter(|&id| !tree.status(id).is_done())
            .collect();
        let options = SchedulerOptions {
            threads: options.threads.max(1),
            ..options
        };
        Self {
            tree,
            ctx,
            options,
            todo,
            in_flight: 0,
            exclusive: None,
            scans: 0,
            stalled_scans: 0,
            stall_marker: (usize::MAX, 0),
            announced_waiting: 0,
            announced_finished: 0,
            log: RuntimeLog::new(options.full_runtime_log),
        }
    }

    pub fn tree(&self) -> &WorkTree {
        &self.tree
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.ctx
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn scans(&self) -> usize {
        self.scans
    }

    pub fn is_complete(&self) -> bool {
        self.todo.is_empty()
    }

    /// One pass over every node that is not done yet.
    pub fn scan(&mut self) -> Result<ScanStep> {
        self.scans += 1;
        self.check_stall()?;

        let journal_before = self.tree.journal().len();
        let nodes_before = self.tree.node_count();
        let mut step = ScanStep::default();

        // Dispatchers append to `todo` while we walk it; their children are
        // visited in the same pass.
        let mut index = 0;
        while index < self.todo.len() {
            let id = self.todo[index];
            index += 1;
            self.visit(id, &mut step)
                .map_err(|err| err.at(self.tree.global_path(id).to_string()))?;
        }
        self.close_waiting()?;

        let tree = &self.tree;
        self.todo.retain(|&id| !tree.status(id).is_done());

        step.known = self.tree.node_count();
        step.finished = step.known - self.todo.len();
        step.progressed =
            self.tree.journal().len() != journal_before || step.known != nodes_before;
        step.complete = self.todo.is_empty();
        self.announce(&step);
        Ok(step)
    }

    /// Fold a finished job back into the tree.
    ///
    /// Returns the task's outcome; a task error is fatal and comes back as
    /// [`PipelineError::WorkFailed`] carrying the node's global path.
    pub fn complete(&mut self, completion: Completion) -> Result<WorkOutcome> {
        let Completion {
            node,
            worker,
            outcome,
            thread,
            started,
            finished,
        } = completion;

        self.in_flight = self.in_flight.saturating_sub(1);
        if self.exclusive == Some(node) {
            self.exclusive = None;
        }
        self.tree.restore_worker(node, Worker::Task(worker))?;

        let path = self.tree.global_path(node).to_string();
        let label = match &outcome {
            Ok(WorkOutcome::Done) => "done",
            Ok(WorkOutcome::Repeat) => "repeat",
            Err(_) => "failed",
        };
        self.log.record(&path, thread, started, finished, label);

        match outcome {
            Ok(WorkOutcome::Done) => {
                self.tree
                    .set_status(node, WorkerStatus::Done)
                    .map_err(|err| err.at(&path))?;
                debug!(node = %path, "work finished");
                Ok(WorkOutcome::Done)
            }
            Ok(WorkOutcome::Repeat) => {
                self.tree
                    .set_status(node, WorkerStatus::QueuedRepeat)
                    .map_err(|err| err.at(&path))?;
                debug!(node = %path, "work rejected; will retry");
                Ok(WorkOutcome::Repeat)
            }
            Err(cause) => Err(PipelineError::WorkFailed { path, cause }),
        }
    }

    /// The executor lost a job without a completion. Always fatal.
    pub fn worker_lost(&mut self, node: NodeId, message: String) -> PipelineError {
        self.in_flight = self.in_flight.saturating_sub(1);
        PipelineError::WorkerLost {
            path: self.tree.global_path(node).to_string(),
            message,
        }
    }

    pub fn into_report(self) -> RunReport {
        RunReport {
            tree: self.tree,
            log: self.log,
            scans: self.scans,
        }
    }

    fn visit(&mut self, id: NodeId, step: &mut ScanStep) -> Result<()> {
        let status = self.tree.status(id);
        if status.awaits_readiness() {
            if !self.tree.dependencies_done(id) {
                step.waiting_on_dependencies += 1;
                return Ok(());
            }
            if status == WorkerStatus::QueuedRepeat {
                step.retried += 1;
            }
            self.tree.set_status(id, WorkerStatus::Ready)?;
        } else if status != WorkerStatus::Ready {
            return Ok(());
        }

        match self.tree.node(id)?.kind() {
            WorkerKind::Dispatcher => self.expand(id),
            WorkerKind::Task => self.start_task(id, step),
        }
    }

    fn expand(&mut self, id: NodeId) -> Result<()> {
        let mut params = self.parameter_builder(id);
        let mut worker = self.tree.take_worker(id)?;
        let expanded = self.expand_worker(id, &mut worker, &mut params);
        self.tree.restore_worker(id, worker)?;
        let children = expanded?;

        self.todo.extend(children.iter().copied());
        validate_acyclic(&self.tree)?;

        let next = if children.is_empty() {
            WorkerStatus::Done
        } else {
            WorkerStatus::Waiting
        };
        self.tree.set_status(id, next)?;
        info!(
            node = %self.tree.global_path(id),
            children = children.len(),
            "dispatcher expanded"
        );
        Ok(())
    }

    fn expand_worker(
        &mut self,
        id: NodeId,
        worker: &mut Worker,
        params: &mut ParameterBuilder,
    ) -> Result<Vec<NodeId>> {
        let Worker::Dispatcher(dispatcher) = worker else {
            return Err(PipelineError::Other(anyhow::anyhow!(
                "node {id} was scheduled as a dispatcher but holds a {:?} worker",
                worker.kind()
            )));
        };
        dispatcher.prepare(params)?;
        self.tree.set_status(id, WorkerStatus::Working)?;
        dispatcher.expand(&mut self.tree, id, &self.ctx)
    }

    fn start_task(&mut self, id: NodeId, step: &mut ScanStep) -> Result<()> {
        let mut params = self.parameter_builder(id);
        let task_ctx = self.task_context(id);
        let skip_requested = self.scheduler_skips();

        let (parallel, skip) = {
            let worker = task_worker_mut(&mut self.tree, id)?;
            worker.prepare(&mut params)?;
            let parallel = worker.is_parallelizable(&task_ctx)?;
            (parallel, skip_requested && worker.task().outputs_present(&task_ctx))
        };

        if skip {
            info!(node = %task_ctx.global_path(), "outputs already present; skipping");
            return self.tree.set_status(id, WorkerStatus::Done);
        }

        if self.ctx.is_simulating() {
            let worker = self.checkout_task(id)?;
            self.tree.set_status(id, WorkerStatus::Working)?;
            self.in_flight += 1;
            let completion = execute(Job {
                node: id,
                worker,
                ctx: task_ctx,
            });
            return self.complete(completion).map(|_| ());
        }

        let slot_free = self.exclusive.is_none()
            && if parallel {
                self.in_flight < self.options.threads
            } else {
                self.in_flight == 0
            };
        if !slot_free {
            return self.tree.set_status(id, WorkerStatus::Nothread);
        }

        let worker = self.checkout_task(id)?;
        self.tree.set_status(id, WorkerStatus::Working)?;
        self.in_flight += 1;
        if !parallel {
            self.exclusive = Some(id);
        }
        debug!(node = %task_ctx.global_path(), parallel, "work dispatched");
        step.jobs.push(Job {
            node: id,
            worker,
            ctx: task_ctx,
        });
        Ok(())
    }

    /// Close dispatchers whose children are all done. Walking backwards
    /// closes nested dispatchers bottom-up in a single pass.
    fn close_waiting(&mut self) -> Result<()> {
        for index in (0..self.todo.len()).rev() {
            let id = self.todo[index];
            if self.tree.status(id) == WorkerStatus::Waiting && self.tree.children_done(id) {
                self.tree.set_status(id, WorkerStatus::Done)?;
                debug!(node = %self.tree.global_path(id), "dispatcher finished");
            }
        }
        Ok(())
    }

    fn check_stall(&mut self) -> Result<()> {
        if self.in_flight > 0 || self.options.max_stalled_scans == 0 {
            return Ok(());
        }
        let marker = (
            self.tree.count_status(WorkerStatus::Done),
            self.tree.node_count(),
        );
        if marker != self.stall_marker {
            self.stall_marker = marker;
            self.stalled_scans = 0;
            return Ok(());
        }
        self.stalled_scans += 1;
        if self.stalled_scans > self.options.max_stalled_scans {
            return Err(PipelineError::Stalled {
                scans: self.stalled_scans,
                rejected: self.tree.count_status(WorkerStatus::QueuedRepeat),
            });
        }
        Ok(())
    }

    fn announce(&mut self, step: &ScanStep) {
        if step.waiting_on_dependencies != self.announced_waiting {
            self.announced_waiting = step.waiting_on_dependencies;
            debug!(
                count = step.waiting_on_dependencies,
                "nodes waiting on dependencies"
            );
        }
        if step.finished != self.announced_finished {
            self.announced_finished = step.finished;
            info!("progress: {}/{} nodes done", step.finished, step.known);
        }
    }

    fn scheduler_skips(&self) -> bool {
        self.ctx.request_skipping()
            && self.ctx.skip_policy() == SkipPolicy::Scheduler
            && !self.ctx.is_simulating()
    }

    fn checkout_task(&mut self, id: NodeId) -> Result<TaskWorker> {
        match self.tree.take_worker(id)? {
            Worker::Task(worker) => Ok(worker),
            other => {
                let kind = other.kind();
                self.tree.restore_worker(id, other)?;
                Err(PipelineError::Other(anyhow::anyhow!(
                    "node {id} was scheduled as a task but holds a {kind:?} worker"
                )))
            }
        }
    }

    fn parameter_builder(&self, id: NodeId) -> ParameterBuilder {
        ParameterBuilder::new(
            Arc::clone(self.ctx.parameters()),
            self.ctx.mode(),
            self.tree.algorithm_path(id).clone(),
            self.tree.sample_path(id).clone(),
        )
    }

    fn task_context(&self, id: NodeId) -> TaskContext {
        TaskContext::new(
            Arc::clone(&self.ctx),
            id,
            self.tree.global_path(id).clone(),
            self.tree.sample_path(id).clone(),
            self.tree.algorithm_path(id).clone(),
        )
    }
}

fn task_worker_mut(tree: &mut WorkTree, id: NodeId) -> Result<&mut TaskWorker> {
    match tree.worker_mut(id) {
        Some(Worker::Task(worker)) => Ok(worker),
        _ => Err(PipelineError::Other(anyhow::anyhow!(
            "node {id} holds no task worker"
        ))),
    }
}
