#![allow(dead_code)]

//! Closure-backed workers for building trees in tests.

use std::sync::{Arc, Mutex};

use pipetree::errors::Result;
use pipetree::params::ParameterBuilder;
use pipetree::worker::{BlueprintList, Builder, Dispatcher, Task, TaskContext, WorkOutcome};

type RunFn = Box<dyn FnMut(&TaskContext) -> anyhow::Result<WorkOutcome> + Send>;

/// A task whose body is a closure.
pub struct FnTask {
    run: RunFn,
}

impl FnTask {
    pub fn new(
        run: impl FnMut(&TaskContext) -> anyhow::Result<WorkOutcome> + Send + 'static,
    ) -> Self {
        Self { run: Box::new(run) }
    }

    /// A task that finishes immediately.
    pub fn done() -> Self {
        Self::new(|_| Ok(WorkOutcome::Done))
    }
}

impl Task for FnTask {
    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        (self.run)(ctx)
    }
}

type BlueprintsFn =
    Box<dyn FnMut(&mut BlueprintList, &mut ParameterBuilder) -> Result<()> + Send>;
type BuildFn = Box<dyn FnMut(&mut Builder<'_>) -> Result<()> + Send>;

/// A dispatcher whose blueprint list and build step are closures.
pub struct FnDispatcher {
    blueprints: BlueprintsFn,
    build: BuildFn,
}

impl FnDispatcher {
    pub fn new(
        blueprints: impl FnMut(&mut BlueprintList, &mut ParameterBuilder) -> Result<()>
        + Send
        + 'static,
        build: impl FnMut(&mut Builder<'_>) -> Result<()> + Send + 'static,
    ) -> Self {
        Self {
            blueprints: Box::new(blueprints),
            build: Box::new(build),
        }
    }

    /// Dispatch every blueprint, in declaration order.
    pub fn all(
        blueprints: impl FnMut(&mut BlueprintList, &mut ParameterBuilder) -> Result<()>
        + Send
        + 'static,
    ) -> Self {
        Self::new(blueprints, |builder| {
            builder.dispatch_all()?;
            Ok(())
        })
    }
}

impl Dispatcher for FnDispatcher {
    fn create_blueprints(
        &mut self,
        blueprints: &mut BlueprintList,
        params: &mut ParameterBuilder,
    ) -> Result<()> {
        (self.blueprints)(blueprints, params)
    }

    fn build(&mut self, builder: &mut Builder<'_>) -> Result<()> {
        (self.build)(builder)
    }
}

/// Shared, ordered record of what ran.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// A task that records `run:<global path>` (or `reject:<global path>`)
/// each time it executes, and rejects its first `rejections` attempts.
pub struct RecordingTask {
    recorder: Recorder,
    rejections: usize,
    outputs_present: bool,
}

impl RecordingTask {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            rejections: 0,
            outputs_present: false,
        }
    }

    pub fn rejecting(mut self, times: usize) -> Self {
        self.rejections = times;
        self
    }

    pub fn with_outputs_present(mut self) -> Self {
        self.outputs_present = true;
        self
    }
}

impl Task for RecordingTask {
    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        if self.rejections > 0 {
            self.rejections -= 1;
            self.recorder.push(format!("reject:{}", ctx.global_path()));
            return Ok(WorkOutcome::Repeat);
        }
        self.recorder.push(format!("run:{}", ctx.global_path()));
        Ok(WorkOutcome::Done)
    }

    fn dry_run(&mut self, ctx: &TaskContext) -> anyhow::Result<()> {
        self.recorder.push(format!("simulate:{}", ctx.global_path()));
        Ok(())
    }

    fn outputs_present(&self, _ctx: &TaskContext) -> bool {
        self.outputs_present
    }
}
