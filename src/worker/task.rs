// src/worker/task.rs

use serde_json::Value;

use crate::errors::Result;
use crate::params::{Parameter, ParameterBuilder};

use super::AsAny;
use super::context::TaskContext;

const PARALLELIZABLE_PARAMETER: &str = "task::is_parallelizable";

/// Result of one attempt at a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Done,
    /// Not ready yet (e.g. an input is missing). The scheduler retries the
    /// task on a later scan; this is not an error.
    Repeat,
}

/// A leaf unit of work.
pub trait Task: AsAny + Send {
    /// Declare parameters. Called once, before any execution.
    fn create_parameters(&mut self, _params: &mut ParameterBuilder) -> Result<()> {
        Ok(())
    }

    /// Do the work. May run on a pool thread.
    fn run(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome>;

    /// Simulation counterpart of `run`: no real IO, always inline.
    fn dry_run(&mut self, _ctx: &TaskContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether this task's outputs already exist. Consulted by the
    /// scheduler-side skip policy.
    fn outputs_present(&self, _ctx: &TaskContext) -> bool {
        false
    }
}

/// A task plus its lifecycle state.
pub struct TaskWorker {
    task: Box<dyn Task>,
    parallelizable: Option<Parameter<bool>>,
}

impl TaskWorker {
    pub fn new(task: Box<dyn Task>) -> Self {
        Self {
            task,
            parallelizable: None,
        }
    }

    pub fn task(&self) -> &dyn Task {
        self.task.as_ref()
    }

    pub fn task_mut(&mut self) -> &mut dyn Task {
        self.task.as_mut()
    }

    pub fn is_prepared(&self) -> bool {
        self.parallelizable.is_some()
    }

    /// Declare the built-in parallelism switch and the task's own
    /// parameters. Repeated calls are no-ops.
    pub fn prepare(&mut self, params: &mut ParameterBuilder) -> Result<()> {
        if self.is_prepared() {
            return Ok(());
        }
        let path = params.algorithm_path().join(PARALLELIZABLE_PARAMETER).to_vec();
        params
            .registry()
            .register_parameter(&path)
            .node()
            .declare_optional(Value::Bool(true))
            .document_title("Is parallelizable")
            .document_description("If enabled, this task may run alongside other tasks");
        self.parallelizable = Some(Parameter::new(path));

        self.task.create_parameters(params)
    }

    /// Queryable before `run`, so the scheduler can decide placement.
    pub fn is_parallelizable(&self, ctx: &TaskContext) -> Result<bool> {
        match &self.parallelizable {
            Some(param) => ctx.query(param),
            None => Ok(true),
        }
    }

    /// Run or dry-run depending on the context's mode.
    pub fn execute(&mut self, ctx: &TaskContext) -> anyhow::Result<WorkOutcome> {
        if ctx.is_simulating() {
            self.task.dry_run(ctx)?;
            Ok(WorkOutcome::Done)
        } else {
            self.task.run(ctx)
        }
    }
}
